//! Session registry: one `Session` per browser or API client, with idle
//! expiry and a broadcast channel per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{GenerationStatus, SessionEvent, SessionSnapshot};
use crate::error::{SessionError, WizardError};
use crate::playbook::GeneratedDocument;
use crate::wizard::{AnswerRecord, FieldUpdates, WizardState, WizardStep};

/// Broadcast capacity per session.
const EVENT_CAPACITY: usize = 64;

/// Mutable part of a session.
pub(crate) struct SessionData {
    pub(crate) wizard: WizardState,
    pub(crate) answers: AnswerRecord,
    pub(crate) api_key: Option<SecretString>,
    pub(crate) status: GenerationStatus,
    pub(crate) document: Option<Arc<GeneratedDocument>>,
    last_seen: Instant,
}

/// State for one wizard session.
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub(crate) data: RwLock<SessionData>,
    pub(crate) in_flight: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            data: RwLock::new(SessionData {
                wizard: WizardState::default(),
                answers: AnswerRecord::default(),
                api_key: None,
                status: GenerationStatus::Idle,
                document: None,
                last_seen: Instant::now(),
            }),
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    /// Subscribe to this session's events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Whether a generation task is running.
    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot of the session. `shared_credential` says whether the
    /// service itself holds a key.
    pub async fn snapshot(&self, shared_credential: bool) -> SessionSnapshot {
        let data = self.data.read().await;
        SessionSnapshot {
            id: self.id,
            step: data.wizard.step,
            step_number: data.wizard.step.number(),
            step_count: WizardStep::COUNT,
            step_title: data.wizard.step.title(),
            answers: data.answers.clone(),
            status: data.status.clone(),
            has_credential: shared_credential || data.api_key.is_some(),
            created_at: self.created_at,
        }
    }

    pub async fn step(&self) -> WizardStep {
        self.data.read().await.wizard.step
    }

    pub async fn answers(&self) -> AnswerRecord {
        self.data.read().await.answers.clone()
    }

    pub async fn status(&self) -> GenerationStatus {
        self.data.read().await.status.clone()
    }

    /// The last successfully generated document, if any.
    pub async fn document(&self) -> Option<Arc<GeneratedDocument>> {
        self.data.read().await.document.clone()
    }

    /// Store field values. All-or-nothing.
    pub async fn update_answers(&self, updates: &FieldUpdates) -> Result<(), WizardError> {
        let mut data = self.data.write().await;
        data.answers.apply(updates)?;
        debug!(session_id = %self.id, "Answers updated");
        Ok(())
    }

    /// Move to the next screen.
    pub async fn advance(&self) -> Result<WizardStep, WizardError> {
        let step = self.data.write().await.wizard.advance()?;
        self.step_changed(step);
        Ok(step)
    }

    /// Move to the previous screen.
    pub async fn retreat(&self) -> Result<WizardStep, WizardError> {
        let step = self.data.write().await.wizard.retreat()?;
        self.step_changed(step);
        Ok(step)
    }

    fn step_changed(&self, step: WizardStep) {
        info!(session_id = %self.id, step = %step, "Wizard step changed");
        self.emit(SessionEvent::StepChanged {
            step,
            step_number: step.number(),
        });
    }

    /// Set or clear the per-session API key. Blank keys clear it.
    pub async fn set_credential(&self, key: Option<SecretString>) {
        let key = key.filter(|k| !k.expose_secret().trim().is_empty());
        let present = key.is_some();
        self.data.write().await.api_key = key;
        info!(session_id = %self.id, present, "Session credential updated");
    }

    pub(crate) async fn credential(&self) -> Option<SecretString> {
        self.data.read().await.api_key.clone()
    }

    async fn touch(&self) {
        self.data.write().await.last_seen = Instant::now();
    }

    async fn idle_for(&self) -> Duration {
        self.data.read().await.last_seen.elapsed()
    }
}

/// All live sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    /// Create and register a fresh session.
    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        info!(session_id = %session.id, "Session created");
        session
    }

    /// Look up a session and mark it as active.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))?;
        session.touch().await;
        Ok(session)
    }

    /// Drop a session. A running generation finishes but its result is
    /// unreachable.
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!(session_id = %id, "Session removed"))
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle longer than the timeout. Sessions with a running
    /// generation are kept. Returns the number removed.
    pub async fn expire_idle(&self) -> usize {
        let candidates: Vec<Arc<Session>> =
            self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for session in candidates {
            if !session.is_generating() && session.idle_for().await > self.idle_timeout {
                expired.push(session.id);
            }
        }

        if !expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &expired {
                sessions.remove(id);
                debug!(session_id = %id, "Session expired");
            }
            info!(count = expired.len(), "Expired idle sessions");
        }
        expired.len()
    }
}

/// Spawn a background task that periodically drops idle sessions.
pub fn spawn_expiry_task(
    store: Arc<SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip immediate first tick
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.expire_idle().await;
        }
    })
}

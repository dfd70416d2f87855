//! Playbook generator: runs the completion call and document assembly for a
//! session on a background task.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{error, info, warn};

use super::model::{FailureKind, GenerationStatus, SessionEvent};
use super::store::Session;
use crate::config::{DEFAULT_SYSTEM_PROMPT, LlmSettings};
use crate::error::{ConfigError, Error, GenerationError, LlmError, WizardError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, create_provider};
use crate::playbook::{GeneratedDocument, assemble};
use crate::wizard::{AnswerRecord, format_prompt};

/// Where completion providers come from.
pub enum ProviderSource {
    /// One provider for every session (service-wide key, or a test stub).
    Shared(Arc<dyn LlmProvider>),
    /// Built per submit from the session's own key.
    PerSession,
}

/// Starts and tracks playbook generation for sessions.
pub struct PlaybookGenerator {
    source: ProviderSource,
    settings: LlmSettings,
    system_prompt: String,
}

impl PlaybookGenerator {
    pub fn new(source: ProviderSource, settings: LlmSettings) -> Self {
        Self {
            source,
            settings,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Generator for the configured credential policy: the service key if
    /// there is one, otherwise each session's own key.
    pub fn from_credential(
        api_key: Option<SecretString>,
        settings: LlmSettings,
    ) -> Result<Self, LlmError> {
        let source = match api_key {
            Some(key) => ProviderSource::Shared(create_provider(&settings, &key)?),
            None => ProviderSource::PerSession,
        };
        Ok(Self::new(source, settings))
    }

    /// Whether sessions can generate without supplying their own key.
    pub fn has_shared_credential(&self) -> bool {
        matches!(self.source, ProviderSource::Shared(_))
    }

    async fn resolve_provider(&self, session: &Session) -> Result<Arc<dyn LlmProvider>, Error> {
        match &self.source {
            ProviderSource::Shared(provider) => Ok(Arc::clone(provider)),
            ProviderSource::PerSession => {
                let key = session
                    .credential()
                    .await
                    .ok_or(ConfigError::MissingCredential)?;
                Ok(create_provider(&self.settings, &key)?)
            }
        }
    }

    /// Start generating a playbook for `session`.
    ///
    /// Returns once the task is running. Rejected when the session is not on
    /// the last screen, has no credential, or already has a generation
    /// running. The step pointer and answers are never changed.
    pub async fn submit(self: &Arc<Self>, session: Arc<Session>) -> Result<(), Error> {
        session.data.read().await.wizard.ensure_can_submit()?;
        let provider = self.resolve_provider(&session).await?;

        if session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(session_id = %session.id, "Submit rejected, generation already running");
            return Err(GenerationError::InFlight.into());
        }

        let started_at = Utc::now();
        let answers = mark_pending(&session, started_at).await?;
        session.emit(SessionEvent::GenerationStarted { started_at });
        info!(session_id = %session.id, model = provider.model_name(), "Playbook generation started");

        // The inner task isolates panics so the flag is always released
        let this = Arc::clone(self);
        let work = tokio::spawn(async move { this.generate(provider.as_ref(), answers).await });
        tokio::spawn(async move {
            let outcome = match work.await {
                Ok(result) => result,
                Err(e) => Err(GenerationError::Aborted(e.to_string())),
            };
            finish(&session, outcome).await;
        });

        Ok(())
    }

    /// Run the completion call and assemble the document. No session state
    /// is touched, so this also serves the headless CLI.
    pub async fn generate(
        &self,
        provider: &dyn LlmProvider,
        answers: AnswerRecord,
    ) -> Result<GeneratedDocument, GenerationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(format_prompt(&answers)),
        ])
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        let timeout = self.settings.timeout;
        let response = tokio::time::timeout(timeout, provider.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: provider.model_name().to_string(),
                timeout,
            })??;

        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Completion received"
        );

        let raw_text = response.content;
        let document =
            tokio::task::spawn_blocking(move || assemble(&raw_text, &answers, Utc::now()))
                .await
                .map_err(|e| GenerationError::Aborted(e.to_string()))??;
        Ok(document)
    }

    /// Generate with the shared provider, for callers without a session.
    pub async fn generate_once(
        &self,
        answers: AnswerRecord,
    ) -> Result<GeneratedDocument, Error> {
        let ProviderSource::Shared(provider) = &self.source else {
            return Err(ConfigError::MissingCredential.into());
        };
        Ok(self.generate(provider.as_ref(), answers).await?)
    }
}

/// Set `Pending` and snapshot the answers under one write lock. The step is
/// checked again here since a retreat may have landed after the first check.
/// Releases the in-flight flag when the check fails.
async fn mark_pending(
    session: &Session,
    started_at: DateTime<Utc>,
) -> Result<AnswerRecord, WizardError> {
    let mut data = session.data.write().await;
    if let Err(e) = data.wizard.ensure_can_submit() {
        session.in_flight.store(false, Ordering::Release);
        return Err(e);
    }
    data.status = GenerationStatus::Pending { started_at };
    data.document = None;
    Ok(data.answers.clone())
}

/// Record the outcome on the session, release the in-flight flag and notify.
async fn finish(session: &Session, outcome: Result<GeneratedDocument, GenerationError>) {
    let event = match outcome {
        Ok(document) => {
            info!(
                session_id = %session.id,
                filename = %document.filename,
                pages = document.page_count,
                degraded = document.degraded,
                "Playbook ready"
            );
            let event = SessionEvent::GenerationCompleted {
                filename: document.filename.clone(),
                page_count: document.page_count,
                degraded: document.degraded,
            };
            let mut data = session.data.write().await;
            data.status = GenerationStatus::Ready {
                filename: document.filename.clone(),
                page_count: document.page_count,
                degraded: document.degraded,
                generated_at: document.generated_at,
            };
            data.document = Some(Arc::new(document));
            event
        }
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Playbook generation failed");
            let kind = match e {
                GenerationError::Render(_) => FailureKind::Render,
                _ => FailureKind::Generation,
            };
            let message = e.to_string();
            session.data.write().await.status = GenerationStatus::Failed {
                kind,
                message: message.clone(),
            };
            SessionEvent::GenerationFailed { kind, message }
        }
    };

    session.in_flight.store(false, Ordering::Release);
    session.emit(event);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::RenderError;
    use crate::llm::CompletionResponse;
    use crate::session::SessionStore;
    use crate::wizard::{FieldUpdates, WizardStep};

    const EXAMPLE: &str = "# Market Analysis\n\nThe market is nascent.\n\n> Note: act fast";

    enum Behaviour {
        Reply(&'static str),
        Fail,
        /// Wait for the gate before replying.
        Gated(Arc<Notify>),
        Hang,
    }

    struct StubLlm(Behaviour);

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let content = match &self.0 {
                Behaviour::Reply(text) => text.to_string(),
                Behaviour::Fail => {
                    return Err(LlmError::RequestFailed {
                        provider: "stub".to_string(),
                        reason: "HTTP 500: upstream exploded".to_string(),
                    });
                }
                Behaviour::Gated(gate) => {
                    gate.notified().await;
                    EXAMPLE.to_string()
                }
                Behaviour::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            };
            Ok(CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 20,
            })
        }
    }

    fn generator(behaviour: Behaviour) -> Arc<PlaybookGenerator> {
        Arc::new(PlaybookGenerator::new(
            ProviderSource::Shared(Arc::new(StubLlm(behaviour))),
            LlmSettings::default(),
        ))
    }

    async fn session_at_last_step(store: &SessionStore) -> Arc<Session> {
        let session = store.create().await;
        session
            .update_answers(&FieldUpdates {
                product_name: Some("Acme".to_string()),
                product_type: Some("SaaS".to_string()),
                target_audience: Some("Startups".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        while session.advance().await.is_ok() {}
        session
    }

    async fn wait_for_outcome(session: &Session) -> SessionEvent {
        let mut rx = session.subscribe();
        loop {
            if !session.is_generating() {
                // Already finished before we subscribed
                return match session.status().await {
                    GenerationStatus::Ready { filename, page_count, degraded, .. } => {
                        SessionEvent::GenerationCompleted { filename, page_count, degraded }
                    }
                    GenerationStatus::Failed { kind, message } => {
                        SessionEvent::GenerationFailed { kind, message }
                    }
                    other => panic!("unexpected status {other:?}"),
                };
            }
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Ok(event @ SessionEvent::GenerationCompleted { .. }))
                | Ok(Ok(event @ SessionEvent::GenerationFailed { .. })) => return event,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) | Err(_) => continue,
            }
        }
    }

    #[tokio::test]
    async fn submit_produces_document() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        let generator = generator(Behaviour::Reply(EXAMPLE));

        generator.submit(Arc::clone(&session)).await.unwrap();
        let event = wait_for_outcome(&session).await;
        assert!(matches!(event, SessionEvent::GenerationCompleted { page_count: 3, .. }));

        let doc = session.document().await.unwrap();
        assert_eq!(doc.raw_text, EXAMPLE);
        assert_eq!(doc.filename, "Acme_GTM_Playbook.pdf");
        assert!(doc.pdf.starts_with(b"%PDF"));
        assert_eq!(session.step().await, WizardStep::ExpansionExecution);
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn submit_rejected_before_last_step() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create().await;
        let generator = generator(Behaviour::Reply(EXAMPLE));

        let err = generator.submit(Arc::clone(&session)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Wizard(WizardError::NotAtFinalStep { step: 1 })
        ));
        assert_eq!(session.status().await, GenerationStatus::Idle);
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn completion_error_keeps_step_and_answers() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        let generator = generator(Behaviour::Fail);

        generator.submit(Arc::clone(&session)).await.unwrap();
        match wait_for_outcome(&session).await {
            SessionEvent::GenerationFailed { kind, message } => {
                assert_eq!(kind, FailureKind::Generation);
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("Expected failure, got {other:?}"),
        }

        assert!(session.document().await.is_none());
        assert_eq!(session.step().await, WizardStep::ExpansionExecution);
        assert_eq!(session.answers().await.product_name.as_deref(), Some("Acme"));
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_rejected() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        let gate = Arc::new(Notify::new());
        let generator = generator(Behaviour::Gated(Arc::clone(&gate)));

        generator.submit(Arc::clone(&session)).await.unwrap();
        assert!(session.status().await.is_pending());

        let err = generator.submit(Arc::clone(&session)).await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::InFlight)));

        gate.notify_one();
        let event = wait_for_outcome(&session).await;
        assert!(matches!(event, SessionEvent::GenerationCompleted { .. }));
        assert!(session.document().await.is_some());
    }

    #[tokio::test]
    async fn missing_credential_leaves_no_flag() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        let generator = Arc::new(PlaybookGenerator::new(
            ProviderSource::PerSession,
            LlmSettings::default(),
        ));
        assert!(!generator.has_shared_credential());

        let err = generator.submit(Arc::clone(&session)).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingCredential)));
        assert!(!session.is_generating());
        assert_eq!(session.status().await, GenerationStatus::Idle);

        let err = generator.generate_once(AnswerRecord::default()).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingCredential)));
    }

    #[tokio::test]
    async fn pending_is_not_set_after_step_moved_back() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .unwrap();
        session.retreat().await.unwrap();

        let err = mark_pending(&session, Utc::now()).await.unwrap_err();
        assert_eq!(err, WizardError::NotAtFinalStep { step: 3 });
        assert!(!session.is_generating());
        assert_eq!(session.status().await, GenerationStatus::Idle);
    }

    #[tokio::test]
    async fn render_error_is_reported_as_render_failure() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .unwrap();
        let mut rx = session.subscribe();

        let err = GenerationError::Render(RenderError::Backend("font table unavailable".into()));
        finish(&session, Err(err)).await;

        match session.status().await {
            GenerationStatus::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::Render);
                assert!(message.contains("font table unavailable"));
            }
            other => panic!("Expected render failure, got {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::GenerationFailed { kind: FailureKind::Render, .. }
        ));
        assert!(!session.is_generating());
        assert_eq!(session.step().await, WizardStep::ExpansionExecution);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_timeout_fails_generation() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;
        let settings = LlmSettings {
            timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let generator = Arc::new(PlaybookGenerator::new(
            ProviderSource::Shared(Arc::new(StubLlm(Behaviour::Hang))),
            settings,
        ));

        let mut rx = session.subscribe();
        generator.submit(Arc::clone(&session)).await.unwrap();
        loop {
            match rx.recv().await.unwrap() {
                SessionEvent::GenerationFailed { kind, message } => {
                    assert_eq!(kind, FailureKind::Generation);
                    assert!(message.contains("did not answer"));
                    break;
                }
                _ => continue,
            }
        }
        assert_eq!(session.step().await, WizardStep::ExpansionExecution);
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn resubmit_after_failure_replaces_status() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = session_at_last_step(&store).await;

        generator(Behaviour::Fail)
            .submit(Arc::clone(&session))
            .await
            .unwrap();
        wait_for_outcome(&session).await;

        generator(Behaviour::Reply(""))
            .submit(Arc::clone(&session))
            .await
            .unwrap();
        match wait_for_outcome(&session).await {
            SessionEvent::GenerationCompleted { page_count, .. } => assert_eq!(page_count, 2),
            other => panic!("Expected completion, got {other:?}"),
        }
    }
}

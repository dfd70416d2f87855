//! Session data types: generation status, snapshots and broadcast events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::wizard::{AnswerRecord, WizardStep};

/// Why a generation ended without a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Completion call failed or timed out, or the task died.
    Generation,
    /// The PDF could not be written, even as plain text.
    Render,
}

/// Where a session is in the generation lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationStatus {
    Idle,
    Pending {
        started_at: DateTime<Utc>,
    },
    Ready {
        filename: String,
        page_count: usize,
        degraded: bool,
        generated_at: DateTime<Utc>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl GenerationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Point-in-time view of a session, as returned by the API and the WS sync.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: WizardStep,
    pub step_number: usize,
    pub step_count: usize,
    pub step_title: &'static str,
    pub answers: AnswerRecord,
    pub status: GenerationStatus,
    /// Whether a submit would find a credential.
    pub has_credential: bool,
    pub created_at: DateTime<Utc>,
}

/// Events broadcast to a session's subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full state, sent when a client connects or falls behind.
    StatusSync { session: Box<SessionSnapshot> },
    StepChanged { step: WizardStep, step_number: usize },
    GenerationStarted { started_at: DateTime<Utc> },
    GenerationCompleted {
        filename: String,
        page_count: usize,
        degraded: bool,
    },
    GenerationFailed { kind: FailureKind, message: String },
}

//! Error types for the GTM playbook service.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No API key available. Set OPENAI_API_KEY or enter a key in the form.")]
    MissingCredential,

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} did not answer within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Wizard navigation and field errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step")]
    AtLastStep,

    #[error("Generation is only available on the last step (currently on step {step})")]
    NotAtFinalStep { step: usize },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised while producing a playbook.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("A playbook is already being generated for this session")]
    InFlight,

    #[error("Completion failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Document assembly failed: {0}")]
    Render(#[from] RenderError),

    #[error("Generation task aborted: {0}")]
    Aborted(String),
}

/// PDF layout and serialization errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF backend error: {0}")]
    Backend(String),

    #[error("Layout produced no pages")]
    EmptyLayout,
}

/// Session registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

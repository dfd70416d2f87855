//! Mapping of service errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::{ConfigError, Error, GenerationError, SessionError, WizardError};

/// Error returned by HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Wizard(WizardError::InvalidField { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Wizard(_) => StatusCode::BAD_REQUEST,
            Error::Generation(GenerationError::InFlight) => StatusCode::CONFLICT,
            Error::Config(ConfigError::MissingCredential) => StatusCode::PRECONDITION_FAILED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn status_codes() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (SessionError::NotFound(Uuid::nil()).into(), StatusCode::NOT_FOUND),
            (WizardError::AtLastStep.into(), StatusCode::BAD_REQUEST),
            (
                WizardError::NotAtFinalStep { step: 2 }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                WizardError::InvalidField {
                    field: "product_type",
                    value: "Crypto".to_string(),
                    reason: "unknown choice".to_string(),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (GenerationError::InFlight.into(), StatusCode::CONFLICT),
            (
                ConfigError::MissingCredential.into(),
                StatusCode::PRECONDITION_FAILED,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}

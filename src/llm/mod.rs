//! LLM integration.
//!
//! The rest of the crate only sees the [`LlmProvider`] trait. rig-core does
//! the HTTP transport to an OpenAI-compatible chat completions endpoint, and
//! [`RigAdapter`] bridges its `CompletionModel` to our trait.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::config::LlmSettings;
use crate::error::LlmError;

const PROVIDER: &str = "openai";

/// Create a chat completions provider for the configured endpoint.
pub fn create_provider(
    settings: &LlmSettings,
    api_key: &SecretString,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: openai::CompletionsClient = openai::CompletionsClient::builder()
        .api_key(api_key.expose_secret())
        .base_url(settings.base_url.trim_end_matches('/'))
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to create OpenAI client: {e}"),
        })?;

    let model = client.completion_model(&settings.model);
    tracing::info!(model = %settings.model, base_url = %settings.base_url, "Using OpenAI chat completions");
    Ok(Arc::new(RigAdapter::new(model, &settings.model, PROVIDER)))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/v1")
    }

    fn provider(base_url: &str) -> Arc<dyn LlmProvider> {
        let settings = LlmSettings {
            model: "gpt-test".to_string(),
            base_url: base_url.to_string(),
            ..Default::default()
        };
        create_provider(&settings, &SecretString::from("sk-test")).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system("You are an expert GTM strategist."),
            ChatMessage::user("Write a playbook"),
        ])
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-test",
            "system_fingerprint": null,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content, "refusal": null},
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
    }

    fn error_body(message: &str, code: &str) -> serde_json::Value {
        serde_json::json!({
            "error": {"message": message, "type": "invalid_request_error", "code": code}
        })
    }

    #[test]
    fn create_provider_uses_configured_model() {
        let settings = LlmSettings {
            model: "gpt-4o".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&settings, &SecretString::from("sk-test")).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[tokio::test]
    async fn completes_against_configured_endpoint() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "gpt-test");
                let sent = body["messages"].to_string();
                assert!(sent.contains("You are an expert GTM strategist."));
                assert!(sent.contains("Write a playbook"));
                Json(completion_body("# Market Analysis"))
            }),
        );
        let base = serve(router).await;

        let response = provider(&base).complete(request()).await.unwrap();
        assert_eq!(response.content, "# Market Analysis");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 3);
    }

    #[tokio::test]
    async fn invalid_key_maps_to_auth_failed() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(error_body("Incorrect API key provided", "invalid_api_key")),
                )
            }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    Json(error_body("Rate limit reached", "rate_limit_exceeded")),
                )
            }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn server_error_includes_api_message() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(error_body("quota exceeded", "server_error")),
                )
            }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                let mut body = completion_body("");
                body["choices"] = serde_json::json!([]);
                Json(body)
            }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}

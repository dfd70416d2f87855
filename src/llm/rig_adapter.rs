//! Adapter from rig's `CompletionModel` to our [`LlmProvider`] trait.

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider, Role};
use crate::error::LlmError;

/// Wraps any rig completion model behind `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, prompt) = split_messages(&request);

        let mut builder = self.model.completion_request(Message::user(prompt));
        if !preamble.is_empty() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_completion_error(self.provider, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response contained no text content".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}

/// System messages become the preamble, user messages the prompt.
fn split_messages(request: &CompletionRequest) -> (String, String) {
    let join = |role: Role| {
        request
            .messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    (join(Role::System), join(Role::User))
}

/// rig reports HTTP failures as the provider's error body, so auth and rate
/// limit failures are recognised by the error codes OpenAI puts there.
fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: e.to_string(),
        },
        other => classify_failure(provider, other.to_string()),
    }
}

fn classify_failure(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("invalid_api_key")
        || lower.contains("incorrect api key")
        || lower.contains("unauthorized")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else if lower.contains("rate_limit") || lower.contains("rate limit") {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn system_and_user_messages_are_split() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are an expert GTM strategist."),
            ChatMessage::user("Write a playbook"),
        ]);
        let (preamble, prompt) = split_messages(&request);
        assert_eq!(preamble, "You are an expert GTM strategist.");
        assert_eq!(prompt, "Write a playbook");
    }

    #[test]
    fn failure_bodies_are_classified() {
        let auth = classify_failure(
            "openai",
            r#"ProviderError: {"error":{"code":"invalid_api_key"}}"#.to_string(),
        );
        assert!(matches!(auth, LlmError::AuthFailed { .. }));

        let limited = classify_failure("openai", "Rate limit reached for gpt-4".to_string());
        assert!(matches!(limited, LlmError::RateLimited { retry_after: None, .. }));

        match classify_failure("openai", "quota exceeded".to_string()) {
            LlmError::RequestFailed { reason, .. } => assert_eq!(reason, "quota exceeded"),
            other => panic!("expected request failure, got {other}"),
        }
    }
}

//! Chat-completion capability shared by the vision and recipe adapters.

mod openai;

pub use openai::OpenAiClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::RecoveryConfig;
use crate::errors::CapabilityError;

/// A remote model that turns role-tagged messages into free-form text.
///
/// Implementations are shared across concurrent update handlers and must not
/// keep per-call mutable state.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, CapabilityError>;
}

/// A capability wrapped with the caller's deadline and a circuit breaker.
pub struct GuardedCompletion {
    inner: Arc<dyn ChatCompletion>,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl GuardedCompletion {
    pub fn new(inner: Arc<dyn ChatCompletion>, recovery: &RecoveryConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(recovery.clone()),
            timeout: recovery.operation_timeout(),
        }
    }

    pub async fn complete(&self, request: ChatRequest) -> Result<String, CapabilityError> {
        if self.breaker.is_open() {
            warn!(model = %request.model, "Circuit breaker open, rejecting capability call");
            return Err(CapabilityError::Unavailable);
        }

        let result = match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout(self.timeout.as_secs())),
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) if e.is_transport_failure() => self.breaker.record_failure(),
            Err(_) => {}
        }
        result
    }
}

/// A chat completion request (OpenAI-compatible format).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Plain text, or a list of typed parts for multimodal input.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Inline image as a base64 `data:` URL.
    pub fn inline_image(mime_type: &str, base64_data: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{mime_type};base64,{base64_data}"),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Hanging;

    #[async_trait]
    impl ChatCompletion for Hanging {
        async fn complete(&self, _request: ChatRequest) -> Result<String, CapabilityError> {
            std::future::pending().await
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_call_times_out_and_opens_breaker() {
        let recovery = RecoveryConfig {
            operation_timeout_secs: 5,
            circuit_breaker_threshold: 1,
            circuit_breaker_reset_secs: 60,
        };
        let guarded = GuardedCompletion::new(Arc::new(Hanging), &recovery);

        let err = guarded.complete(request()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Timeout(5)));

        let err = guarded.complete(request()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable));
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4".to_string(),
            messages: vec![ChatMessage::system("You cook."), ChatMessage::user("eggs")],
            max_tokens: 1000,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "You cook."},
                    {"role": "user", "content": "eggs"}
                ],
                "max_tokens": 1000
            })
        );
    }

    #[test]
    fn test_multimodal_parts_serialization() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::text("List the food."),
            ContentPart::inline_image("image/png", "AAAA"),
        ]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "List the food."},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                ]
            })
        );
    }
}

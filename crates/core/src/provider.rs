//! Provider trait: the abstraction over text-generation backends.
//!
//! A Provider knows how to send a message list to a model and get text back,
//! either as a complete reply or as a stream of fragments.
//!
//! Implementations: OpenAI, Anthropic, Gemini, DeepSeek, Qwen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// A request to a provider. The model is chosen by the adapter itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The conversation messages (system first, current user turn last)
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl ProviderRequest {
    /// Create a request with default sampling settings.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
        }
    }

    pub fn finished() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// Receiving half of a provider stream.
pub type ChunkReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every backend implements this trait. The provider chain calls `complete()`
/// or `stream()` without knowing which backend is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Lookup key for this provider (e.g., "anthropic", "deepseek").
    fn name(&self) -> &str;

    /// Human-readable name used in replies (e.g., "Claude").
    fn display_name(&self) -> &str {
        self.name()
    }

    /// Environment variable that carries this provider's credentials.
    fn credential_env(&self) -> &str {
        ""
    }

    /// Whether credentials are present. Pure function of configuration, no I/O.
    fn is_configured(&self) -> bool;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx.send(Ok(StreamChunk::text(response.content))).await;
        let _ = tx.send(Ok(StreamChunk::finished())).await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ProviderResponse {
                content: last,
                model: "echo".into(),
                usage: None,
            })
        }
    }

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new(vec![]);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 1000);
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let provider = EchoProvider;
        let mut rx = provider
            .stream(ProviderRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("ping"));
        assert!(!first.done);

        let last = rx.recv().await.unwrap().unwrap();
        assert!(last.done);
        assert_eq!(provider.display_name(), "echo");
    }
}

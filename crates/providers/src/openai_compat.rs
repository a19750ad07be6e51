//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, DeepSeek, and Qwen (DashScope compatible mode).
//! All three expose the same `/chat/completions` endpoint with Bearer auth.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)

use async_trait::async_trait;
use sentia_core::error::ProviderError;
use sentia_core::message::{Message, Role};
use sentia_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::sse::{check_status, http_client, spawn_sse_reader, SseEvent};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const QWEN_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    display_name: String,
    credential_env: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        credential_env: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            credential_env: credential_env.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client: http_client(120),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: Option<String>) -> Self {
        Self::new("openai", "OpenAI", "OPENAI_API_KEY", OPENAI_BASE_URL, api_key, "gpt-4o")
    }

    /// Create a DeepSeek provider (convenience constructor).
    pub fn deepseek(api_key: Option<String>) -> Self {
        Self::new(
            "deepseek",
            "DeepSeek",
            "DEEPSEEK_API_KEY",
            DEEPSEEK_BASE_URL,
            api_key,
            "deepseek-chat",
        )
    }

    /// Create a Qwen provider via DashScope (convenience constructor).
    pub fn qwen(api_key: Option<String>) -> Self {
        Self::new("qwen", "Qwen", "DASHSCOPE_API_KEY", QWEN_BASE_URL, api_key, "qwen-plus")
    }

    /// Override the endpoint (e.g., for proxies or tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} is missing", self.credential_env)))
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    fn request_body(&self, request: &ProviderRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": stream,
        })
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        check_status(&self.name, response).await
    }
}

/// Parse one streamed `data:` payload.
pub(crate) fn parse_stream_payload(data: &str) -> Result<SseEvent, ProviderError> {
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let parsed: StreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
            return Ok(SseEvent::Skip);
        }
    };

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|c| !c.is_empty());

    Ok(text.map(SseEvent::Text).unwrap_or(SseEvent::Skip))
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn credential_env(&self) -> &str {
        &self.credential_env
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = self.request_body(&request, false);
        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self.post(&body, false).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = self.request_body(&request, true);
        debug!(provider = %self.name, model = %self.model, "Sending streaming request");

        let response = self.post(&body, true).await?;
        Ok(spawn_sse_reader(self.name.clone(), response, parse_stream_payload))
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructors() {
        let openai = OpenAiCompatProvider::openai(Some("sk-test".into()));
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.model(), "gpt-4o");

        let deepseek = OpenAiCompatProvider::deepseek(None);
        assert_eq!(deepseek.display_name(), "DeepSeek");
        assert!(deepseek.base_url.contains("api.deepseek.com"));
        assert_eq!(deepseek.model(), "deepseek-chat");

        let qwen = OpenAiCompatProvider::qwen(None).with_model("qwen-max");
        assert_eq!(qwen.credential_env(), "DASHSCOPE_API_KEY");
        assert!(qwen.base_url.contains("dashscope"));
        assert_eq!(qwen.model(), "qwen-max");
    }

    #[test]
    fn configured_only_with_non_blank_key() {
        assert!(OpenAiCompatProvider::openai(Some("sk".into())).is_configured());
        assert!(!OpenAiCompatProvider::openai(Some("   ".into())).is_configured());
        assert!(!OpenAiCompatProvider::openai(None).is_configured());
    }

    #[tokio::test]
    async fn unconfigured_complete_fails_without_network() {
        let provider = OpenAiCompatProvider::deepseek(None);
        let err = provider
            .complete(ProviderRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 3);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[2].role, "assistant");
    }

    #[test]
    fn request_body_uses_adapter_model() {
        let provider = OpenAiCompatProvider::qwen(Some("k".into()));
        let body = provider.request_body(&ProviderRequest::new(vec![Message::user("x")]), true);
        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn parse_complete_response() {
        let data = r#"{"model":"gpt-4o-2024","choices":[{"message":{"role":"assistant","content":"Hello"}}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hello"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 4);
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(parse_stream_payload(data).unwrap(), SseEvent::Text("Hello".into()));
    }

    #[test]
    fn parse_stream_finish_and_done() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_stream_payload(data).unwrap(), SseEvent::Skip);
        assert_eq!(parse_stream_payload("[DONE]").unwrap(), SseEvent::Done);
    }

    #[test]
    fn parse_stream_usage_only_chunk() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        assert_eq!(parse_stream_payload(data).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn parse_stream_garbage_is_skipped() {
        assert_eq!(parse_stream_payload("{not json").unwrap(), SseEvent::Skip);
    }
}

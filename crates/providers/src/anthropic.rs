//! Anthropic native provider implementation (Claude).
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Streaming via SSE with `content_block_delta` events

use async_trait::async_trait;
use sentia_core::error::ProviderError;
use sentia_core::message::{Message, Role};
use sentia_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::sse::{check_status, http_client, spawn_sse_reader, SseEvent};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.into(),
            api_key,
            model: DEFAULT_MODEL.into(),
            client: http_client(120),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
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
            .ok_or_else(|| ProviderError::NotConfigured("ANTHROPIC_API_KEY is missing".into()))
    }

    /// Extract system messages from the message list.
    /// Anthropic puts system prompt as a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut non_system: Vec<&Message> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                _ => non_system.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, non_system)
    }

    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .map(|msg| AnthropicMessage {
                role: match msg.role {
                    Role::Assistant => "assistant".into(),
                    _ => "user".into(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }

    fn request_body(&self, request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let (system, messages) = Self::extract_system(&request.messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        if let Some(ref sys) = system {
            body["system"] = serde_json::json!(sys);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }

        body
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        check_status("anthropic", response).await
    }

    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let usage = resp.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        ProviderResponse {
            content,
            model: resp.model,
            usage,
        }
    }
}

/// Parse one streamed `data:` payload.
pub(crate) fn parse_stream_payload(data: &str) -> Result<SseEvent, ProviderError> {
    let event: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            trace!(error = %e, data = %data, "Ignoring unparseable Anthropic SSE");
            return Ok(SseEvent::Skip);
        }
    };

    match event["type"].as_str().unwrap_or("") {
        "content_block_delta" => {
            let delta = &event["delta"];
            match (delta["type"].as_str(), delta["text"].as_str()) {
                (Some("text_delta"), Some(text)) if !text.is_empty() => {
                    Ok(SseEvent::Text(text.to_string()))
                }
                _ => Ok(SseEvent::Skip),
            }
        }
        "message_stop" => Ok(SseEvent::Done),
        "error" => {
            let message = event["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            Err(ProviderError::StreamInterrupted(message))
        }
        _ => Ok(SseEvent::Skip),
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn display_name(&self) -> &str {
        "Claude"
    }

    fn credential_env(&self) -> &str {
        "ANTHROPIC_API_KEY"
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = self.request_body(&request, false);
        debug!(provider = "anthropic", model = %self.model, "Sending completion request");

        let response = self.post(&body).await?;
        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Ok(Self::response_to_provider_response(api_resp))
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = self.request_body(&request, true);
        debug!(provider = "anthropic", model = %self.model, "Sending streaming request");

        let response = self.post(&body).await?;
        Ok(spawn_sse_reader("anthropic".into(), response, parse_stream_payload))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

//! Google Gemini provider (`generateContent` API).
//!
//! The system prompt goes into `systemInstruction`; assistant turns use the
//! `model` role. Streaming uses `streamGenerateContent?alt=sse`.

use async_trait::async_trait;
use sentia_core::error::ProviderError;
use sentia_core::message::{Message, Role};
use sentia_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::sse::{check_status, http_client, spawn_sse_reader, SseEvent};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.into(),
            api_key,
            model: DEFAULT_MODEL.into(),
            client: http_client(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

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
            .ok_or_else(|| ProviderError::NotConfigured("GEMINI_API_KEY is missing".into()))
    }

    fn to_request(&self, request: &ProviderRequest) -> GeminiRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(GeminiPart {
                    text: msg.content.clone(),
                }),
                Role::User | Role::Assistant => contents.push(GeminiContent {
                    role: Some(gemini_role(msg).into()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        GeminiRequest {
            system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
                role: None,
                parts: system_parts,
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    async fn post(&self, method: &str, body: &GeminiRequest) -> Result<reqwest::Response, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:{method}", self.base_url, self.model);

        let mut builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json");
        if method.starts_with("stream") {
            builder = builder.query(&[("alt", "sse")]);
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        check_status("gemini", response).await
    }
}

fn gemini_role(msg: &Message) -> &'static str {
    match msg.role {
        Role::Assistant => "model",
        _ => "user",
    }
}

fn candidate_text(response: GeminiResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    Some(text)
}

/// Parse one streamed `data:` payload.
pub(crate) fn parse_stream_payload(data: &str) -> Result<SseEvent, ProviderError> {
    match serde_json::from_str::<GeminiResponse>(data) {
        Ok(response) => Ok(candidate_text(response)
            .filter(|t| !t.is_empty())
            .map(SseEvent::Text)
            .unwrap_or(SseEvent::Skip)),
        Err(e) => {
            trace!(error = %e, data = %data, "Ignoring unparseable Gemini SSE");
            Ok(SseEvent::Skip)
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }

    fn credential_env(&self) -> &str {
        "GEMINI_API_KEY"
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = self.to_request(&request);
        debug!(provider = "gemini", model = %self.model, "Sending completion request");

        let response = self.post("generateContent", &body).await?;
        let api_resp: GeminiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        let usage = api_resp.usage_metadata.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        let content = candidate_text(api_resp)
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in Gemini response".into()))?;

        Ok(ProviderResponse {
            content,
            model: self.model.clone(),
            usage,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = self.to_request(&request);
        debug!(provider = "gemini", model = %self.model, "Sending streaming request");

        let response = self.post("streamGenerateContent", &body).await?;
        Ok(spawn_sse_reader("gemini".into(), response, parse_stream_payload))
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_roles_and_system() {
        let provider = GeminiProvider::new(Some("key".into()));
        let request = ProviderRequest::new(vec![
            Message::system("persona"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how are you?"),
        ]);
        let body = serde_json::to_value(provider.to_request(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(body["systemInstruction"].get("role").is_none());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn parse_candidate_text() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":2,"totalTokenCount":6}}"#;
        let parsed: GeminiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.usage_metadata.as_ref().unwrap().total_token_count, 6);
        assert_eq!(candidate_text(parsed).as_deref(), Some("Hello"));
    }

    #[test]
    fn parse_stream_payloads() {
        let chunk = r#"{"candidates":[{"content":{"parts":[{"text":"Hi"}]}}]}"#;
        assert_eq!(parse_stream_payload(chunk).unwrap(), SseEvent::Text("Hi".into()));
        let empty = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(parse_stream_payload(empty).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn configuration() {
        let provider = GeminiProvider::new(None).with_model("gemini-1.5-pro");
        assert!(!provider.is_configured());
        assert_eq!(provider.model(), "gemini-1.5-pro");
        assert_eq!(provider.display_name(), "Gemini");
    }
}

//! Shared HTTP and SSE plumbing for the adapters.
//!
//! Every backend streams `data:` lines over server-sent events; only the JSON
//! payload differs. Adapters supply a payload parser and this module runs the
//! read loop in a spawned task, feeding a `ChunkReceiver`.

use futures::StreamExt;
use sentia_core::error::ProviderError;
use sentia_core::provider::{ChunkReceiver, StreamChunk};
use tracing::{trace, warn};

/// A reusable buffer for SSE byte stream parsing.
///
/// Holds raw bytes so a UTF-8 sequence split across network chunks is
/// decoded only once its line is complete.
pub(crate) struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract complete newline-terminated lines. Partial trailing data stays buffered.
    pub fn extract_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).trim().to_string());
        }
        lines
    }

    /// The remaining (incomplete) data in the buffer.
    pub fn residue(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}

/// The payload of a `data:` line, if the line is one.
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// What a single SSE payload means to the adapter.
#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Text(String),
    Done,
    Skip,
}

/// Map non-success HTTP statuses to provider errors.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(format!(
            "Invalid {provider} API key or insufficient permissions"
        )));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

/// Build the shared HTTP client.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client")
}

/// Read an SSE response in a spawned task and forward parsed text chunks.
///
/// The receiver always ends with either a `done` chunk or a single error.
pub(crate) fn spawn_sse_reader<F>(
    provider: String,
    response: reqwest::Response,
    parse: F,
) -> ChunkReceiver
where
    F: Fn(&str) -> Result<SseEvent, ProviderError> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(async move {
        let mut byte_stream = response.bytes_stream();
        let mut buffer = SseBuffer::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx
                        .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                        .await;
                    return;
                }
            };

            buffer.push_bytes(&bytes);

            for line in buffer.extract_lines() {
                let Some(data) = data_payload(&line) else {
                    continue;
                };
                if data.is_empty() {
                    continue;
                }

                match parse(data) {
                    Ok(SseEvent::Text(text)) => {
                        if tx.send(Ok(StreamChunk::text(text))).await.is_err() {
                            return; // receiver dropped
                        }
                    }
                    Ok(SseEvent::Done) => {
                        let _ = tx.send(Ok(StreamChunk::finished())).await;
                        return;
                    }
                    Ok(SseEvent::Skip) => {}
                    Err(e) => {
                        trace!(provider = %provider, data = %data, error = %e, "SSE payload failed");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        }

        let residue = buffer.residue();
        if !residue.trim().is_empty() {
            trace!(provider = %provider, residue = %residue, "Discarding partial SSE line");
        }

        let _ = tx.send(Ok(StreamChunk::finished())).await;
    });

    rx
}

//! Input events and the outbound envelope.
//!
//! `InputEvent` is what sensors (keyboard, network) hand to the agent loop.
//! `Envelope` is what a transport pushes back out.

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const KEYBOARD_INPUT: &str = "keyboard_input";
pub const NETWORK_INPUT: &str = "network_input";

/// Metadata derived from the raw input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetadata {
    /// Length of the raw (untrimmed) text in characters
    pub length: usize,

    /// Whether any character is neither ASCII alphanumeric nor whitespace
    pub has_special_chars: bool,
}

impl InputMetadata {
    pub fn from_text(raw: &str) -> Self {
        Self {
            length: raw.chars().count(),
            has_special_chars: raw
                .chars()
                .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace()),
        }
    }
}

/// A single piece of external input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    /// Event type, e.g. "keyboard_input"
    #[serde(rename = "type")]
    pub event_type: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Trimmed input text
    pub content: String,

    pub metadata: InputMetadata,
}

impl InputEvent {
    /// Build an event of the given type from raw text.
    pub fn new(event_type: impl Into<String>, raw: &str) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now().timestamp_millis(),
            content: raw.trim().to_string(),
            metadata: InputMetadata::from_text(raw),
        }
    }

    pub fn keyboard(raw: &str) -> Self {
        Self::new(KEYBOARD_INPUT, raw)
    }

    pub fn network(raw: &str) -> Self {
        Self::new(NETWORK_INPUT, raw)
    }
}

/// The scalar part of the self state sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub energy: f64,
    pub mood: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub content: String,
    /// Display name of the backend that answered, if any
    pub provider: Option<String>,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Outbound message: `{ "type": "state" | "response" | "error", "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Envelope {
    State(StatePayload),
    Response(ResponsePayload),
    Error(ErrorPayload),
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_event_trims_and_measures_raw_text() {
        let event = InputEvent::keyboard("  hello  ");
        assert_eq!(event.event_type, "keyboard_input");
        assert_eq!(event.content, "hello");
        assert_eq!(event.metadata.length, 9);
        assert!(!event.metadata.has_special_chars);
    }

    #[test]
    fn special_chars_detected() {
        assert!(InputEvent::network("how are you?").metadata.has_special_chars);
        assert!(!InputEvent::network("plain words 42").metadata.has_special_chars);
    }

    #[test]
    fn non_ascii_letters_count_as_special() {
        assert!(InputEvent::keyboard("café").metadata.has_special_chars);
        assert!(InputEvent::keyboard("你好").metadata.has_special_chars);
        assert!(!InputEvent::keyboard("tab\tand spaces").metadata.has_special_chars);
    }

    #[test]
    fn event_serializes_camel_case_with_type_tag() {
        let json = serde_json::to_value(InputEvent::network("hi!")).unwrap();
        assert_eq!(json["type"], "network_input");
        assert_eq!(json["metadata"]["hasSpecialChars"], true);
        assert_eq!(json["metadata"]["length"], 3);
    }

    #[test]
    fn envelope_shapes() {
        let state = Envelope::State(StatePayload {
            energy: 90.0,
            mood: 0.5,
            confidence: 0.7,
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["data"]["energy"], 90.0);

        let json = serde_json::to_value(Envelope::error("boom")).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["message"], "boom");
    }
}

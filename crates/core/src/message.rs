//! Conversation value objects.
//!
//! Two shapes flow through the system: `ConversationTurn` is what the self
//! model remembers (user or agent), `Message` is what a provider receives
//! (which additionally carries the system prompt).

use serde::{Deserialize, Serialize};

/// Who spoke a remembered conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The end user
    User,
    /// The agent itself
    Agent,
}

/// A single remembered exchange line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            content: content.into(),
        }
    }
}

/// The role of a message sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (personality, context hints)
    System,
    /// The end user
    User,
    /// The agent's earlier replies
    Assistant,
}

/// A single message in a provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            TurnRole::User => Message::user(&turn.content),
            TurnRole::Agent => Message::assistant(&turn.content),
        }
    }
}

/// The read-only view of the self model that providers work from.
///
/// Captured under the self-model lock and then handed to the (slow) provider
/// call, so the call never holds the lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfView {
    /// The fixed personality prompt
    pub personality: String,

    /// The most recent conversation turns, oldest first
    pub history: Vec<ConversationTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_turn_maps_to_assistant_message() {
        let msg = Message::from(&ConversationTurn::agent("Hi there"));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn turn_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ConversationTurn::agent("ok")).unwrap();
        assert!(json.contains("\"agent\""));
        let json = serde_json::to_string(&ConversationTurn::user("ok")).unwrap();
        assert!(json.contains("\"user\""));
    }
}

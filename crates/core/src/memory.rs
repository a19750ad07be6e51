//! Memory trait: persistent episodic, semantic and state-snapshot storage.
//!
//! The store keeps three independent collections:
//! - Episodic memory (append-only log of inputs and responses)
//! - Semantic memory (key/value facts with a confidence, last-writer-wins)
//! - Internal state snapshots (append-only time series of the self model)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::state::InternalState;

/// An episode that has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEpisode {
    /// Event type (e.g., "keyboard_input", "response")
    pub event_type: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    pub content: String,

    /// Arbitrary JSON metadata
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// The process run that wrote this episode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl NewEpisode {
    /// Create an episode stamped with the current wall-clock time.
    pub fn now(event_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now().timestamp_millis(),
            content: content.into(),
            metadata: serde_json::Value::Null,
            session_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// A stored episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicMemoryRecord {
    pub id: i64,
    pub timestamp: i64,
    pub event_type: String,
    pub content: String,
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMemoryRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
}

/// A persisted copy of the self model's scalars and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalStateSnapshot {
    pub id: i64,
    pub timestamp: i64,
    pub energy: f64,
    pub mood: f64,
    pub confidence: f64,
    pub events: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The core MemoryStore trait.
///
/// Implementations: SQLite, in-memory (for testing and ephemeral sessions).
/// After `close()` every operation returns [`MemoryError::Closed`].
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Ensure the schema exists. Idempotent.
    async fn initialize(&self) -> std::result::Result<(), MemoryError>;

    /// Append an episode and return its id.
    async fn store_episodic_memory(&self, episode: NewEpisode) -> std::result::Result<i64, MemoryError>;

    /// The `limit` most recent episodes, newest first (ties broken by id).
    async fn recent_memories(&self, limit: usize) -> std::result::Result<Vec<EpisodicMemoryRecord>, MemoryError>;

    /// Insert or replace a fact.
    async fn store_semantic_memory(
        &self,
        key: &str,
        value: serde_json::Value,
        confidence: f64,
    ) -> std::result::Result<(), MemoryError>;

    /// Look up a fact by key.
    async fn semantic_memory(&self, key: &str) -> std::result::Result<Option<SemanticMemoryRecord>, MemoryError>;

    /// Append a snapshot of the given state and return its id.
    async fn store_internal_state(&self, state: &InternalState) -> std::result::Result<i64, MemoryError>;

    /// The most recent snapshot, if any.
    async fn latest_internal_state(&self) -> std::result::Result<Option<InternalStateSnapshot>, MemoryError>;

    /// Number of stored snapshots.
    async fn internal_state_count(&self) -> std::result::Result<usize, MemoryError>;

    /// Release resources. Closing twice is a no-op.
    async fn close(&self) -> std::result::Result<(), MemoryError>;
}

//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use sentia_core::error::MemoryError;
use sentia_core::memory::{
    EpisodicMemoryRecord, InternalStateSnapshot, MemoryStore, NewEpisode, SemanticMemoryRecord,
};
use sentia_core::InternalState;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    episodes: Vec<EpisodicMemoryRecord>,
    facts: HashMap<String, SemanticMemoryRecord>,
    snapshots: Vec<InternalStateSnapshot>,
    next_episode_id: i64,
    next_snapshot_id: i64,
    closed: bool,
}

impl Tables {
    fn ensure_open(&self) -> Result<(), MemoryError> {
        if self.closed {
            Err(MemoryError::Closed)
        } else {
            Ok(())
        }
    }
}

/// An in-memory store with the same semantics as the SQLite store.
/// Nothing survives the process.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn initialize(&self) -> Result<(), MemoryError> {
        self.tables.read().await.ensure_open()
    }

    async fn store_episodic_memory(&self, episode: NewEpisode) -> Result<i64, MemoryError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        tables.next_episode_id += 1;
        let id = tables.next_episode_id;
        tables.episodes.push(EpisodicMemoryRecord {
            id,
            timestamp: episode.timestamp,
            event_type: episode.event_type,
            content: episode.content,
            metadata: episode.metadata,
            session_id: episode.session_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn recent_memories(&self, limit: usize) -> Result<Vec<EpisodicMemoryRecord>, MemoryError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        let mut episodes = tables.episodes.clone();
        episodes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        episodes.truncate(limit);
        Ok(episodes)
    }

    async fn store_semantic_memory(
        &self,
        key: &str,
        value: serde_json::Value,
        confidence: f64,
    ) -> Result<(), MemoryError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        tables.facts.insert(
            key.to_string(),
            SemanticMemoryRecord {
                key: key.to_string(),
                value,
                confidence,
                last_updated: Utc::now(),
            },
        );
        Ok(())
    }

    async fn semantic_memory(&self, key: &str) -> Result<Option<SemanticMemoryRecord>, MemoryError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        Ok(tables.facts.get(key).cloned())
    }

    async fn store_internal_state(&self, state: &InternalState) -> Result<i64, MemoryError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        tables.next_snapshot_id += 1;
        let id = tables.next_snapshot_id;
        let now = Utc::now();
        tables.snapshots.push(InternalStateSnapshot {
            id,
            timestamp: now.timestamp_millis(),
            energy: state.energy,
            mood: state.mood,
            confidence: state.confidence,
            events: state.recent_events.clone(),
            created_at: now,
        });
        Ok(id)
    }

    async fn latest_internal_state(&self) -> Result<Option<InternalStateSnapshot>, MemoryError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        Ok(tables
            .snapshots
            .iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn internal_state_count(&self) -> Result<usize, MemoryError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        Ok(tables.snapshots.len())
    }

    async fn close(&self) -> Result<(), MemoryError> {
        self.tables.write().await.closed = true;
        Ok(())
    }
}

//! Lifecycle events from the agent loop.
//!
//! A front end subscribes to push state to clients instead of polling the
//! self model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Something the loop did or failed to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An input event was accepted
    InputReceived {
        event_type: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The agent produced a reply
    ResponseGenerated {
        provider: Option<String>,
        content_length: usize,
        timestamp: DateTime<Utc>,
    },

    /// The periodic tick advanced the state
    StateTicked {
        energy: f64,
        mood: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// A store write failed and was skipped
    StorageFailed {
        operation: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The loop started or stopped
    StatusChanged {
        running: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out of [`DomainEvent`]s to any number of listeners.
///
/// Slow listeners lag and lose the oldest events; publishing never blocks.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// `capacity` events are buffered per listener.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

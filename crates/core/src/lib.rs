//! # Sentia Core
//!
//! Domain types, traits, and error definitions for the Sentia homeostatic agent.
//! This crate has **no I/O**; it defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem seam is a trait here (`Provider`, `MemoryStore`,
//! `InputAnalyzer`). Implementations live in their respective crates, so tests
//! can swap in scripted mocks and the dependency graph points inward.

pub mod error;
pub mod message;
pub mod provider;
pub mod memory;
pub mod state;
pub mod input;
pub mod analysis;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, MemoryError, ProviderError};
pub use message::{ConversationTurn, Message, Role, SelfView, TurnRole};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use memory::{EpisodicMemoryRecord, InternalStateSnapshot, MemoryStore, NewEpisode, SemanticMemoryRecord};
pub use state::{HomeostasisConfig, InternalState, Introspection};
pub use input::{Envelope, InputEvent, InputMetadata};
pub use analysis::{InputAnalyzer, TextAnalysis};
pub use event::{DomainEvent, EventBus};

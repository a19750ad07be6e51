//! The Sentia agent loop.
//!
//! Each input runs through the same pipeline:
//!
//! 1. **Persist** the raw input as an episode
//! 2. **Commands** (`:introspect`, `:status`, `:help`, `:stop`) are answered locally
//! 3. **Update** the self model (input event, sentiment), capture the prompt view
//! 4. **Generate** via the provider chain, with the self-model lock released
//! 5. **Record** the response episode, the action impact, and the agent turn
//!
//! A background task ticks the self model once per interval and persists a
//! snapshot each time.

pub mod analysis;
pub mod commands;
pub mod loop_runner;

pub use analysis::LexiconAnalyzer;
pub use commands::Command;
pub use loop_runner::{AgentLoop, AgentReply, ReplySource, LOW_ENERGY_REPLY, RESPONSE_EVENT};

//! Text-generation providers for Sentia.
//!
//! All adapters implement the `sentia_core::Provider` trait. The registry
//! maps names and aliases to adapters; the chain decides between fallback
//! and explicit selection.

pub mod anthropic;
pub mod chain;
pub mod gemini;
pub mod openai_compat;
pub mod prompt;
pub mod registry;
mod sse;

pub use anthropic::AnthropicProvider;
pub use chain::{local_fallback_text, ChainReply, ProviderChain, ProviderPolicy, ReplyOutcome};
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{build_from_config, ProviderRegistry};

//! Subcommand implementations and the setup they share.

pub mod chat;
pub mod init;
pub mod memory;
pub mod providers;
pub mod run;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use sentia_agent::AgentLoop;
use sentia_config::AppConfig;
use sentia_core::memory::MemoryStore;
use sentia_memory::SqliteStore;
use sentia_providers::ProviderPolicy;

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        None => AppConfig::load(),
        Some(path) => AppConfig::load_from(path).and_then(|mut config| {
            config.apply_env(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }),
    };
    config.context("Failed to load config")
}

/// Open the configured SQLite store. Failure here is fatal.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn MemoryStore>> {
    let store = SqliteStore::open(&config.memory.db_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open memory store at {}",
                config.memory.db_path.display()
            )
        })?;
    Ok(Arc::new(store))
}

/// Build an agent over the configured store, honouring a `--provider` override.
pub async fn build_agent(
    config: &AppConfig,
    provider: Option<String>,
) -> anyhow::Result<AgentLoop> {
    let store = open_store(config).await?;
    let mut agent = AgentLoop::new(config, store);
    if let Some(name) = provider {
        agent = agent.with_policy(ProviderPolicy::from_setting(&name));
    }
    Ok(agent)
}

/// Parse a JSON value, falling back to a plain string for bare words.
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

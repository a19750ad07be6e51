//! `sentia providers`: fallback order and configuration status.

use std::path::Path;

use sentia_core::provider::Provider;
use sentia_providers::{ProviderChain, ProviderPolicy};

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let chain = ProviderChain::from_config(&config);
    let policy = ProviderPolicy::from_setting(&config.agent.provider);

    println!("Providers");
    println!("=========");
    println!("  Policy:  {policy}");
    println!();

    for (rank, (provider, configured)) in chain.status().iter().enumerate() {
        let marker = if *configured { "configured" } else { "not configured" };
        println!(
            "  {}. {:<10} {:<16} {}",
            rank + 1,
            provider.name(),
            marker,
            provider.credential_env()
        );
    }

    let unordered: Vec<&str> = chain
        .registry()
        .names()
        .into_iter()
        .filter(|name| !chain.order().iter().any(|o| o.eq_ignore_ascii_case(name)))
        .collect();
    if !unordered.is_empty() {
        println!();
        println!("  Selectable by name only: {}", unordered.join(", "));
    }

    Ok(())
}

/// One-line summary, e.g. `OpenAI, Gemini (2 of 5 configured)`.
pub fn summary(chain: &ProviderChain) -> String {
    let status = chain.status();
    let configured: Vec<&str> = status
        .iter()
        .filter(|(_, configured)| *configured)
        .map(|(provider, _)| provider.display_name())
        .collect();

    if configured.is_empty() {
        format!("none configured (0 of {}); replies fall back to local text", status.len())
    } else {
        format!(
            "{} ({} of {} configured)",
            configured.join(", "),
            configured.len(),
            status.len()
        )
    }
}

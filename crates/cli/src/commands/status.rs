//! `sentia status`: latest persisted state.

use std::path::Path;

use chrono::{DateTime, Local, Utc};
use sentia_config::AppConfig;
use sentia_core::state::{ConfidenceStatus, EnergyStatus, MoodStatus};
use sentia_providers::ProviderChain;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let latest = store.latest_internal_state().await?;
    let snapshots = store.internal_state_count().await?;
    let chain = ProviderChain::from_config(&config);

    println!("Sentia Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Memory:       {}", config.memory.db_path.display());
    println!("  Provider:     {}", config.agent.provider);
    println!("  Providers:    {}", super::providers::summary(&chain));
    println!("  Tick:         every {}s", config.agent.tick_interval_secs);
    println!("  Snapshots:    {snapshots}");
    println!();

    match latest {
        Some(snapshot) => {
            let taken = DateTime::<Utc>::from_timestamp_millis(snapshot.timestamp)
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| snapshot.timestamp.to_string());
            let threshold = config.homeostasis.confidence_threshold;

            println!("  Last snapshot ({taken})");
            println!(
                "    Energy:      {:>6.2}  {:?}",
                snapshot.energy,
                EnergyStatus::classify(snapshot.energy)
            );
            println!(
                "    Mood:        {:>6.2}  {:?}",
                snapshot.mood,
                MoodStatus::classify(snapshot.mood)
            );
            println!(
                "    Confidence:  {:>6.2}  {:?}",
                snapshot.confidence,
                ConfidenceStatus::classify(snapshot.confidence, threshold)
            );
            if !snapshot.events.is_empty() {
                println!("    Events:      {}", snapshot.events.join(", "));
            }
        }
        None => println!("  No snapshots yet. Run `sentia run` first"),
    }

    store.close().await?;
    Ok(())
}

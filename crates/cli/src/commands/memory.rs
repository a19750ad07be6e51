//! `sentia memory`: inspect and edit stored memories.

use std::path::Path;

use chrono::{DateTime, Local, Utc};

pub async fn recent(config_path: Option<&Path>, limit: usize) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let episodes = store.recent_memories(limit).await?;
    if episodes.is_empty() {
        println!("  No episodes stored yet.");
    }
    for episode in &episodes {
        let when = DateTime::<Utc>::from_timestamp_millis(episode.timestamp)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| episode.timestamp.to_string());
        println!(
            "  {:>5}  {when}  {:<15} {}",
            episode.id,
            episode.event_type,
            preview(&episode.content, 80)
        );
    }

    store.close().await?;
    Ok(())
}

pub async fn get(config_path: Option<&Path>, key: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    match store.semantic_memory(key).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record.value)?);
            println!();
            println!("  confidence:   {:.2}", record.confidence);
            println!("  last updated: {}", record.last_updated.with_timezone(&Local));
        }
        None => println!("  No fact stored under '{key}'."),
    }

    store.close().await?;
    Ok(())
}

pub async fn set(
    config_path: Option<&Path>,
    key: &str,
    value: &str,
    confidence: f64,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&confidence),
        "Confidence must be between 0 and 1, got {confidence}"
    );

    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    store
        .store_semantic_memory(key, super::parse_value(value), confidence)
        .await?;
    println!("  Stored '{key}' (confidence {confidence:.2})");

    store.close().await?;
    Ok(())
}

/// First `max` characters on one line.
fn preview(content: &str, max: usize) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}…")
    } else {
        flat
    }
}

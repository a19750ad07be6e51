//! Sentia CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `run`: Interactive keyboard session with the tick running
//! - `chat`: Send a single message
//! - `status`: Show the latest persisted state
//! - `memory`: Inspect and edit stored memories
//! - `providers`: Show the fallback order and which backends are configured

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod keyboard;

#[derive(Parser)]
#[command(
    name = "sentia",
    about = "Sentia: a conversational agent with a homeostatic self model",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.sentia/config.toml
    #[arg(short, long, global = true, env = "SENTIA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start an interactive session
    Run {
        /// Print replies as they are generated
        #[arg(short, long)]
        stream: bool,

        /// Use this provider only ("auto" for the fallback chain)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Send a single message and print the reply
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Use this provider only ("auto" for the fallback chain)
        #[arg(short, long)]
        provider: Option<String>,

        /// Print the reply as it is generated
        #[arg(short, long)]
        stream: bool,
    },

    /// Show the latest persisted state
    Status,

    /// Inspect and edit stored memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Show providers in fallback order
    Providers,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show the most recent episodes
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Look up a fact
    Get { key: String },

    /// Store a fact (value is JSON; bare words are stored as strings)
    Set {
        key: String,
        value: String,

        #[arg(long, default_value_t = 1.0)]
        confidence: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force)?,
        Commands::Run { stream, provider } => {
            commands::run::run(config_path, provider, stream).await?
        }
        Commands::Chat {
            message,
            provider,
            stream,
        } => commands::chat::run(config_path, &message, provider, stream).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Memory { action } => match action {
            MemoryAction::Recent { limit } => commands::memory::recent(config_path, limit).await?,
            MemoryAction::Get { key } => commands::memory::get(config_path, &key).await?,
            MemoryAction::Set {
                key,
                value,
                confidence,
            } => commands::memory::set(config_path, &key, &value, confidence).await?,
        },
        Commands::Providers => commands::providers::run(config_path)?,
    }

    Ok(())
}

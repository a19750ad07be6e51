//! `sentia run`: interactive keyboard session.

use std::io::Write;
use std::path::Path;

use sentia_agent::AgentLoop;
use sentia_core::input::InputEvent;
use tracing::warn;

use crate::keyboard;

pub async fn run(config_path: Option<&Path>, provider: Option<String>, stream: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let agent = super::build_agent(&config, provider).await?;
    agent.start().await;

    let prefix = &config.agent.command_prefix;
    println!();
    println!("  Sentia interactive session");
    println!();
    println!("  Providers: {}", super::providers::summary(agent.chain()));
    println!("  Policy:    {}", agent.policy());
    println!("  Memory:    {}", config.memory.db_path.display());
    println!();
    println!("  Type a message and press Enter. {prefix}help lists commands.");
    println!("  {prefix}stop, Ctrl+D or Ctrl+C to quit.");
    println!();

    let mut rx = keyboard::spawn_stdin();
    prompt()?;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(Ok(event)) => {
                    respond(&agent, event, stream).await?;
                    if !agent.is_running() {
                        break;
                    }
                    prompt()?;
                }
                Some(Err(e)) => {
                    warn!("Keyboard input failed: {e}");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    agent.stop().await;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

async fn respond(agent: &AgentLoop, event: InputEvent, stream: bool) -> anyhow::Result<()> {
    let result = if stream {
        print!("  Sentia > ");
        std::io::stdout().flush()?;
        let reply = agent
            .handle_input_streaming(event, |chunk| {
                print!("{chunk}");
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();
        reply.map(|_| ())
    } else {
        agent.handle_input(event).await.map(|reply| {
            for line in reply.content.lines() {
                println!("  Sentia > {line}");
            }
        })
    };

    if let Err(e) = result {
        eprintln!("  [Error] {e}");
    }
    println!();
    Ok(())
}

//! `sentia chat`: one turn, then exit.

use std::io::Write;
use std::path::Path;

use sentia_core::input::InputEvent;

pub async fn run(
    config_path: Option<&Path>,
    message: &str,
    provider: Option<String>,
    stream: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let agent = super::build_agent(&config, provider).await?;
    agent.start().await;

    let event = InputEvent::keyboard(message);
    let reply = if stream {
        let reply = agent
            .handle_input_streaming(event, |chunk| {
                print!("{chunk}");
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();
        reply
    } else {
        agent.handle_input(event).await.inspect(|reply| println!("{}", reply.content))
    };

    agent.stop().await;

    let reply = reply?;
    if let Some(provider) = &reply.provider {
        tracing::debug!(provider = %provider, "Reply generated");
    }
    Ok(())
}

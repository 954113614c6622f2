// src/main.rs

use anyhow::Result;
use clap::Parser;
use deckhand::cli::{Cli, Commands};
use deckhand::commands;
use deckhand::config::AgentConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => commands::serve(&config)?,
        Commands::Register {
            url,
            token,
            node_url,
            name,
        } => commands::register(&config, &url, &token, node_url, name)?,
        Commands::Unregister => commands::unregister(&config)?,
        Commands::Info => commands::info(&config)?,
    }

    Ok(())
}

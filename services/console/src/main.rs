use anyhow::{Context, Result};
use clap::Parser;
use common::ApiConfig;
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod commands;
mod devices;
mod dialog;
mod render;
mod users;
mod validation;

#[cfg(test)]
mod test_support;

use crate::{
    cli::Cli,
    commands::{Console, Responder, retry_hint},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default subscriber failed")?;

    let mut config = ApiConfig::from_env().context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(token_path) = cli.token_path {
        config.token_path = token_path;
    }
    config.validate().context("Invalid configuration")?;
    debug!("Using API at {}", config.base_url);

    let responder = if cli.yes {
        Responder::AssumeYes
    } else {
        Responder::Terminal
    };

    let mut console = Console::connect(config, responder).await?;
    match console.run(cli.command).await {
        Ok(output) => {
            let output = output.trim_end();
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            if let Some(hint) = retry_hint(&e) {
                warn!("{}", hint);
            }
            Err(e)
        }
    }
}

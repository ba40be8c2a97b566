//! Main entry point for the zipserve server.
//!
//! Loads the configuration, sets up logging and serves the configured routes
//! until interrupted.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zipserve::{Cli, Router, Server, ServerConfig, ZipBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Loading configuration from {}", cli.config.display());
    let mut config = ServerConfig::from_file(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
        config.validate()?;
    }

    info!(
        routes = config.routes.len(),
        max_entry_size = config.max_entry_size,
        "Configuration loaded"
    );

    let router = Router::from_config(&config, ZipBackend::new()?)?;
    let server = Server::bind(config.listen_addr()?, router).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

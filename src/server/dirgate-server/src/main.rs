//! Dirgate Server - Main entry point.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DirgateConfig;

#[derive(Parser)]
#[command(name = "dirgate-server")]
#[command(about = "Dirgate - Directory authentication gateway")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/dirgate.toml", env = "DIRGATE_CONFIG")]
    config: PathBuf,

    /// Server bind address, overrides the configuration file
    #[arg(long, env = "DIRGATE_BIND_ADDRESS")]
    bind: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "DIRGATE_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    tracing::info!("Starting Dirgate server...");
    tracing::info!("Configuration file: {}", cli.config.display());

    let config = DirgateConfig::from_file(&cli.config)?;
    let bind = cli.bind.unwrap_or_else(|| config.bind.clone());
    let state = config.into_state()?;

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, dirgate_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

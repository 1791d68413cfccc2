//! Strain — gRPC stress server entry point.
//!
//! Configuration is read from environment variables (see `config`), plus:
//!   RUST_LOG – tracing filter (default: strain_server=info,strain_core=info)

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use strain_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strain_server=info,strain_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();

    // ── Configuration ────────────────────────────────────────────────────────
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let bind_addr = config.bind_addr();

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    info!(bind_addr = %bind_addr, mode = %config.mode, "Strain starting");

    // ── gRPC server ──────────────────────────────────────────────────────────
    strain_server::serve(config, listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => {
            // Without a signal handler the server simply runs until killed.
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}

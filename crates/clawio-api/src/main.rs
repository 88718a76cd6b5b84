//! # clawio-data: Binary Entry Point
//!
//! Starts the Axum HTTP server for the data service. Configuration comes
//! from `CLAWIO_DATA_*` environment variables, see [`clawio_api::config`].

use clawio_api::auth::{AuthConfig, StaticTokenVerifier};
use clawio_api::config::{AppConfig, LogFormat};
use clawio_api::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    tracing::info!(?config, "configuration loaded");

    // Unknown names are accepted; each upload then fails with
    // UnsupportedChecksumAlgorithm.
    if let Err(e) = config.store.checksum_algorithm() {
        tracing::warn!("{e}");
    }

    let verifier = StaticTokenVerifier::from_pairs(config.tokens.iter().cloned()).map_err(|e| {
        tracing::error!("invalid token table: {e}");
        e
    })?;
    if verifier.is_empty() {
        tracing::warn!("no tokens configured; every blob request will be rejected");
    }

    let state = AppState::from_config(&config)?;
    let app = clawio_api::app(state, AuthConfig::new(verifier));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("clawio-data listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("clawio-data stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

//! # Device Sentry Main Application Entry Point
//!
//! Parses command-line arguments, initializes tracing, and runs the server
//! and scan loop until Ctrl-C.
//!
//! - First argument: Port number (defaults to the configured port, 3031)
//! - Second argument: Path to configuration file (defaults to "config.json5")
//!
//! ## Example Usage
//!
//! ```bash
//! # Run with default settings
//! cargo run
//!
//! # Run on a specific port with a specific configuration file
//! cargo run 8080 my-config.json5
//! ```
//!
//! A `.env` file in the working directory is loaded before configuration, so
//! `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` and `DEBUG` can live there.
//! Log levels are controlled through the `RUST_LOG` environment variable.

use device_sentry::error::SentryError;
use device_sentry::server;
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), SentryError> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let port = env::args().nth(1).and_then(|s| s.parse().ok());
    let config_file_path = env::args().nth(2).map(PathBuf::from);

    tracing::info!("Starting Device Sentry");

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    server::run(port, config_file_path, cancel_token).await?;

    tracing::info!("Device Sentry shutting down");
    Ok(())
}

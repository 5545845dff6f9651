//! Media Gallery Server - Entry Point
//!
//! This is the main entry point for the media gallery server.
//! It loads environment configuration, initializes logging, and starts
//! the HTTP server.

use media_gallery_server::{config::Config, run};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Media Gallery Server"
    );

    // Run the server
    run(config).await
}

/// Initialize logging based on configuration
fn init_logging(config: &media_gallery_server::config::LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

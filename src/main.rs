//! frame-prep HTTP server
//!
//! Configuration is read from the JSON file named by `FRAME_PREP_CONFIG` (if
//! set), then `FRAME_PREP_*` environment overrides are applied. Log verbosity
//! follows `RUST_LOG` and defaults to `info`.

use frame_prep::{Config, api, shutdown_signal};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    tokio::fs::create_dir_all(&config.storage.root).await?;
    tracing::info!(
        root = %config.storage.root.display(),
        mode = %config.output.mode,
        "Storage root ready"
    );

    api::start_api_server(Arc::new(config), shutdown_signal()).await?;
    Ok(())
}

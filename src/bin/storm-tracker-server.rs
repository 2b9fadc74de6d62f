//! # Storm Tracker Server
//!
//! ## Usage
//!
//! ```bash
//! # Run with the development section of config/storm-tracker.yaml
//! cargo run --bin storm-tracker-server
//!
//! # Run against production settings
//! STORM_TRACKER_ENV=production DATABASE_URL=postgresql://db/storms cargo run --bin storm-tracker-server
//! ```

use anyhow::Context;
use tracing::info;

use storm_tracker::config::ConfigManager;
use storm_tracker::logging;
use storm_tracker::StormTrackerApp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    logging::init_structured_logging();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_mode = if cfg!(debug_assertions) { "debug" } else { "release" },
        "Starting storm tracker server"
    );

    let config = ConfigManager::load().context("failed to load configuration")?;
    info!(config = %config.debug_config(), "Effective configuration");

    let app = StormTrackerApp::bootstrap(config)
        .await
        .context("failed to bootstrap storm tracker")?;

    info!(
        storms = app.repository().count().await?,
        "Ready; press Ctrl+C to shut down"
    );

    app.serve().await?;

    info!("Storm tracker server stopped");
    Ok(())
}

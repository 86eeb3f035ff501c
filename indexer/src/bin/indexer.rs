//! Stablecoin indexer binary
//!
//! Replays a decoded transfer log through the ledger and writes TSV output.

use anyhow::Context;
use indexer::Config;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting stablecoin indexer");

    // Load configuration
    let config = if let Ok(config_path) = std::env::var("INDEXER_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path))?
    } else {
        info!("Loading config from environment variables");
        Config::from_env().context("loading config from environment")?
    };

    info!(
        "Tracking {} assets, threshold {}, snapshot every {} blocks",
        config.ledger.assets.len(),
        config.ledger.significance_threshold,
        config.ledger.snapshot_cadence_blocks
    );

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let report = indexer::run(&config, shutdown).await?;

    info!(
        "Output in {:?} (last block {:?}, {} addresses tracked)",
        report.run_dir, report.stats.last_block, report.stats.tracked_addresses
    );
    Ok(())
}

//! One indexing run: TSV in, chunked TSV out

use crate::{Config, Error, Result, TsvEventSource, TsvRecordSink};
use ledger_core::{spawn_ingestion, IngestionLoop, IngestionStats, Metrics};
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier
    pub run_id: String,
    /// Directory holding the run's chunks
    pub run_dir: PathBuf,
    /// Final ingestion counters
    pub stats: IngestionStats,
}

/// Index `config.input_path` until it is exhausted or `shutdown` resolves.
///
/// On shutdown the block in progress (and any snapshot it triggers) still
/// completes, then the open chunk is closed.
pub async fn run<F>(config: &Config, shutdown: F) -> Result<RunReport>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let run_id = config.resolve_run_id();
    let run_dir = config.output_dir.join(&run_id);
    info!("Run {} reading {:?}, writing {:?}", run_id, config.input_path, run_dir);

    let source = TsvEventSource::open(&config.input_path)?;
    let sink = TsvRecordSink::create(&run_dir, config.chunk_size_bytes())?;
    let metrics =
        Metrics::new().map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;

    let ingestion = IngestionLoop::new(
        &config.ledger,
        Box::new(source),
        Box::new(sink),
        metrics.clone(),
    )?;
    let (handle, mut task) = spawn_ingestion(ingestion, config.ledger.mailbox_capacity);

    tokio::pin!(shutdown);
    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = &mut shutdown => {
            info!("Shutdown requested, finishing current block");
            if let Err(e) = handle.shutdown().await {
                // Actor already stopped on its own
                debug!("Shutdown not delivered: {}", e);
            }
            task.await
        }
    };
    let stats = joined.map_err(|e| Error::Other(format!("Ingestion task failed: {}", e)))??;

    if config.metrics_file {
        let text = metrics
            .encode_text()
            .map_err(|e| Error::Other(format!("Failed to encode metrics: {}", e)))?;
        std::fs::write(run_dir.join("metrics.prom"), text)?;
    }

    info!(
        "Run {} complete: {} blocks, {} transfers, {} balances, {} summaries",
        run_id, stats.blocks, stats.transfer_records, stats.balance_records, stats.summary_records
    );

    Ok(RunReport {
        run_id,
        run_dir,
        stats,
    })
}

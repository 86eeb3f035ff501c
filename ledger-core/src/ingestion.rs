//! Ingestion driver
//!
//! Pulls ordered blocks from an [`EventSource`], applies them to the
//! [`Ledger`], forwards emitted records to a [`RecordSink`], and runs the
//! snapshot + reclaim pass at cadence boundaries.
//!
//! All ledger mutation happens on the task that owns the [`IngestionLoop`];
//! only source pulls and sink writes are I/O.

use crate::{
    ledger::Ledger, metrics::Metrics, snapshot::SnapshotCadence, types::BlockEvents,
    types::Record, Config, Result,
};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info};

/// Producer of decoded transfer events, one block at a time
#[async_trait]
pub trait EventSource: Send {
    /// Next block in ascending height order, or `None` at end of range.
    ///
    /// Must be cancel-safe: dropping the future before completion must not
    /// lose events.
    async fn next_block(&mut self) -> Result<Option<BlockEvents>>;
}

/// Consumer of emitted records
#[async_trait]
pub trait RecordSink: Send {
    /// Append one record
    async fn append(&mut self, record: &Record) -> Result<()>;

    /// Make everything appended so far durable
    async fn flush(&mut self) -> Result<()>;

    /// Final flush at end of ingestion
    async fn close(&mut self) -> Result<()> {
        self.flush().await
    }

    /// Sink type for logging
    fn sink_type(&self) -> &'static str;
}

/// Running counters of an ingestion loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Blocks applied
    pub blocks: u64,
    /// Last applied block height
    pub last_block: Option<u64>,
    /// Events applied to the ledger
    pub events_applied: u64,
    /// Zero-value events discarded
    pub events_zero_value: u64,
    /// Events skipped for unknown asset
    pub events_unknown_asset: u64,
    /// Transfer records emitted
    pub transfer_records: u64,
    /// Balance records emitted
    pub balance_records: u64,
    /// Summary records emitted
    pub summary_records: u64,
    /// Snapshot passes
    pub snapshots: u64,
    /// Addresses reclaimed
    pub reclaimed_addresses: u64,
    /// Addresses currently tracked
    pub tracked_addresses: usize,
    /// True once the source reported end of range
    pub exhausted: bool,
}

/// Sequential driver of one ledger
pub struct IngestionLoop {
    ledger: Ledger,
    source: Box<dyn EventSource>,
    sink: Box<dyn RecordSink>,
    cadence: SnapshotCadence,
    metrics: Metrics,
    stats: IngestionStats,
}

impl IngestionLoop {
    /// Create new loop from configuration
    pub fn new(
        config: &Config,
        source: Box<dyn EventSource>,
        sink: Box<dyn RecordSink>,
        metrics: Metrics,
    ) -> Result<Self> {
        Ok(Self::with_ledger(
            Ledger::new(config)?,
            SnapshotCadence::new(config.snapshot_cadence_blocks),
            source,
            sink,
            metrics,
        ))
    }

    /// Create new loop around an existing ledger
    pub fn with_ledger(
        ledger: Ledger,
        cadence: SnapshotCadence,
        source: Box<dyn EventSource>,
        sink: Box<dyn RecordSink>,
        metrics: Metrics,
    ) -> Self {
        Self {
            ledger,
            source,
            sink,
            cadence,
            metrics,
            stats: IngestionStats::default(),
        }
    }

    /// Drive the source to exhaustion, then close the sink
    pub async fn run_to_end(&mut self) -> Result<IngestionStats> {
        info!("Ingestion started, writing to {} sink", self.sink.sink_type());

        while let Some(block) = self.source.next_block().await? {
            self.process_block(block).await?;
        }
        self.finish(true).await
    }

    /// Pull the next block from the source
    pub(crate) async fn next_block(&mut self) -> Result<Option<BlockEvents>> {
        self.source.next_block().await
    }

    /// Apply one block, forward its records, and snapshot if a boundary was reached
    pub(crate) async fn process_block(&mut self, block: BlockEvents) -> Result<()> {
        let outcome = self.ledger.apply_block(&block)?;

        self.stats.blocks += 1;
        self.stats.last_block = Some(block.height);
        self.stats.events_applied += outcome.applied as u64;
        self.stats.events_zero_value += outcome.zero_value as u64;
        self.stats.events_unknown_asset += outcome.unknown_asset as u64;
        self.metrics
            .record_block(outcome.applied, outcome.zero_value, outcome.unknown_asset);

        self.forward(&outcome.records).await?;

        if self.cadence.is_due(block.height) {
            let started = Instant::now();
            let snapshot = self.ledger.snapshot(block.stamp());
            self.metrics
                .record_snapshot(snapshot.reclaim.removed, started.elapsed().as_secs_f64());
            self.stats.snapshots += 1;
            self.stats.reclaimed_addresses += snapshot.reclaim.removed as u64;

            self.forward(&snapshot.records).await?;
            self.sink.flush().await?;
            debug!(
                "Snapshot at block {}: {} summaries, next boundary {:?}",
                block.height,
                snapshot.records.len(),
                self.cadence.next_boundary()
            );
        }

        self.stats.tracked_addresses = self.ledger.tracked_addresses();
        self.metrics.set_tracked_addresses(self.stats.tracked_addresses);
        Ok(())
    }

    /// Close the sink and return final counters
    pub(crate) async fn finish(&mut self, exhausted: bool) -> Result<IngestionStats> {
        self.sink.close().await?;
        self.stats.exhausted = exhausted;
        info!(
            "Ingestion stopped after {} blocks (last {:?}): {} events applied, {} tracked addresses",
            self.stats.blocks,
            self.stats.last_block,
            self.stats.events_applied,
            self.stats.tracked_addresses
        );
        Ok(self.stats.clone())
    }

    /// Current counters
    pub fn stats(&self) -> &IngestionStats {
        &self.stats
    }

    /// The driven ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn forward(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.sink.append(record).await?;
            self.metrics.record_emitted(record.kind());
            match record {
                Record::Transfer(_) => self.stats.transfer_records += 1,
                Record::Balance(_) => self.stats.balance_records += 1,
                Record::Summary(_) => self.stats.summary_records += 1,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for IngestionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionLoop")
            .field("sink", &self.sink.sink_type())
            .field("cadence", &self.cadence)
            .field("stats", &self.stats)
            .finish()
    }
}

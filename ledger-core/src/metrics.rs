//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring ingestion.
//!
//! # Metrics
//!
//! - `ledger_blocks_total` - Blocks applied
//! - `ledger_events_applied_total` - Transfer events that reached the ledger
//! - `ledger_events_skipped_total{reason}` - Zero-value and unknown-asset events
//! - `ledger_records_emitted_total{kind}` - Records handed to the sink
//! - `ledger_snapshots_total` - Snapshot + reclaim passes
//! - `ledger_reclaimed_addresses_total` - Addresses evicted below threshold
//! - `ledger_tracked_addresses` - Addresses currently held in memory
//! - `ledger_snapshot_duration_seconds` - Histogram of snapshot + reclaim latency

use crate::types::RecordKind;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Blocks applied
    pub blocks_total: IntCounter,

    /// Events applied to the ledger
    pub events_applied: IntCounter,

    /// Events skipped, by reason
    pub events_skipped: IntCounterVec,

    /// Records emitted, by kind
    pub records_emitted: IntCounterVec,

    /// Snapshot passes
    pub snapshots_total: IntCounter,

    /// Addresses evicted
    pub reclaimed_addresses: IntCounter,

    /// Addresses currently tracked
    pub tracked_addresses: IntGauge,

    /// Snapshot + reclaim duration histogram
    pub snapshot_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let blocks_total = IntCounter::new("ledger_blocks_total", "Blocks applied")?;
        registry.register(Box::new(blocks_total.clone()))?;

        let events_applied = IntCounter::new(
            "ledger_events_applied_total",
            "Transfer events applied to the ledger",
        )?;
        registry.register(Box::new(events_applied.clone()))?;

        let events_skipped = IntCounterVec::new(
            Opts::new("ledger_events_skipped_total", "Transfer events skipped"),
            &["reason"],
        )?;
        registry.register(Box::new(events_skipped.clone()))?;

        let records_emitted = IntCounterVec::new(
            Opts::new("ledger_records_emitted_total", "Records handed to the sink"),
            &["kind"],
        )?;
        registry.register(Box::new(records_emitted.clone()))?;

        let snapshots_total =
            IntCounter::new("ledger_snapshots_total", "Snapshot and reclaim passes")?;
        registry.register(Box::new(snapshots_total.clone()))?;

        let reclaimed_addresses = IntCounter::new(
            "ledger_reclaimed_addresses_total",
            "Addresses evicted below the significance threshold",
        )?;
        registry.register(Box::new(reclaimed_addresses.clone()))?;

        let tracked_addresses =
            IntGauge::new("ledger_tracked_addresses", "Addresses currently tracked")?;
        registry.register(Box::new(tracked_addresses.clone()))?;

        let snapshot_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_snapshot_duration_seconds",
                "Histogram of snapshot and reclaim latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(snapshot_duration.clone()))?;

        Ok(Self {
            blocks_total,
            events_applied,
            events_skipped,
            records_emitted,
            snapshots_total,
            reclaimed_addresses,
            tracked_addresses,
            snapshot_duration,
            registry,
        })
    }

    /// Record an applied block
    pub fn record_block(&self, applied: usize, zero_value: usize, unknown_asset: usize) {
        self.blocks_total.inc();
        self.events_applied.inc_by(applied as u64);
        self.events_skipped
            .with_label_values(&["zero_value"])
            .inc_by(zero_value as u64);
        self.events_skipped
            .with_label_values(&["unknown_asset"])
            .inc_by(unknown_asset as u64);
    }

    /// Record one emitted record
    pub fn record_emitted(&self, kind: RecordKind) {
        self.records_emitted.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record a snapshot pass
    pub fn record_snapshot(&self, reclaimed: usize, duration_seconds: f64) {
        self.snapshots_total.inc();
        self.reclaimed_addresses.inc_by(reclaimed as u64);
        self.snapshot_duration.observe(duration_seconds);
    }

    /// Update tracked address gauge
    pub fn set_tracked_addresses(&self, count: usize) {
        self.tracked_addresses.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("blocks_total", &self.blocks_total.get())
            .field("tracked_addresses", &self.tracked_addresses.get())
            .finish()
    }
}

//! Stablecoin Ledger Core
//!
//! Exact, in-memory balance ledger driven by an ordered stream of token
//! transfer events.
//!
//! # Architecture
//!
//! - **Single Writer**: one task owns all mutable state ([`actor`])
//! - **Exact Arithmetic**: balances are signed 256-bit integers, never floats
//! - **Significance Filter**: presentation-scale values gate output, not state
//! - **Periodic Reclaim**: insignificant holders are evicted at cadence boundaries
//!
//! # Invariants
//!
//! - Conservation: Σ deltas of a transfer is zero when neither side is the sentinel
//! - No zero entries: an (address, asset) pair exists only while nonzero
//! - Deterministic replay: same events, same configuration → same records

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod reclaim;
pub mod registry;
pub mod significance;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod updater;
pub mod value;

// Re-exports
pub use actor::{spawn_ingestion, IngestionHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use ingestion::{EventSource, IngestionLoop, IngestionStats, RecordSink};
pub use ledger::{BlockOutcome, Ledger, SnapshotOutcome};
pub use metrics::Metrics;
pub use types::{
    Address, Asset, AssetId, BalanceRecord, BlockEvents, BlockStamp, OrderingKey, Record,
    RecordKind, SummaryRecord, TransferEvent, TransferRecord,
};
pub use value::ExactValue;

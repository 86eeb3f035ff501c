//! Stablecoin Balance Indexer
//!
//! File-backed collaborators for `ledger_core`: a TSV transfer log as the
//! event source and rotated TSV chunks as the record sink.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod runner;
pub mod sink;
pub mod source;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use runner::{run, RunReport};
pub use sink::TsvRecordSink;
pub use source::TsvEventSource;

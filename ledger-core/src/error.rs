//! Error types for the ledger

use crate::types::OrderingKey;
use alloy_primitives::Address;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Exact arithmetic left the representable range. Always fatal.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Ordering key regressed relative to the last applied event
    #[error("Out-of-order event: {next} follows {previous}")]
    OutOfOrder {
        /// Last key applied to the ledger
        previous: OrderingKey,
        /// Offending key
        next: OrderingKey,
    },

    /// Token contract has no registered asset (and therefore no decimals)
    #[error("Unknown asset contract: {0:#x}")]
    UnknownAsset(Address),

    /// Invalid event
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event source failure
    #[error("Event source error: {0}")]
    Source(String),

    /// Record sink failure
    #[error("Record sink error: {0}")]
    Sink(String),

    /// Concurrency error (mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the ingestion loop may skip the offending event and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownAsset(_))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

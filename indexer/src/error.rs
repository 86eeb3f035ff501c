//! Error types for the indexer

use thiserror::Error;

/// Result type for indexer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Indexer errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// TSV read or write error
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed input row
    #[error("Malformed input at line {line}: {message}")]
    Parse {
        /// 1-based line number in the input file
        line: u64,
        /// What was wrong
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Convert into the ledger's event source error
    pub fn into_source_error(self) -> ledger_core::Error {
        match self {
            Error::Ledger(e) => e,
            other => ledger_core::Error::Source(other.to_string()),
        }
    }

    /// Convert into the ledger's record sink error
    pub fn into_sink_error(self) -> ledger_core::Error {
        match self {
            Error::Ledger(e) => e,
            other => ledger_core::Error::Sink(other.to_string()),
        }
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

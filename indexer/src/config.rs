//! Configuration for the indexer

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoded transfer log file (TSV)
    pub input_path: PathBuf,

    /// Root of all runs
    pub output_dir: PathBuf,

    /// Run directory name; generated from the start time if absent
    pub run_id: Option<String>,

    /// Close the current chunk on flush once it reaches this size
    pub chunk_size_mb: u64,

    /// Write `metrics.prom` into the run directory on exit
    pub metrics_file: bool,

    /// Ledger settings
    pub ledger: ledger_core::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("./transfers-in.tsv"),
            output_dir: PathBuf::from("./data"),
            run_id: None,
            chunk_size_mb: 10,
            metrics_file: true,
            ledger: ledger_core::Config::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config {
            ledger: ledger_core::Config::from_env()?,
            ..Config::default()
        };

        if let Ok(input) = std::env::var("INDEXER_INPUT") {
            config.input_path = PathBuf::from(input);
        }

        if let Ok(output) = std::env::var("INDEXER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(output);
        }

        if let Ok(run_id) = std::env::var("RUN_ID") {
            config.run_id = Some(run_id);
        }

        if let Ok(size) = std::env::var("INDEXER_CHUNK_SIZE_MB") {
            config.chunk_size_mb = size
                .parse()
                .map_err(|e| Error::Config(format!("Invalid INDEXER_CHUNK_SIZE_MB: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_mb == 0 {
            return Err(Error::Config("chunk_size_mb must be positive".to_string()));
        }

        if let Some(run_id) = &self.run_id {
            if run_id.is_empty() || run_id.contains(|c: char| c == '/' || c == '\\') || run_id == ".." {
                return Err(Error::Config(format!("Invalid run_id '{}'", run_id)));
            }
        }

        self.ledger.validate()?;
        Ok(())
    }

    /// Chunk size limit in bytes
    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb.saturating_mul(1024 * 1024)
    }

    /// Configured run id, or the current UTC time
    pub fn resolve_run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(|| {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H-%M-%S%.3fZ")
                .to_string()
        })
    }
}

//! Chunked TSV record sink
//!
//! Writes the three output tables of a run:
//!
//! - `transfers.tsv`: block, timestamp, token, from, to, value, value_usd
//! - `balances.tsv`: block, timestamp, address, token, balance, balance_usd
//! - `summary.tsv`: block, timestamp, address, total_balance_usd, token_count
//!
//! Rows go into chunk directories under the run directory. A chunk is written
//! as `<first:010>-open` and renamed to `<first:010>-<last:010>` when it is
//! closed: on a flush once its files reach the size limit, and on close.

use crate::{Error, Result};
use async_trait::async_trait;
use csv::WriterBuilder;
use ledger_core::{BalanceRecord, Record, RecordSink, SummaryRecord, TransferRecord};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `transfers.tsv` columns
pub const TRANSFER_COLUMNS: [&str; 7] =
    ["block", "timestamp", "token", "from", "to", "value", "value_usd"];

/// `balances.tsv` columns
pub const BALANCE_COLUMNS: [&str; 6] =
    ["block", "timestamp", "address", "token", "balance", "balance_usd"];

/// `summary.tsv` columns
pub const SUMMARY_COLUMNS: [&str; 5] =
    ["block", "timestamp", "address", "total_balance_usd", "token_count"];

type TsvWriter = csv::Writer<File>;

fn open_table(dir: &Path, name: &str, columns: &[&str]) -> Result<TsvWriter> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(dir.join(name))?;
    writer.write_record(columns)?;
    Ok(writer)
}

/// Final directory name of a chunk
pub fn chunk_name(first_block: u64, last_block: u64) -> String {
    format!("{:010}-{:010}", first_block, last_block)
}

/// One open chunk directory
struct Chunk {
    dir: PathBuf,
    first_block: u64,
    last_block: u64,
    transfers: TsvWriter,
    balances: TsvWriter,
    summary: TsvWriter,
}

impl Chunk {
    fn open(run_dir: &Path, first_block: u64) -> Result<Self> {
        let dir = run_dir.join(format!("{:010}-open", first_block));
        fs::create_dir_all(&dir)?;

        Ok(Self {
            transfers: open_table(&dir, "transfers.tsv", &TRANSFER_COLUMNS)?,
            balances: open_table(&dir, "balances.tsv", &BALANCE_COLUMNS)?,
            summary: open_table(&dir, "summary.tsv", &SUMMARY_COLUMNS)?,
            dir,
            first_block,
            last_block: first_block,
        })
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        self.last_block = self.last_block.max(record.block());
        match record {
            Record::Transfer(r) => self.transfers.write_record(transfer_row(r))?,
            Record::Balance(r) => self.balances.write_record(balance_row(r))?,
            Record::Summary(r) => self.summary.write_record(summary_row(r))?,
        }
        Ok(())
    }

    /// Flush all tables, returning their combined size on disk
    fn flush(&mut self) -> Result<u64> {
        self.transfers.flush()?;
        self.balances.flush()?;
        self.summary.flush()?;

        let mut size = 0;
        for name in ["transfers.tsv", "balances.tsv", "summary.tsv"] {
            size += fs::metadata(self.dir.join(name))?.len();
        }
        Ok(size)
    }

    fn close(mut self, run_dir: &Path) -> Result<PathBuf> {
        self.flush()?;
        let Chunk {
            dir,
            first_block,
            last_block,
            transfers,
            balances,
            summary,
        } = self;
        drop((transfers, balances, summary));

        let target = run_dir.join(chunk_name(first_block, last_block));
        fs::rename(&dir, &target)?;
        Ok(target)
    }
}

fn transfer_row(r: &TransferRecord) -> [String; 7] {
    [
        r.block.to_string(),
        r.timestamp.to_string(),
        r.asset.to_string(),
        format!("{:#x}", r.from),
        format!("{:#x}", r.to),
        r.value.to_string(),
        r.value_presentation.to_string(),
    ]
}

fn balance_row(r: &BalanceRecord) -> [String; 6] {
    [
        r.block.to_string(),
        r.timestamp.to_string(),
        format!("{:#x}", r.address),
        r.asset.to_string(),
        r.balance.to_string(),
        r.balance_presentation.to_string(),
    ]
}

fn summary_row(r: &SummaryRecord) -> [String; 5] {
    [
        r.block.to_string(),
        r.timestamp.to_string(),
        format!("{:#x}", r.address),
        r.total_presentation.to_string(),
        r.qualifying_assets.to_string(),
    ]
}

/// Record sink writing rotated TSV chunks under one run directory
pub struct TsvRecordSink {
    run_dir: PathBuf,
    chunk_limit_bytes: u64,
    chunk: Option<Chunk>,
    closed_chunks: Vec<PathBuf>,
}

impl TsvRecordSink {
    /// Create the run directory and an empty sink
    pub fn create(run_dir: impl Into<PathBuf>, chunk_limit_bytes: u64) -> Result<Self> {
        let run_dir = run_dir.into();
        fs::create_dir_all(&run_dir)?;

        Ok(Self {
            run_dir,
            chunk_limit_bytes,
            chunk: None,
            closed_chunks: Vec::new(),
        })
    }

    /// Run directory
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Chunks closed so far, oldest first
    pub fn closed_chunks(&self) -> &[PathBuf] {
        &self.closed_chunks
    }

    fn append_record(&mut self, record: &Record) -> Result<()> {
        if self.chunk.is_none() {
            self.chunk = Some(Chunk::open(&self.run_dir, record.block())?);
        }
        match self.chunk.as_mut() {
            Some(chunk) => chunk.write(record),
            None => Ok(()),
        }
    }

    fn flush_chunk(&mut self) -> Result<()> {
        let Some(chunk) = self.chunk.as_mut() else {
            return Ok(());
        };

        let size = chunk.flush()?;
        debug!("Flushed chunk at block {} ({} bytes)", chunk.last_block, size);
        if size >= self.chunk_limit_bytes {
            self.close_chunk()?;
        }
        Ok(())
    }

    fn close_chunk(&mut self) -> Result<()> {
        if let Some(chunk) = self.chunk.take() {
            let path = chunk.close(&self.run_dir)?;
            info!("Closed output chunk {:?}", path);
            self.closed_chunks.push(path);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSink for TsvRecordSink {
    async fn append(&mut self, record: &Record) -> ledger_core::Result<()> {
        self.append_record(record).map_err(Error::into_sink_error)
    }

    async fn flush(&mut self) -> ledger_core::Result<()> {
        self.flush_chunk().map_err(Error::into_sink_error)
    }

    async fn close(&mut self) -> ledger_core::Result<()> {
        self.close_chunk().map_err(Error::into_sink_error)
    }

    fn sink_type(&self) -> &'static str {
        "tsv"
    }
}

impl std::fmt::Debug for TsvRecordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsvRecordSink")
            .field("run_dir", &self.run_dir)
            .field("chunk_limit_bytes", &self.chunk_limit_bytes)
            .field("open_chunk", &self.chunk.as_ref().map(|c| c.first_block))
            .field("closed_chunks", &self.closed_chunks.len())
            .finish()
    }
}

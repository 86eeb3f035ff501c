//! TSV-backed event source
//!
//! Reads decoded ERC-20 `Transfer` logs, one per row, in canonical chain
//! order:
//!
//! ```text
//! block  tx_index  log_index  timestamp  token  from  to  value
//! ```
//!
//! Consecutive rows with the same block are grouped into one
//! [`BlockEvents`]. Blocks without transfers simply do not appear.

use crate::{Error, Result};
use alloy_primitives::U256;
use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use ledger_core::{Address, BlockEvents, EventSource, ExactValue, OrderingKey, TransferEvent};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Expected input columns, in order
pub const INPUT_COLUMNS: [&str; 8] = [
    "block",
    "tx_index",
    "log_index",
    "timestamp",
    "token",
    "from",
    "to",
    "value",
];

/// Event source over a tab-separated transfer log
pub struct TsvEventSource<R = File> {
    reader: csv::Reader<R>,
    row: StringRecord,
    /// First event of the next block, read ahead while grouping
    pending: Option<TransferEvent>,
}

impl TsvEventSource<File> {
    /// Open a transfer log file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening transfer log {:?}", path);
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> TsvEventSource<R> {
    /// Wrap any reader; the header row is checked immediately
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers()?;
        if headers.iter().ne(INPUT_COLUMNS.iter().copied()) {
            return Err(Error::Parse {
                line: 1,
                message: format!(
                    "expected columns {:?}, found {:?}",
                    INPUT_COLUMNS,
                    headers.iter().collect::<Vec<_>>()
                ),
            });
        }

        Ok(Self {
            reader,
            row: StringRecord::new(),
            pending: None,
        })
    }

    fn read_block(&mut self) -> Result<Option<BlockEvents>> {
        let first = match self.pending.take() {
            Some(event) => event,
            None => match self.read_event()? {
                Some(event) => event,
                None => return Ok(None),
            },
        };

        let height = first.key.block;
        let timestamp = first.timestamp;
        let mut events = vec![first];

        while let Some(event) = self.read_event()? {
            if event.key.block != height {
                self.pending = Some(event);
                break;
            }
            if event.timestamp != timestamp {
                return Err(Error::Parse {
                    line: self.line(),
                    message: format!(
                        "timestamp {} differs from {} earlier in block {}",
                        event.timestamp, timestamp, height
                    ),
                });
            }
            events.push(event);
        }

        Ok(Some(BlockEvents::new(height, timestamp, events)))
    }

    fn read_event(&mut self) -> Result<Option<TransferEvent>> {
        if !self.reader.read_record(&mut self.row)? {
            return Ok(None);
        }

        parse_row(&self.row)
            .map(Some)
            .map_err(|message| Error::Parse {
                line: self.line(),
                message,
            })
    }

    fn line(&self) -> u64 {
        self.row.position().map(|p| p.line()).unwrap_or(0)
    }
}

fn parse_row(row: &StringRecord) -> std::result::Result<TransferEvent, String> {
    let field = |index: usize| {
        row.get(index)
            .ok_or_else(|| format!("missing column {}", INPUT_COLUMNS[index]))
    };
    let number = |index: usize| {
        field(index)?
            .parse::<u64>()
            .map_err(|e| format!("{}: {}", INPUT_COLUMNS[index], e))
    };
    let address = |index: usize| {
        field(index)?
            .parse::<Address>()
            .map_err(|e| format!("{}: {}", INPUT_COLUMNS[index], e))
    };
    let position = |index: usize| {
        u32::try_from(number(index)?).map_err(|e| format!("{}: {}", INPUT_COLUMNS[index], e))
    };

    let raw_value = field(7)?;
    if raw_value.is_empty() || !raw_value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("value: not an unsigned integer: '{}'", raw_value));
    }
    let value = U256::from_str_radix(raw_value, 10)
        .map_err(|e| format!("value: {}", e))
        .and_then(|v| ExactValue::from_unsigned(v).map_err(|e| format!("value: {}", e)))?;

    Ok(TransferEvent {
        key: OrderingKey::new(number(0)?, position(1)?, position(2)?),
        timestamp: number(3)?,
        token: address(4)?,
        from: address(5)?,
        to: address(6)?,
        value,
    })
}

#[async_trait]
impl<R: Read + Send> EventSource for TsvEventSource<R> {
    async fn next_block(&mut self) -> ledger_core::Result<Option<BlockEvents>> {
        // No await point: dropping this future cannot lose a row.
        self.read_block().map_err(Error::into_source_error)
    }
}

impl<R> std::fmt::Debug for TsvEventSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsvEventSource")
            .field("pending", &self.pending.as_ref().map(|e| e.key))
            .finish()
    }
}

//! Core types for the ledger
//!
//! Inputs ([`TransferEvent`], [`BlockEvents`]) are produced by an external
//! event source in canonical chain order. Outputs are the closed set of
//! [`Record`] variants handed to a record sink.

use crate::value::ExactValue;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::Address;

/// Asset identifier (token symbol, e.g. `USDC`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create new asset ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fungible token tracked by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Symbol used as the ledger key and in emitted records
    pub symbol: AssetId,

    /// Token contract emitting the transfer logs
    pub contract: Address,

    /// Decimal scale, used only for presentation-scale conversion
    pub decimals: u8,
}

impl Asset {
    /// Create new asset
    pub fn new(symbol: impl Into<String>, contract: Address, decimals: u8) -> Self {
        Self {
            symbol: AssetId::new(symbol),
            contract,
            decimals,
        }
    }
}

/// Canonical position of a log in the chain: (block, transaction index, log index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    /// Block height
    pub block: u64,
    /// Transaction index within the block
    pub tx_index: u32,
    /// Log index within the block
    pub log_index: u32,
}

impl OrderingKey {
    /// Create new ordering key
    pub fn new(block: u64, tx_index: u32, log_index: u32) -> Self {
        Self {
            block,
            tx_index,
            log_index,
        }
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.block, self.tx_index, self.log_index)
    }
}

/// Decoded token transfer, immutable once produced by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Position in the stream
    pub key: OrderingKey,

    /// Block timestamp (milliseconds since Unix epoch)
    pub timestamp: u64,

    /// Token contract that emitted the log
    pub token: Address,

    /// Sender (the sentinel address for mints)
    pub from: Address,

    /// Receiver (the sentinel address for burns)
    pub to: Address,

    /// Transferred amount in raw units
    pub value: ExactValue,
}

/// All transfer events of one block, in log order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvents {
    /// Block height
    pub height: u64,

    /// Block timestamp (milliseconds since Unix epoch)
    pub timestamp: u64,

    /// Events of this block
    pub events: Vec<TransferEvent>,
}

impl BlockEvents {
    /// Create new block
    pub fn new(height: u64, timestamp: u64, events: Vec<TransferEvent>) -> Self {
        Self {
            height,
            timestamp,
            events,
        }
    }

    /// Height and timestamp used to stamp records emitted for this block
    pub fn stamp(&self) -> BlockStamp {
        BlockStamp {
            height: self.height,
            timestamp: self.timestamp,
        }
    }
}

/// Block height and timestamp stamped onto emitted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStamp {
    /// Block height
    pub height: u64,
    /// Block timestamp (milliseconds since Unix epoch)
    pub timestamp: u64,
}

/// Audit row for every nonzero transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Block height
    pub block: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Asset symbol
    pub asset: AssetId,
    /// Sender
    pub from: Address,
    /// Receiver
    pub to: Address,
    /// Exact raw amount
    pub value: ExactValue,
    /// Presentation-scale amount
    pub value_presentation: f64,
}

/// Balance row, written only when the new balance is significant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Block height
    pub block: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Holder
    pub address: Address,
    /// Asset symbol
    pub asset: AssetId,
    /// Exact raw balance after the update
    pub balance: ExactValue,
    /// Presentation-scale balance
    pub balance_presentation: f64,
}

/// Per-address aggregate, written at cadence boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Block height of the triggering block
    pub block: u64,
    /// Timestamp of the triggering block
    pub timestamp: u64,
    /// Holder
    pub address: Address,
    /// Sum of presentation-scale balances over qualifying assets
    pub total_presentation: f64,
    /// Number of assets whose own balance is significant
    pub qualifying_assets: usize,
}

/// Output row handed to a record sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// Transfer audit row
    Transfer(TransferRecord),
    /// Significant balance row
    Balance(BalanceRecord),
    /// Cadence summary row
    Summary(SummaryRecord),
}

impl Record {
    /// Block height the record is stamped with
    pub fn block(&self) -> u64 {
        match self {
            Record::Transfer(r) => r.block,
            Record::Balance(r) => r.block,
            Record::Summary(r) => r.block,
        }
    }

    /// Short kind label (metrics, logs)
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Transfer(_) => RecordKind::Transfer,
            Record::Balance(_) => RecordKind::Balance,
            Record::Summary(_) => RecordKind::Summary,
        }
    }
}

/// Record variant discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// [`Record::Transfer`]
    Transfer,
    /// [`Record::Balance`]
    Balance,
    /// [`Record::Summary`]
    Summary,
}

impl RecordKind {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Transfer => "transfer",
            RecordKind::Balance => "balance",
            RecordKind::Summary => "summary",
        }
    }
}

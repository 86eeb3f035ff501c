//! Main ledger orchestration layer
//!
//! Ties the store, the updater, the snapshotter and the reclaimer together
//! behind a synchronous API. A [`Ledger`] is explicitly constructed and owned
//! by whoever drives it; there is no process-wide state.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{BlockEvents, Config, Ledger};
//!
//! fn main() -> ledger_core::Result<()> {
//!     let mut ledger = Ledger::new(&Config::default())?;
//!
//!     let block = BlockEvents::new(1_000, 1_700_000_000_000, vec![]);
//!     let mut records = ledger.apply_block(&block)?.records;
//!     records.extend(ledger.snapshot(block.stamp()).records);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    reclaim::{MemoryReclaimer, ReclaimReport},
    registry::AssetRegistry,
    significance::SignificanceFilter,
    snapshot::PeriodicSnapshotter,
    store::LedgerStore,
    types::{Address, AssetId, BlockEvents, BlockStamp, OrderingKey, Record},
    updater::{BalanceUpdater, UpdateOutcome},
    value::ExactValue,
    Config, Error, Result,
};
use tracing::{debug, info, warn};

/// Result of applying one block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockOutcome {
    /// Records in emission order
    pub records: Vec<Record>,
    /// Events that mutated the ledger
    pub applied: usize,
    /// Zero-value events discarded
    pub zero_value: usize,
    /// Events skipped because their token is not registered
    pub unknown_asset: usize,
}

/// Result of a snapshot + reclaim pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotOutcome {
    /// Summary records, in address order
    pub records: Vec<Record>,
    /// Reclaim statistics
    pub reclaim: ReclaimReport,
}

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Exact balances
    store: LedgerStore,

    /// Token contract -> asset
    registry: AssetRegistry,

    updater: BalanceUpdater,
    snapshotter: PeriodicSnapshotter,
    reclaimer: MemoryReclaimer,

    /// Last applied ordering key
    last_key: Option<OrderingKey>,

    /// Height of the last applied block, with or without events
    last_height: Option<u64>,
}

impl Ledger {
    /// Build an empty ledger from configuration
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let filter = SignificanceFilter::new(config.significance_threshold);
        Ok(Self {
            store: LedgerStore::new(config.sentinel_address),
            registry: AssetRegistry::new(config.assets.iter().cloned()),
            updater: BalanceUpdater::new(filter),
            snapshotter: PeriodicSnapshotter::new(filter),
            reclaimer: MemoryReclaimer::new(filter),
            last_key: None,
            last_height: None,
        })
    }

    /// Apply all events of one block in order.
    ///
    /// Events with an unregistered token are skipped with a warning. An event
    /// whose height differs from the block's, or whose ordering key regresses,
    /// fails the whole call; so does a block below the last applied height
    /// (even an empty one) and arithmetic overflow.
    pub fn apply_block(&mut self, block: &BlockEvents) -> Result<BlockOutcome> {
        self.check_height(block.height)?;
        let stamp = block.stamp();
        let mut outcome = BlockOutcome::default();

        for event in &block.events {
            if event.key.block != block.height {
                return Err(Error::InvalidEvent(format!(
                    "event {} delivered in block {}",
                    event.key, block.height
                )));
            }
            self.check_order(event.key)?;

            let asset = match self.registry.resolve(&event.token) {
                Ok(asset) => asset,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping event {}: {}", event.key, e);
                    outcome.unknown_asset += 1;
                    self.last_key = Some(event.key);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self
                .updater
                .apply(&mut self.store, event, asset, stamp, &mut outcome.records)?
            {
                UpdateOutcome::ZeroValue => outcome.zero_value += 1,
                UpdateOutcome::Applied { .. } => outcome.applied += 1,
            }
            self.last_key = Some(event.key);
        }

        self.last_height = Some(block.height);

        debug!(
            "Block {}: {} applied, {} zero-value, {} unknown asset, {} records",
            block.height,
            outcome.applied,
            outcome.zero_value,
            outcome.unknown_asset,
            outcome.records.len()
        );

        Ok(outcome)
    }

    /// Summarise significant holders, then evict insignificant ones
    pub fn snapshot(&mut self, stamp: BlockStamp) -> SnapshotOutcome {
        let records = self
            .snapshotter
            .snapshot(&self.store, &self.registry, stamp)
            .into_iter()
            .map(Record::Summary)
            .collect();

        let reclaim = self.reclaimer.reclaim(&mut self.store, &self.registry);
        info!(
            "Memory cleanup at block {}: removed {} low-balance addresses. Active addresses: {}",
            stamp.height, reclaim.removed, reclaim.remaining
        );

        SnapshotOutcome { records, reclaim }
    }

    /// Exact balance of (address, asset)
    pub fn balance(&self, address: &Address, asset: &AssetId) -> ExactValue {
        self.store.get(address, asset)
    }

    /// Read-only view of the store
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Registered assets
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Number of tracked addresses
    pub fn tracked_addresses(&self) -> usize {
        self.store.size()
    }

    /// Last applied ordering key
    pub fn last_key(&self) -> Option<OrderingKey> {
        self.last_key
    }

    /// Height of the last applied block
    pub fn last_block(&self) -> Option<u64> {
        self.last_height
    }

    fn check_height(&self, height: u64) -> Result<()> {
        match self.last_height {
            Some(previous) if height < previous => Err(Error::OutOfOrder {
                previous: self.last_key.unwrap_or(OrderingKey::new(previous, 0, 0)),
                next: OrderingKey::new(height, 0, 0),
            }),
            _ => Ok(()),
        }
    }

    fn check_order(&self, next: OrderingKey) -> Result<()> {
        match self.last_key {
            Some(previous) if next < previous => Err(Error::OutOfOrder { previous, next }),
            _ => Ok(()),
        }
    }
}

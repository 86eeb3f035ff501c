//! Periodic per-address summaries
//!
//! At each cadence boundary every tracked address is summarised over the
//! assets whose own balance is significant. The store is only read here.

use crate::registry::AssetRegistry;
use crate::significance::SignificanceFilter;
use crate::store::{Holdings, LedgerStore};
use crate::types::{BlockStamp, SummaryRecord};
use tracing::debug;

/// Emits [`SummaryRecord`]s from a point-in-time view of the store
#[derive(Debug, Clone, Copy)]
pub struct PeriodicSnapshotter {
    filter: SignificanceFilter,
}

impl PeriodicSnapshotter {
    /// Create new snapshotter
    pub fn new(filter: SignificanceFilter) -> Self {
        Self { filter }
    }

    /// Summaries for every address whose qualifying aggregate is significant
    pub fn snapshot(
        &self,
        store: &LedgerStore,
        registry: &AssetRegistry,
        stamp: BlockStamp,
    ) -> Vec<SummaryRecord> {
        store
            .accounts()
            .filter_map(|(address, holdings)| {
                let (total, qualifying) = self.qualifying_aggregate(holdings, registry);
                (qualifying > 0 && self.filter.is_significant(total)).then(|| SummaryRecord {
                    block: stamp.height,
                    timestamp: stamp.timestamp,
                    address: *address,
                    total_presentation: total,
                    qualifying_assets: qualifying,
                })
            })
            .collect()
    }

    fn qualifying_aggregate(&self, holdings: &Holdings, registry: &AssetRegistry) -> (f64, usize) {
        let mut total = 0.0;
        let mut qualifying = 0;

        for (asset, balance) in holdings {
            let Some(decimals) = registry.decimals(asset) else {
                debug!("No decimals registered for {}, excluded from summary", asset);
                continue;
            };
            if self.filter.meets_threshold(balance, decimals) {
                total += balance.to_scaled_magnitude(decimals);
                qualifying += 1;
            }
        }

        (total, qualifying)
    }
}

/// Block-height-aligned trigger for snapshot + reclaim.
///
/// A snapshot is due after the first processed block whose height reaches the
/// next multiple of the cadence. With contiguous heights this fires exactly on
/// multiples; with sparse heights a boundary is never skipped, it fires on the
/// first processed block past it. The first boundary is taken from the first
/// observed height, so a run starting mid-chain waits for the next multiple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCadence {
    every: u64,
    next_boundary: Option<u64>,
}

impl SnapshotCadence {
    /// Cadence of `every` blocks (must be positive)
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            next_boundary: None,
        }
    }

    /// Cadence whose first boundary is the first multiple of `every` at or
    /// above `first_height`
    pub fn starting_at(every: u64, first_height: u64) -> Self {
        let mut cadence = Self::new(every);
        cadence.next_boundary = Some(cadence.first_boundary(first_height));
        cadence
    }

    /// Next height at which a snapshot becomes due; `None` until the first
    /// observed height (or `starting_at`) fixes it
    pub fn next_boundary(&self) -> Option<u64> {
        self.next_boundary
    }

    /// Called after block `height` has been fully applied.
    /// Returns true (and advances) if a snapshot is due now.
    pub fn is_due(&mut self, height: u64) -> bool {
        let boundary = match self.next_boundary {
            Some(boundary) => boundary,
            None => self.first_boundary(height),
        };
        if height < boundary {
            self.next_boundary = Some(boundary);
            return false;
        }
        self.next_boundary = Some(self.boundary_after(height));
        true
    }

    fn first_boundary(&self, height: u64) -> u64 {
        if height % self.every == 0 {
            height
        } else {
            self.boundary_after(height)
        }
    }

    fn boundary_after(&self, height: u64) -> u64 {
        (height / self.every)
            .saturating_add(1)
            .saturating_mul(self.every)
    }
}

//! Threshold-based eviction
//!
//! Addresses whose aggregate over all of their assets is below the
//! significance threshold are dropped entirely. This is lossy: a reclaimed
//! address that becomes active again restarts from zero, not from its
//! forgotten balance.

use crate::registry::AssetRegistry;
use crate::significance::SignificanceFilter;
use crate::store::{Holdings, LedgerStore};
use crate::types::Address;

/// Outcome of one reclaim pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReclaimReport {
    /// Addresses removed
    pub removed: usize,
    /// Addresses still tracked
    pub remaining: usize,
}

/// Prunes below-threshold addresses from a [`LedgerStore`]
#[derive(Debug, Clone, Copy)]
pub struct MemoryReclaimer {
    filter: SignificanceFilter,
}

impl MemoryReclaimer {
    /// Create new reclaimer
    pub fn new(filter: SignificanceFilter) -> Self {
        Self { filter }
    }

    /// Remove every address whose total presentation magnitude is below threshold
    pub fn reclaim(&self, store: &mut LedgerStore, registry: &AssetRegistry) -> ReclaimReport {
        let doomed: Vec<Address> = store
            .accounts()
            .filter(|(_, holdings)| !self.filter.is_significant(aggregate(holdings, registry)))
            .map(|(address, _)| *address)
            .collect();

        for address in &doomed {
            store.remove_address(address);
        }

        ReclaimReport {
            removed: doomed.len(),
            remaining: store.size(),
        }
    }
}

/// Sum of presentation magnitudes over all assets (unregistered assets count as zero)
fn aggregate(holdings: &Holdings, registry: &AssetRegistry) -> f64 {
    holdings
        .iter()
        .filter_map(|(asset, balance)| {
            registry
                .decimals(asset)
                .map(|decimals| balance.to_scaled_magnitude(decimals))
        })
        .sum()
}

//! In-memory balance store
//!
//! Maps (address, asset) to an exact balance. Zero balances are never stored:
//! an entry exists only while its balance is nonzero, and an address exists
//! only while it holds at least one entry. Both maps are ordered so iteration
//! (and therefore everything emitted from it) is reproducible.

use crate::types::{Address, AssetId};
use crate::value::ExactValue;
use crate::Result;
use std::collections::BTreeMap;

/// Balances of one address, keyed by asset
pub type Holdings = BTreeMap<AssetId, ExactValue>;

/// Owner of all mutable accounting state
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    accounts: BTreeMap<Address, Holdings>,
    sentinel: Address,
}

impl LedgerStore {
    /// Create an empty store that ignores `sentinel`
    pub fn new(sentinel: Address) -> Self {
        Self {
            accounts: BTreeMap::new(),
            sentinel,
        }
    }

    /// Mint/burn address excluded from tracking
    pub fn sentinel(&self) -> Address {
        self.sentinel
    }

    /// Current balance, zero if absent
    pub fn get(&self, address: &Address, asset: &AssetId) -> ExactValue {
        self.accounts
            .get(address)
            .and_then(|holdings| holdings.get(asset))
            .copied()
            .unwrap_or(ExactValue::ZERO)
    }

    /// Add `delta` to the balance of (`address`, `asset`).
    ///
    /// Returns the new balance, or `None` for the sentinel (never tracked).
    /// A result of exactly zero removes the entry. On overflow the store is
    /// left untouched.
    pub fn apply_delta(
        &mut self,
        address: Address,
        asset: &AssetId,
        delta: ExactValue,
    ) -> Result<Option<ExactValue>> {
        if address == self.sentinel {
            return Ok(None);
        }

        let updated = self.get(&address, asset).checked_add(delta)?;

        if updated.is_zero() {
            if let Some(holdings) = self.accounts.get_mut(&address) {
                holdings.remove(asset);
                if holdings.is_empty() {
                    self.accounts.remove(&address);
                }
            }
        } else {
            self.accounts
                .entry(address)
                .or_default()
                .insert(asset.clone(), updated);
        }

        Ok(Some(updated))
    }

    /// Visit every tracked (address, asset, balance) triple in key order
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Address, &AssetId, &ExactValue),
    {
        for (address, holdings) in &self.accounts {
            for (asset, balance) in holdings {
                visitor(address, asset, balance);
            }
        }
    }

    /// Tracked addresses with their holdings, in address order
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Holdings)> {
        self.accounts.iter()
    }

    /// Holdings of one address
    pub fn holdings(&self, address: &Address) -> Option<&Holdings> {
        self.accounts.get(address)
    }

    /// Number of tracked addresses
    pub fn size(&self) -> usize {
        self.accounts.len()
    }

    /// Number of tracked (address, asset) entries
    pub fn entry_count(&self) -> usize {
        self.accounts.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all tracked balances of one asset
    pub fn total(&self, asset: &AssetId) -> Result<ExactValue> {
        self.accounts
            .values()
            .filter_map(|holdings| holdings.get(asset))
            .try_fold(ExactValue::ZERO, |acc, balance| acc.checked_add(*balance))
    }

    /// Drop every entry of `address`
    pub(crate) fn remove_address(&mut self, address: &Address) -> Option<Holdings> {
        self.accounts.remove(address)
    }
}

//! Asset registry: token contract -> asset metadata

use crate::types::{Address, Asset, AssetId};
use crate::{Error, Result};
use std::collections::HashMap;

/// Resolves token contracts and symbols to registered assets
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    by_contract: HashMap<Address, Asset>,
    decimals: HashMap<AssetId, u8>,
}

impl AssetRegistry {
    /// Build from a list of assets; later duplicates replace earlier ones
    pub fn new(assets: impl IntoIterator<Item = Asset>) -> Self {
        let mut registry = Self::default();
        for asset in assets {
            registry.insert(asset);
        }
        registry
    }

    /// Register an asset
    pub fn insert(&mut self, asset: Asset) {
        self.decimals.insert(asset.symbol.clone(), asset.decimals);
        self.by_contract.insert(asset.contract, asset);
    }

    /// Asset emitted by `contract`
    pub fn resolve(&self, contract: &Address) -> Result<&Asset> {
        self.by_contract
            .get(contract)
            .ok_or(Error::UnknownAsset(*contract))
    }

    /// Decimal scale of a registered asset
    pub fn decimals(&self, asset: &AssetId) -> Option<u8> {
        self.decimals.get(asset).copied()
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.by_contract.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.by_contract.is_empty()
    }
}

//! Configuration for the ledger

use crate::types::{Address, Asset};
use crate::value::MAX_DECIMALS;
use alloy_primitives::address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum presentation-scale magnitude for a row to be written (inclusive)
    pub significance_threshold: f64,

    /// Snapshot and reclaim every N blocks of chain height
    pub snapshot_cadence_blocks: u64,

    /// Mint/burn address, never tracked
    pub sentinel_address: Address,

    /// Tracked assets
    pub assets: Vec<Asset>,

    /// Control mailbox capacity of the ingestion task
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            significance_threshold: 1.0,
            snapshot_cadence_blocks: 1_000,
            sentinel_address: Address::ZERO,
            assets: default_assets(),
            mailbox_capacity: 64,
        }
    }
}

/// Major Ethereum mainnet stablecoins, valued 1:1 against USD
pub fn default_assets() -> Vec<Asset> {
    vec![
        Asset::new("USDC", address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"), 6),
        Asset::new("USDT", address!("dac17f958d2ee523a2206206994597c13d831ec7"), 6),
        Asset::new("DAI", address!("6b175474e89094c44da98b954eedeac495271d0f"), 18),
        Asset::new("BUSD", address!("4fabb145d64652a948d72533023f6e7a623c7c53"), 18),
        Asset::new("FRAX", address!("853d955acef822db058eb8505911ed77f175b99e"), 18),
        Asset::new("TUSD", address!("0000000000085d4780b73119b644ae5ecd22b376"), 18),
        Asset::new("USDP", address!("8e870d67f660d95d5be530380d0ec0bd388289e1"), 6),
        Asset::new("LUSD", address!("5f98805a4e8be255a32880fdec7f6728c6568ba0"), 18),
        Asset::new("GUSD", address!("056fd409e1d7a124bd7017459dfea2f387b6d5cd"), 2),
        Asset::new("alUSD", address!("bc6da0fe9ad5f3b0d5818981f971d5c1b4b4c2b5"), 18),
    ]
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(threshold) = std::env::var("LEDGER_SIGNIFICANCE_THRESHOLD") {
            config.significance_threshold = threshold.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_SIGNIFICANCE_THRESHOLD: {}", e))
            })?;
        }

        if let Ok(cadence) = std::env::var("LEDGER_SNAPSHOT_CADENCE_BLOCKS") {
            config.snapshot_cadence_blocks = cadence.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_SNAPSHOT_CADENCE_BLOCKS: {}", e))
            })?;
        }

        if let Ok(sentinel) = std::env::var("LEDGER_SENTINEL_ADDRESS") {
            config.sentinel_address = sentinel.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_SENTINEL_ADDRESS: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the ledger relies on
    pub fn validate(&self) -> crate::Result<()> {
        if self.snapshot_cadence_blocks == 0 {
            return Err(crate::Error::Config(
                "snapshot_cadence_blocks must be positive".to_string(),
            ));
        }

        if !self.significance_threshold.is_finite() {
            return Err(crate::Error::Config(format!(
                "significance_threshold must be finite, got {}",
                self.significance_threshold
            )));
        }

        if self.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mailbox_capacity must be positive".to_string(),
            ));
        }

        let mut symbols = HashSet::new();
        let mut contracts = HashSet::new();
        for asset in &self.assets {
            if asset.decimals > MAX_DECIMALS {
                return Err(crate::Error::Config(format!(
                    "asset {} has {} decimals (max {})",
                    asset.symbol, asset.decimals, MAX_DECIMALS
                )));
            }
            if !symbols.insert(asset.symbol.clone()) {
                return Err(crate::Error::Config(format!(
                    "duplicate asset symbol {}",
                    asset.symbol
                )));
            }
            if !contracts.insert(asset.contract) {
                return Err(crate::Error::Config(format!(
                    "duplicate asset contract {:#x}",
                    asset.contract
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.significance_threshold, 1.0);
        assert_eq!(config.snapshot_cadence_blocks, 1_000);
        assert_eq!(config.sentinel_address, Address::ZERO);
        assert_eq!(config.assets.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let config = Config {
            snapshot_cadence_blocks: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_scale() {
        let mut config = Config::default();
        config.assets.push(Asset::new("USDC", Address::repeat_byte(0x01), 6));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.assets = vec![Asset::new("HUGE", Address::repeat_byte(0x02), 77)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            significance_threshold = 5.0
            snapshot_cadence_blocks = 100

            [[assets]]
            symbol = "X"
            contract = "0x1111111111111111111111111111111111111111"
            decimals = 18
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.significance_threshold, 5.0);
        assert_eq!(config.snapshot_cadence_blocks, 100);
        assert_eq!(config.sentinel_address, Address::ZERO);
        assert_eq!(config.assets.len(), 1);
        assert_eq!(config.assets[0].decimals, 18);
        assert!(config.validate().is_ok());
    }
}

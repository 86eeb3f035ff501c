//! Double-entry application of a single transfer
//!
//! Per nonzero transfer: one [`TransferRecord`], then the sender side, then
//! the receiver side. Each non-sentinel side mutates the store exactly once
//! and emits a [`BalanceRecord`] only if its new balance is significant.

use crate::significance::SignificanceFilter;
use crate::store::LedgerStore;
use crate::types::{
    Address, Asset, AssetId, BalanceRecord, BlockStamp, Record, TransferEvent, TransferRecord,
};
use crate::value::ExactValue;
use crate::Result;

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Zero-value transfer, discarded without output
    ZeroValue,
    /// Applied; number of store mutations (0 to 2)
    Applied {
        /// Non-sentinel sides that mutated the store
        mutations: u8,
    },
}

/// Applies transfer events to a [`LedgerStore`]
#[derive(Debug, Clone, Copy)]
pub struct BalanceUpdater {
    filter: SignificanceFilter,
}

impl BalanceUpdater {
    /// Create new updater
    pub fn new(filter: SignificanceFilter) -> Self {
        Self { filter }
    }

    /// Apply one event, appending emitted records to `out` in emission order.
    ///
    /// An error (overflow) is fatal. Both sides are checked before either is
    /// applied, so on error neither the store nor `out` has changed.
    pub fn apply(
        &self,
        store: &mut LedgerStore,
        event: &TransferEvent,
        asset: &Asset,
        stamp: BlockStamp,
        out: &mut Vec<Record>,
    ) -> Result<UpdateOutcome> {
        if event.value.is_zero() {
            return Ok(UpdateOutcome::ZeroValue);
        }

        let debit = event.value.checked_neg()?;
        Self::check_sides(store, event, &asset.symbol, debit)?;

        out.push(Record::Transfer(TransferRecord {
            block: stamp.height,
            timestamp: stamp.timestamp,
            asset: asset.symbol.clone(),
            from: event.from,
            to: event.to,
            value: event.value,
            value_presentation: event.value.to_scaled_magnitude(asset.decimals),
        }));

        let mut mutations = 0;

        if self.apply_side(store, event.from, asset, debit, stamp, out)? {
            mutations += 1;
        }
        if self.apply_side(store, event.to, asset, event.value, stamp, out)? {
            mutations += 1;
        }

        Ok(UpdateOutcome::Applied { mutations })
    }

    fn check_sides(
        store: &LedgerStore,
        event: &TransferEvent,
        asset: &AssetId,
        debit: ExactValue,
    ) -> Result<()> {
        let sentinel = store.sentinel();

        let sender_after = if event.from != sentinel {
            Some(store.get(&event.from, asset).checked_add(debit)?)
        } else {
            None
        };

        if event.to != sentinel {
            let before = match sender_after {
                Some(balance) if event.to == event.from => balance,
                _ => store.get(&event.to, asset),
            };
            before.checked_add(event.value)?;
        }

        Ok(())
    }

    fn apply_side(
        &self,
        store: &mut LedgerStore,
        address: Address,
        asset: &Asset,
        delta: ExactValue,
        stamp: BlockStamp,
        out: &mut Vec<Record>,
    ) -> Result<bool> {
        let Some(balance) = store.apply_delta(address, &asset.symbol, delta)? else {
            return Ok(false);
        };

        if self.filter.meets_threshold(&balance, asset.decimals) {
            out.push(Record::Balance(BalanceRecord {
                block: stamp.height,
                timestamp: stamp.timestamp,
                address,
                asset: asset.symbol.clone(),
                balance,
                balance_presentation: balance.to_scaled_magnitude(asset.decimals),
            }));
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderingKey;
    use alloy_primitives::I256;

    const SENTINEL: Address = Address::ZERO;

    fn asset() -> Asset {
        Asset::new("X", Address::repeat_byte(0xee), 6)
    }

    fn stamp() -> BlockStamp {
        BlockStamp {
            height: 7,
            timestamp: 1_700_000_000_000,
        }
    }

    fn transfer(from: Address, to: Address, value: i64) -> TransferEvent {
        TransferEvent {
            key: OrderingKey::new(7, 0, 0),
            timestamp: 1_700_000_000_000,
            token: asset().contract,
            from,
            to,
            value: ExactValue::from(value),
        }
    }

    fn updater() -> BalanceUpdater {
        BalanceUpdater::new(SignificanceFilter::new(1.0))
    }

    #[test]
    fn test_zero_value_is_discarded() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);
        let outcome = updater()
            .apply(&mut store, &transfer(a, a, 0), &asset(), stamp(), &mut out)
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::ZeroValue);
        assert!(out.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_mint_emits_transfer_and_receiver_balance() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);

        let outcome = updater()
            .apply(&mut store, &transfer(SENTINEL, a, 2_000_000), &asset(), stamp(), &mut out)
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Applied { mutations: 1 });
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Record::Transfer(_)));
        match &out[1] {
            Record::Balance(b) => {
                assert_eq!(b.address, a);
                assert_eq!(b.balance, ExactValue::from(2_000_000i64));
                assert_eq!(b.balance_presentation, 2.0);
                assert_eq!(b.block, 7);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_sender_then_receiver_order() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        store.apply_delta(a, &AssetId::new("X"), ExactValue::from(5_000_000i64)).unwrap();

        updater()
            .apply(&mut store, &transfer(a, b, 2_000_000), &asset(), stamp(), &mut out)
            .unwrap();

        let addresses: Vec<Address> = out
            .iter()
            .filter_map(|r| match r {
                Record::Balance(b) => Some(b.address),
                _ => None,
            })
            .collect();
        assert_eq!(addresses, vec![a, b]);
    }

    #[test]
    fn test_below_threshold_side_is_not_emitted() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        store.apply_delta(a, &AssetId::new("X"), ExactValue::from(2_000_000i64)).unwrap();

        updater()
            .apply(&mut store, &transfer(a, b, 1_500_000), &asset(), stamp(), &mut out)
            .unwrap();

        assert_eq!(out.len(), 2);
        match &out[1] {
            Record::Balance(rec) => assert_eq!(rec.address, b),
            other => panic!("unexpected record {:?}", other),
        }
        assert_eq!(store.get(&a, &AssetId::new("X")), ExactValue::from(500_000i64));
    }

    #[test]
    fn test_sentinel_to_sentinel_touches_nothing() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();

        let outcome = updater()
            .apply(&mut store, &transfer(SENTINEL, SENTINEL, 10), &asset(), stamp(), &mut out)
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Applied { mutations: 0 });
        assert_eq!(out.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_self_transfer_leaves_no_phantom_entry() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);

        let outcome = updater()
            .apply(&mut store, &transfer(a, a, 3_000_000), &asset(), stamp(), &mut out)
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Applied { mutations: 2 });
        assert!(store.is_empty());
    }

    #[test]
    fn test_receiver_overflow_leaves_sender_untouched() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let x = AssetId::new("X");
        let max = ExactValue::from_raw(I256::MAX);
        store.apply_delta(a, &x, ExactValue::from(5i64)).unwrap();
        store.apply_delta(b, &x, max).unwrap();

        let err = updater()
            .apply(&mut store, &transfer(a, b, 1), &asset(), stamp(), &mut out)
            .unwrap_err();

        assert!(matches!(err, crate::Error::Overflow(_)));
        assert!(out.is_empty());
        assert_eq!(store.get(&a, &x), ExactValue::from(5i64));
        assert_eq!(store.get(&b, &x), max);
    }

    #[test]
    fn test_self_transfer_at_max_is_not_an_overflow() {
        let mut store = LedgerStore::new(SENTINEL);
        let mut out = Vec::new();
        let a = Address::repeat_byte(1);
        let x = AssetId::new("X");
        let max = ExactValue::from_raw(I256::MAX);
        store.apply_delta(a, &x, max).unwrap();

        updater()
            .apply(&mut store, &transfer(a, a, 1), &asset(), stamp(), &mut out)
            .unwrap();
        assert_eq!(store.get(&a, &x), max);
    }
}

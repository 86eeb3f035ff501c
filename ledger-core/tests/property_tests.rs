//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Conservation: tracked totals equal mints minus burns
//! - No zero entries: every stored balance is nonzero
//! - Inclusive threshold: a balance exactly at threshold is written
//! - Reclaim: every surviving address is significant in aggregate
//! - Deterministic replay: same blocks → same records, sync or async
//! - Ordering: a regressing key is always rejected

use ledger_core::{
    memory::{MemorySink, MemorySource},
    Address, Asset, AssetId, BlockEvents, BlockStamp, Config, Error, ExactValue, IngestionLoop,
    Ledger, Metrics, OrderingKey, Record, TransferEvent,
};
use proptest::prelude::*;
use std::collections::HashMap;

const SENTINEL: Address = Address::ZERO;

fn whole_token() -> Address {
    Address::repeat_byte(0x0a)
}

fn micro_token() -> Address {
    Address::repeat_byte(0x0b)
}

fn test_config(cadence: u64) -> Config {
    Config {
        significance_threshold: 1.0,
        snapshot_cadence_blocks: cadence,
        assets: vec![
            Asset::new("WHOLE", whole_token(), 0),
            Asset::new("MICRO", micro_token(), 6),
        ],
        ..Config::default()
    }
}

/// Index 0 is the sentinel
fn party(index: usize) -> Address {
    if index == 0 {
        SENTINEL
    } else {
        Address::repeat_byte(index as u8 * 0x11)
    }
}

/// (from, to, micro asset?, raw value)
type RawTransfer = (usize, usize, bool, i64);

fn transfer_strategy() -> impl Strategy<Value = RawTransfer> {
    (0usize..5, 0usize..5, any::<bool>(), 0i64..5_000_000)
}

/// Blocks at contiguous heights starting from 1, up to four events each
fn blocks_strategy() -> impl Strategy<Value = Vec<Vec<RawTransfer>>> {
    prop::collection::vec(prop::collection::vec(transfer_strategy(), 0..4), 1..30)
}

fn build_blocks(raw: &[Vec<RawTransfer>]) -> Vec<BlockEvents> {
    raw.iter()
        .enumerate()
        .map(|(i, transfers)| {
            let height = i as u64 + 1;
            let events = transfers
                .iter()
                .enumerate()
                .map(|(log_index, &(from, to, micro, value))| TransferEvent {
                    key: OrderingKey::new(height, 0, log_index as u32),
                    timestamp: height * 12_000,
                    token: if micro { micro_token() } else { whole_token() },
                    from: party(from),
                    to: party(to),
                    value: ExactValue::from(value),
                })
                .collect();
            BlockEvents::new(height, height * 12_000, events)
        })
        .collect()
}

fn asset_of(micro: bool) -> AssetId {
    AssetId::new(if micro { "MICRO" } else { "WHOLE" })
}

/// Replays blocks synchronously, snapshotting on every multiple of `cadence`
fn replay(blocks: &[BlockEvents], cadence: u64) -> (Ledger, Vec<Record>) {
    let mut ledger = Ledger::new(&test_config(cadence)).unwrap();
    let mut records = Vec::new();
    for block in blocks {
        records.extend(ledger.apply_block(block).unwrap().records);
        if block.height % cadence == 0 {
            records.extend(ledger.snapshot(block.stamp()).records);
        }
    }
    (ledger, records)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Σ tracked balances == Σ mints − Σ burns, per asset
    #[test]
    fn prop_conservation(raw in blocks_strategy()) {
        let blocks = build_blocks(&raw);
        let mut ledger = Ledger::new(&test_config(u64::MAX)).unwrap();
        for block in &blocks {
            ledger.apply_block(block).unwrap();
        }

        let mut expected: HashMap<AssetId, i64> = HashMap::new();
        for &(from, to, micro, value) in raw.iter().flatten() {
            let net = match (from == 0, to == 0) {
                (true, false) => value,
                (false, true) => -value,
                _ => 0,
            };
            *expected.entry(asset_of(micro)).or_default() += net;
        }

        for micro in [false, true] {
            let asset = asset_of(micro);
            let want = expected.get(&asset).copied().unwrap_or(0);
            prop_assert_eq!(ledger.store().total(&asset).unwrap(), ExactValue::from(want));
        }
    }

    /// Property: the store never holds a zero balance, and never the sentinel
    #[test]
    fn prop_no_zero_entries(raw in blocks_strategy()) {
        let blocks = build_blocks(&raw);
        let (ledger, _) = replay(&blocks, 7);

        let mut violations = Vec::new();
        ledger.store().for_each(|address, asset, balance| {
            if balance.is_zero() || *address == SENTINEL {
                violations.push((*address, asset.clone()));
            }
        });
        prop_assert!(violations.is_empty(), "bad entries: {:?}", violations);
    }

    /// Property: a balance exactly at threshold is written, one unit below is not
    #[test]
    fn prop_threshold_is_inclusive(threshold in 1i64..1_000) {
        let mut config = test_config(u64::MAX);
        config.significance_threshold = threshold as f64;
        let mut ledger = Ledger::new(&config).unwrap();

        let at = Address::repeat_byte(0x01);
        let below = Address::repeat_byte(0x02);
        let mint = |log_index, to, value| TransferEvent {
            key: OrderingKey::new(1, 0, log_index),
            timestamp: 0,
            token: whole_token(),
            from: SENTINEL,
            to,
            value: ExactValue::from(value),
        };
        let outcome = ledger
            .apply_block(&BlockEvents::new(1, 0, vec![mint(0, at, threshold), mint(1, below, threshold - 1)]))
            .unwrap();

        let balance_rows: Vec<Address> = outcome
            .records
            .iter()
            .filter_map(|r| match r {
                Record::Balance(b) => Some(b.address),
                _ => None,
            })
            .collect();
        prop_assert_eq!(balance_rows, vec![at]);
    }

    /// Property: after a snapshot every tracked address is significant in aggregate
    #[test]
    fn prop_reclaim_leaves_only_significant(raw in blocks_strategy()) {
        let blocks = build_blocks(&raw);
        let mut ledger = Ledger::new(&test_config(u64::MAX)).unwrap();
        for block in &blocks {
            ledger.apply_block(block).unwrap();
        }
        let last = blocks.last().map(BlockEvents::stamp).unwrap_or(BlockStamp { height: 0, timestamp: 0 });
        let outcome = ledger.snapshot(last);

        for (_, holdings) in ledger.store().accounts() {
            let aggregate: f64 = holdings
                .iter()
                .map(|(asset, balance)| {
                    let decimals = if asset.as_str() == "MICRO" { 6 } else { 0 };
                    balance.to_scaled_magnitude(decimals)
                })
                .sum();
            prop_assert!(aggregate >= 1.0);
        }
        prop_assert_eq!(outcome.reclaim.remaining, ledger.tracked_addresses());
    }

    /// Property: replaying the same blocks yields the same records
    #[test]
    fn prop_deterministic_replay(raw in blocks_strategy()) {
        let blocks = build_blocks(&raw);
        let (first_ledger, first) = replay(&blocks, 5);
        let (second_ledger, second) = replay(&blocks, 5);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first_ledger.tracked_addresses(), second_ledger.tracked_addresses());
    }

    /// Property: the async loop emits exactly what a synchronous replay emits
    #[test]
    fn prop_loop_matches_sync_replay(raw in blocks_strategy()) {
        let blocks = build_blocks(&raw);
        let (_, expected) = replay(&blocks, 5);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let emitted = rt.block_on(async {
            let sink = MemorySink::new();
            let mut ingestion = IngestionLoop::new(
                &test_config(5),
                Box::new(MemorySource::new(blocks.clone())),
                Box::new(sink.clone()),
                Metrics::new().unwrap(),
            )
            .unwrap();
            ingestion.run_to_end().await.unwrap();
            sink.records()
        });

        prop_assert_eq!(emitted, expected);
    }

    /// Property: a key lower than the last applied one is rejected
    #[test]
    fn prop_regressing_key_rejected(
        first in (1u64..100, 0u32..10, 0u32..10),
        second in (1u64..100, 0u32..10, 0u32..10),
    ) {
        let a = OrderingKey::new(first.0, first.1, first.2);
        let b = OrderingKey::new(second.0, second.1, second.2);
        prop_assume!(b < a);

        let mut ledger = Ledger::new(&test_config(u64::MAX)).unwrap();
        let event = |key: OrderingKey| TransferEvent {
            key,
            timestamp: 0,
            token: whole_token(),
            from: SENTINEL,
            to: Address::repeat_byte(0x01),
            value: ExactValue::from(1i64),
        };

        ledger.apply_block(&BlockEvents::new(a.block, 0, vec![event(a)])).unwrap();
        let err = ledger.apply_block(&BlockEvents::new(b.block, 0, vec![event(b)])).unwrap_err();
        let is_out_of_order = matches!(err, Error::OutOfOrder { .. });
        prop_assert!(is_out_of_order);
    }
}

#[test]
fn test_emission_order_follows_event_order() {
    let a = party(1);
    let b = party(2);
    let mint_a = (0, 1, false, 5);
    let a_to_b = (1, 2, false, 3);

    let forward = replay(&build_blocks(&[vec![mint_a, a_to_b]]), u64::MAX).1;
    let balances: Vec<(Address, ExactValue)> = forward
        .iter()
        .filter_map(|r| match r {
            Record::Balance(rec) => Some((rec.address, rec.balance)),
            _ => None,
        })
        .collect();

    assert_eq!(
        balances,
        vec![
            (a, ExactValue::from(5i64)),
            (a, ExactValue::from(2i64)),
            (b, ExactValue::from(3i64)),
        ]
    );

    // Same events, opposite order: A goes negative first and is never written
    let reversed = replay(&build_blocks(&[vec![a_to_b, mint_a]]), u64::MAX).1;
    assert_ne!(forward, reversed);
    let a_rows = reversed
        .iter()
        .filter(|r| matches!(r, Record::Balance(rec) if rec.address == a))
        .count();
    assert_eq!(a_rows, 1);
}

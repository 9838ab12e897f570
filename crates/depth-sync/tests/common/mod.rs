//! Common test utilities and fixtures for integration tests
//!
//! Contains sample JSON messages in the shape Binance and Coinbase Pro emit

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use depth_sync::{BookRegistry, SyncConfig};
use depth_types::{BookSnapshot, BookUpdate, CurrencyPair, InstrumentKey, LevelChange, PriceLevel};
use rust_decimal_macros::dec;

/// Binance REST depth snapshot for BTCUSDT
pub const BINANCE_SNAPSHOT: &str = r#"{
    "lastUpdateId": 1000,
    "bids": [
        ["43250.10", "0.500"],
        ["43250.00", "1.250"],
        ["43249.50", "2.000"]
    ],
    "asks": [
        ["43250.20", "0.750"],
        ["43251.00", "1.000"],
        ["43252.40", "3.100"]
    ]
}"#;

/// Diff already covered by the snapshot
pub const BINANCE_DIFF_COVERED: &str = r#"{
    "stream": "btcusdt@depth",
    "data": {
        "e": "depthUpdate",
        "E": 1700000000000,
        "s": "BTCUSDT",
        "U": 990,
        "u": 999,
        "b": [["43240.00", "9.000"]],
        "a": []
    }
}"#;

/// Diff straddling the snapshot ID
pub const BINANCE_DIFF_FIRST: &str = r#"{
    "stream": "btcusdt@depth",
    "data": {
        "e": "depthUpdate",
        "E": 1700000000100,
        "s": "BTCUSDT",
        "U": 1000,
        "u": 1003,
        "b": [["43250.10", "0.000"], ["43250.05", "0.300"]],
        "a": [["43250.20", "0.600"]]
    }
}"#;

/// Next diff in sequence
pub const BINANCE_DIFF_SECOND: &str = r#"{
    "stream": "btcusdt@depth",
    "data": {
        "e": "depthUpdate",
        "E": 1700000000200,
        "s": "BTCUSDT",
        "U": 1004,
        "u": 1006,
        "b": [],
        "a": [["43250.15", "0.100"], ["43252.40", "0"]]
    }
}"#;

/// Trade event on the same combined stream
pub const BINANCE_TRADE: &str = r#"{
    "stream": "btcusdt@trade",
    "data": {
        "e": "trade",
        "E": 1700000000150,
        "s": "BTCUSDT",
        "t": 12345,
        "p": "43250.10",
        "q": "0.010"
    }
}"#;

/// Coinbase Pro level2 snapshot for ETH-USD
pub const COINBASE_SNAPSHOT: &str = r#"{
    "type": "snapshot",
    "product_id": "ETH-USD",
    "bids": [["2250.10", "4.5"], ["2250.00", "10"]],
    "asks": [["2250.30", "3.2"], ["2251.00", "8"]]
}"#;

/// Coinbase Pro level2 diff
pub const COINBASE_L2UPDATE: &str = r#"{
    "type": "l2update",
    "product_id": "ETH-USD",
    "time": "2023-11-14T22:13:20.500000Z",
    "changes": [
        ["buy", "2250.20", "1.5"],
        ["sell", "2250.30", "0"]
    ]
}"#;

/// Coinbase Pro subscription acknowledgement
pub const COINBASE_SUBSCRIPTIONS: &str = r#"{
    "type": "subscriptions",
    "channels": [{"name": "level2", "product_ids": ["ETH-USD"]}]
}"#;

pub fn btc_usdt() -> InstrumentKey {
    InstrumentKey::spot("binance", CurrencyPair::new("BTC", "USDT"))
}

pub fn eth_usd() -> InstrumentKey {
    InstrumentKey::spot("coinbasepro", CurrencyPair::new("ETH", "USD"))
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Registry with invariant checks on
pub fn strict_registry() -> BookRegistry {
    BookRegistry::new(SyncConfig::default().with_invariant_checks(true)).unwrap()
}

/// Two-level snapshot: bids (100,1),(99,2); asks (101,1),(102,2)
pub fn simple_snapshot(id: u64) -> BookSnapshot {
    BookSnapshot::new(
        vec![
            PriceLevel::new(dec!(100), dec!(1)),
            PriceLevel::new(dec!(99), dec!(2)),
        ],
        vec![
            PriceLevel::new(dec!(101), dec!(1)),
            PriceLevel::new(dec!(102), dec!(2)),
        ],
        id,
        ts(0),
    )
}

pub fn update(id: u64, changes: Vec<LevelChange>) -> BookUpdate {
    BookUpdate::new(id, changes, ts(id as i64))
}

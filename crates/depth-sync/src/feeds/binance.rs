//! Binance spot depth decoding
//!
//! Binance publishes the initial book over REST (`/api/v3/depth`) and
//! incremental diffs on the `<symbol>@depth` stream. The snapshot's
//! `lastUpdateId` and each diff's final update ID `u` share one sequence.

use super::{to_levels, FeedDecoder, FeedError, RawLevel};
use depth_types::{
    BookMessage, BookSnapshot, BookUpdate, CurrencyPair, DateTime, InstrumentKey, LevelChange,
    PriceLevel, Side, Utc, Venue,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// REST depth snapshot body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepthSnapshot {
    last_update_id: u64,
    bids: Vec<RawLevel>,
    asks: Vec<RawLevel>,
}

/// `depthUpdate` stream event
#[derive(Debug, Deserialize)]
struct DepthUpdate {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "u")]
    final_update_id: u64,
    #[serde(rename = "b")]
    bids: Vec<RawLevel>,
    #[serde(rename = "a")]
    asks: Vec<RawLevel>,
}

/// Decoder for Binance depth snapshots and diff streams
#[derive(Debug, Clone)]
pub struct BinanceDepthFeed {
    venue: Venue,
    symbols: HashMap<String, InstrumentKey>,
    drain_buffer: bool,
}

impl Default for BinanceDepthFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceDepthFeed {
    /// Create a decoder with no registered symbols
    pub fn new() -> Self {
        Self {
            venue: Venue::new(Venue::BINANCE),
            symbols: HashMap::new(),
            drain_buffer: true,
        }
    }

    /// Map a venue symbol (e.g. `BTCUSDT`) to an instrument
    pub fn with_symbol(mut self, symbol: impl AsRef<str>, key: InstrumentKey) -> Self {
        self.symbols.insert(symbol.as_ref().to_uppercase(), key);
        self
    }

    /// Register a spot pair under its concatenated venue symbol
    pub fn with_pair(self, pair: CurrencyPair) -> Self {
        let symbol = pair.format_with("");
        let key = InstrumentKey::spot(Venue::BINANCE, pair);
        self.with_symbol(symbol, key)
    }

    /// Replay or discard diffs buffered before the snapshot
    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain_buffer = drain;
        self
    }

    /// Instrument registered for a venue symbol
    pub fn resolve(&self, symbol: &str) -> Result<&InstrumentKey, FeedError> {
        self.symbols
            .get(&symbol.to_uppercase())
            .ok_or_else(|| FeedError::UnknownSymbol {
                venue: self.venue.clone(),
                symbol: symbol.to_string(),
            })
    }

    /// Decode a REST depth snapshot for `symbol`
    pub fn decode_snapshot(
        &self,
        symbol: &str,
        body: &str,
        received_at: DateTime<Utc>,
    ) -> Result<BookMessage, FeedError> {
        let key = self.resolve(symbol)?.clone();
        let depth: DepthSnapshot = serde_json::from_str(body)?;

        Ok(BookMessage::Snapshot {
            key,
            snapshot: BookSnapshot::new(
                to_levels(depth.bids),
                to_levels(depth.asks),
                depth.last_update_id,
                received_at,
            ),
            buffer_enabled: self.drain_buffer,
        })
    }

    /// Decode a stream frame, bare or wrapped in a combined-stream envelope
    ///
    /// Returns `None` for events other than `depthUpdate`.
    pub fn decode_event(&self, raw: &str) -> Result<Option<BookMessage>, FeedError> {
        let mut value: Value = serde_json::from_str(raw)?;

        let inner = value.get_mut("data").map(Value::take);
        if let Some(inner) = inner {
            value = inner;
        }

        if value.get("e").and_then(Value::as_str) != Some("depthUpdate") {
            return Ok(None);
        }

        let event: DepthUpdate = serde_json::from_value(value)?;
        let key = self.resolve(&event.symbol)?.clone();
        let timestamp = DateTime::from_timestamp_millis(event.event_time).ok_or_else(|| {
            FeedError::InvalidTimestamp {
                value: event.event_time.to_string(),
            }
        })?;

        let changes = changes(Side::Buy, to_levels(event.bids))
            .chain(changes(Side::Sell, to_levels(event.asks)))
            .collect();

        Ok(Some(BookMessage::Update {
            key,
            update: BookUpdate::new(event.final_update_id, changes, timestamp),
        }))
    }
}

fn changes(side: Side, levels: Vec<PriceLevel>) -> impl Iterator<Item = LevelChange> {
    levels
        .into_iter()
        .map(move |level| LevelChange::new(side, level.price, level.size))
}

impl FeedDecoder for BinanceDepthFeed {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    fn decode(&self, raw: &str, _received_at: DateTime<Utc>) -> Result<Vec<BookMessage>, FeedError> {
        Ok(self.decode_event(raw)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn feed() -> BinanceDepthFeed {
        BinanceDepthFeed::new().with_pair(CurrencyPair::new("BNB", "BTC"))
    }

    #[test]
    fn test_decode_snapshot() {
        let body = r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"]]}"#;

        let msg = feed().decode_snapshot("bnbbtc", body, Utc::now()).unwrap();
        match msg {
            BookMessage::Snapshot {
                key,
                snapshot,
                buffer_enabled,
            } => {
                assert_eq!(key.to_string(), "binance:BNB/BTC:spot");
                assert_eq!(snapshot.snapshot_id, 1027024);
                assert_eq!(snapshot.bids, vec![PriceLevel::new(dec!(4), dec!(431))]);
                assert_eq!(snapshot.asks[0].price, dec!(4.000002));
                assert!(buffer_enabled);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_combined_stream_update() {
        let raw = r#"{"stream":"bnbbtc@depth","data":{"e":"depthUpdate","E":1700000000123,"s":"BNBBTC","U":157,"u":160,"b":[["0.0024","10"]],"a":[["0.0026","100"],["0.0027","0"]]}}"#;

        let msg = feed().decode_event(raw).unwrap().unwrap();
        match msg {
            BookMessage::Update { update, .. } => {
                assert_eq!(update.update_id, 160);
                assert_eq!(update.timestamp.timestamp_millis(), 1_700_000_000_123);
                assert_eq!(update.changes.len(), 3);
                assert_eq!(update.changes[0], LevelChange::bid(dec!(0.0024), dec!(10)));
                assert_eq!(update.changes[2], LevelChange::ask(dec!(0.0027), dec!(0)));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_other_events_ignored() {
        let raw = r#"{"e":"trade","E":1700000000000,"s":"BNBBTC","t":12345}"#;
        assert!(feed().decode_event(raw).unwrap().is_none());
        assert!(feed().decode(raw, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_symbol() {
        let raw = r#"{"e":"depthUpdate","E":1700000000000,"s":"ETHBTC","U":1,"u":2,"b":[],"a":[]}"#;
        assert!(matches!(
            feed().decode_event(raw),
            Err(FeedError::UnknownSymbol { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            feed().decode_event("{not json"),
            Err(FeedError::Json(_))
        ));
    }
}

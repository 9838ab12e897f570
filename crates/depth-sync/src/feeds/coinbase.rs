//! Coinbase Pro level2 channel decoding
//!
//! The channel opens with a `snapshot` per product followed by `l2update`
//! diffs. Diffs carry no per-product sequence, so their event time in
//! microseconds serves as the update ID and the snapshot uses ID 0. Each
//! snapshot therefore starts a fresh book and is preceded by an invalidate.
//! Diffs stamped with the same time are bumped one microsecond past the
//! previous ID for their product so they still apply in arrival order.

use super::{to_levels, FeedDecoder, FeedError, RawLevel};
use dashmap::DashMap;
use depth_types::{
    deserialize_decimal, BookMessage, BookSnapshot, BookUpdate, CurrencyPair, DateTime,
    InstrumentKey, LevelChange, Side, Utc, Venue,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Level2Message {
    #[serde(rename = "snapshot")]
    Snapshot {
        product_id: String,
        bids: Vec<RawLevel>,
        asks: Vec<RawLevel>,
    },
    #[serde(rename = "l2update")]
    Update {
        product_id: String,
        time: String,
        changes: Vec<RawChange>,
    },
    #[serde(other)]
    Other,
}

/// `[side, price, size]`
#[derive(Debug, Deserialize)]
struct RawChange(
    Side,
    #[serde(deserialize_with = "deserialize_decimal")] Decimal,
    #[serde(deserialize_with = "deserialize_decimal")] Decimal,
);

/// Decoder for the Coinbase Pro `level2` channel
#[derive(Debug, Clone)]
pub struct CoinbaseLevel2Feed {
    venue: Venue,
    last_ids: DashMap<InstrumentKey, u64>,
}

impl Default for CoinbaseLevel2Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseLevel2Feed {
    /// Create a decoder for the `coinbasepro` venue
    pub fn new() -> Self {
        Self {
            venue: Venue::new(Venue::COINBASE_PRO),
            last_ids: DashMap::new(),
        }
    }

    /// Instrument for a product ID such as `BTC-USD`
    pub fn resolve(&self, product_id: &str) -> Result<InstrumentKey, FeedError> {
        let pair: CurrencyPair = product_id.parse()?;
        Ok(InstrumentKey::spot(self.venue.clone(), pair))
    }

    fn update_id(&self, time: &str) -> Result<(u64, DateTime<Utc>), FeedError> {
        let invalid = || FeedError::InvalidTimestamp {
            value: time.to_string(),
        };
        let timestamp = DateTime::parse_from_rfc3339(time)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        let micros = u64::try_from(timestamp.timestamp_micros()).map_err(|_| invalid())?;
        Ok((micros, timestamp))
    }

    /// Next update ID for `key`, strictly above the last one issued
    fn next_id(&self, key: &InstrumentKey, micros: u64) -> u64 {
        let mut last = self.last_ids.entry(key.clone()).or_insert(0);
        let id = micros.max(last.saturating_add(1));
        *last = id;
        id
    }
}

impl FeedDecoder for CoinbaseLevel2Feed {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    fn decode(&self, raw: &str, received_at: DateTime<Utc>) -> Result<Vec<BookMessage>, FeedError> {
        let message: Level2Message = serde_json::from_str(raw)?;
        match message {
            Level2Message::Snapshot {
                product_id,
                bids,
                asks,
            } => {
                let key = self.resolve(&product_id)?;
                self.last_ids.remove(&key);
                Ok(vec![
                    BookMessage::Invalidate { key: key.clone() },
                    BookMessage::Snapshot {
                        key,
                        snapshot: BookSnapshot::new(
                            to_levels(bids),
                            to_levels(asks),
                            0,
                            received_at,
                        ),
                        buffer_enabled: false,
                    },
                ])
            }
            Level2Message::Update {
                product_id,
                time,
                changes,
            } => {
                if changes.is_empty() {
                    return Err(FeedError::EmptyUpdate {
                        venue: self.venue.clone(),
                        symbol: product_id,
                    });
                }

                let key = self.resolve(&product_id)?;
                let (micros, timestamp) = self.update_id(&time)?;
                let update_id = self.next_id(&key, micros);
                let changes = changes
                    .into_iter()
                    .map(|RawChange(side, price, size)| LevelChange::new(side, price, size))
                    .collect();

                Ok(vec![BookMessage::Update {
                    key,
                    update: BookUpdate::new(update_id, changes, timestamp),
                }])
            }
            Level2Message::Other => Ok(Vec::new()),
        }
    }
}

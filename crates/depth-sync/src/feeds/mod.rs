//! Venue depth feed decoders
//!
//! Decoders turn raw venue JSON into [`BookMessage`]s. All string-to-number
//! parsing happens here, so the engine only ever sees typed values.

mod binance;
mod coinbase;

pub use binance::BinanceDepthFeed;
pub use coinbase::CoinbaseLevel2Feed;

use depth_types::{deserialize_decimal, BookMessage, DateTime, PairParseError, PriceLevel, Utc, Venue};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Decoding failure for one raw message
#[derive(Error, Debug)]
pub enum FeedError {
    /// Payload is not the expected JSON shape
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Venue symbol has no registered instrument
    #[error("symbol {symbol} is not registered for {venue}")]
    UnknownSymbol { venue: Venue, symbol: String },

    /// Product identifier is not a currency pair
    #[error("invalid product id: {0}")]
    Pair(#[from] PairParseError),

    /// Timestamp cannot be parsed or represented
    #[error("invalid timestamp {value}")]
    InvalidTimestamp { value: String },

    /// Update without any level changes
    #[error("{venue} update for {symbol} carries no changes")]
    EmptyUpdate { venue: Venue, symbol: String },
}

/// Decodes one venue's raw book messages
pub trait FeedDecoder: Send + Sync {
    /// Venue this decoder handles
    fn venue(&self) -> &Venue;

    /// Decode one raw frame into zero or more book messages
    ///
    /// Frames for other channels decode to an empty list. `received_at`
    /// stamps messages whose payload carries no time of its own.
    fn decode(&self, raw: &str, received_at: DateTime<Utc>) -> Result<Vec<BookMessage>, FeedError>;
}

/// `[price, size]` pair with string or numeric values
#[derive(Debug, Deserialize)]
pub(crate) struct RawLevel(
    #[serde(deserialize_with = "deserialize_decimal")] Decimal,
    #[serde(deserialize_with = "deserialize_decimal")] Decimal,
);

impl From<RawLevel> for PriceLevel {
    fn from(raw: RawLevel) -> Self {
        PriceLevel::new(raw.0, raw.1)
    }
}

pub(crate) fn to_levels(raw: Vec<RawLevel>) -> Vec<PriceLevel> {
    raw.into_iter().map(PriceLevel::from).collect()
}

//! Currency pairs and instrument keys

use crate::{AssetType, Venue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delimiters accepted when parsing a pair
const PAIR_DELIMITERS: [char; 3] = ['/', '-', '_'];

/// Base/quote currency pair, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Create a pair from its base and quote currency codes
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().to_ascii_uppercase(),
            quote: quote.as_ref().to_ascii_uppercase(),
        }
    }

    /// Base currency (e.g., "BTC" in BTC/USD)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote currency (e.g., "USD" in BTC/USD)
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Format with a venue-specific delimiter (empty for "BTCUSDT" style)
    pub fn format_with(&self, delimiter: &str) -> String {
        format!("{}{}{}", self.base, delimiter, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(idx) = s.find(PAIR_DELIMITERS) else {
            return Err(PairParseError::MissingDelimiter(s.to_string()));
        };

        let (base, rest) = s.split_at(idx);
        let quote = &rest[1..];

        if quote.contains(PAIR_DELIMITERS) {
            return Err(PairParseError::InvalidFormat(s.to_string()));
        }

        if base.is_empty() || quote.is_empty() {
            return Err(PairParseError::EmptyPart(s.to_string()));
        }

        Ok(Self::new(base, quote))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Error parsing a currency pair
#[derive(Debug, Clone, thiserror::Error)]
pub enum PairParseError {
    #[error("pair must contain one of '/', '-', '_': {0}")]
    MissingDelimiter(String),

    #[error("invalid pair format: {0}")]
    InvalidFormat(String),

    #[error("pair has empty base or quote: {0}")]
    EmptyPart(String),
}

/// Identity of one order book: venue, pair and market segment
///
/// Value equality; used as the registry map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    /// Venue the book lives on
    pub venue: Venue,
    /// Traded pair
    pub pair: CurrencyPair,
    /// Market segment
    pub asset: AssetType,
}

impl InstrumentKey {
    /// Create a new instrument key
    pub fn new(venue: impl Into<Venue>, pair: CurrencyPair, asset: AssetType) -> Self {
        Self {
            venue: venue.into(),
            pair,
            asset,
        }
    }

    /// Spot instrument on a venue
    pub fn spot(venue: impl Into<Venue>, pair: CurrencyPair) -> Self {
        Self::new(venue, pair, AssetType::Spot)
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.venue, self.pair, self.asset)
    }
}

//! Side, AssetType and Venue

use serde::{Deserialize, Serialize};
use std::fmt;

/// Book side a level or change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Bid side
    #[serde(alias = "bid")]
    Buy,
    /// Ask side
    #[serde(alias = "ask", alias = "offer")]
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns the side name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market segment an instrument trades in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AssetType {
    /// Spot market
    #[default]
    Spot,
    /// Margin market
    Margin,
    /// Dated futures
    Futures,
    /// Perpetual swaps
    PerpetualSwap,
}

impl AssetType {
    /// Returns the asset type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Futures => "futures",
            Self::PerpetualSwap => "perpetual_swap",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading venue name (lowercase, e.g. "binance")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Venue(String);

impl Venue {
    /// Binance
    pub const BINANCE: &'static str = "binance";
    /// Coinbase Pro
    pub const COINBASE_PRO: &'static str = "coinbasepro";
    /// BTSE
    pub const BTSE: &'static str = "btse";
    /// EXMO
    pub const EXMO: &'static str = "exmo";

    /// Create a venue name; stored lowercase so lookups are case-insensitive
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_ascii_lowercase())
    }

    /// Get the venue name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Venue {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

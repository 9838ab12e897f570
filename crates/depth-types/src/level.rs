//! Price level types with decimal precision

use crate::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A single (price, size) entry on one side of a book
///
/// While resident in a book, `size` is strictly positive; a size of zero in a
/// change means "remove this level".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price of this level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
    /// Aggregate size resting at this price
    #[serde(deserialize_with = "deserialize_decimal")]
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Check if this level has zero size (means removal)
    pub fn is_zero(&self) -> bool {
        self.size.is_zero()
    }

    /// Why this level cannot rest in a book, if it cannot
    pub fn defect(&self) -> Option<LevelDefect> {
        if self.price <= Decimal::ZERO {
            Some(LevelDefect::NonPositivePrice)
        } else if self.size.is_sign_negative() && !self.size.is_zero() {
            Some(LevelDefect::NegativeSize)
        } else {
            None
        }
    }
}

/// One incremental change to a book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    /// Side the change applies to
    pub side: Side,
    /// Price of the affected level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
    /// New aggregate size (zero removes the level)
    #[serde(deserialize_with = "deserialize_decimal")]
    pub size: Decimal,
}

impl LevelChange {
    /// Create a new change
    pub fn new(side: Side, price: Decimal, size: Decimal) -> Self {
        Self { side, price, size }
    }

    /// Bid-side change
    pub fn bid(price: Decimal, size: Decimal) -> Self {
        Self::new(Side::Buy, price, size)
    }

    /// Ask-side change
    pub fn ask(price: Decimal, size: Decimal) -> Self {
        Self::new(Side::Sell, price, size)
    }

    /// The level this change writes
    pub fn level(&self) -> PriceLevel {
        PriceLevel::new(self.price, self.size)
    }
}

/// Business-rule violation found on a single level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelDefect {
    /// Price is zero or negative
    NonPositivePrice,
    /// Size is negative
    NegativeSize,
    /// Price already present earlier in the same snapshot side
    DuplicatePrice,
}

impl std::fmt::Display for LevelDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositivePrice => f.write_str("non-positive price"),
            Self::NegativeSize => f.write_str("negative size"),
            Self::DuplicatePrice => f.write_str("duplicate price"),
        }
    }
}

/// A level that was skipped, with the reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLevel {
    /// Side the level was submitted on
    pub side: Side,
    /// The offending level
    pub level: PriceLevel,
    /// What was wrong with it
    pub defect: LevelDefect,
}

/// Deserialize a decimal from either a JSON string or a JSON number
///
/// Venues disagree on whether prices are quoted; parsing the number's textual
/// form keeps every digit that `f64` would lose.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use rust_decimal::prelude::FromPrimitive;
    use serde::de::Error;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => {
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map_err(D::Error::custom)
        }
        StringOrNumber::Number(n) => {
            let s = n.to_string();
            // Scientific notation (e.g. 5e-6) goes through f64
            if s.contains('e') || s.contains('E') {
                let f = n.as_f64().ok_or_else(|| D::Error::custom("invalid number"))?;
                Decimal::from_f64(f).ok_or_else(|| D::Error::custom("cannot convert to decimal"))
            } else {
                Decimal::from_str(&s).map_err(D::Error::custom)
            }
        }
    }
}

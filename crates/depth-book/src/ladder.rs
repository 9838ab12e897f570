//! Sorted price ladder for one side of a book
//!
//! Levels live in a contiguous `Vec` kept in side order (bids high to low,
//! asks low to high). Lookups are O(log N) binary searches; inserts and
//! removals shift the tail, which is cheap at typical venue depths.

use depth_types::{LevelDefect, PriceLevel, RejectedLevel, Side};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Effect of writing one level into a ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEdit {
    /// New price level added
    Inserted,
    /// Existing level's size replaced
    Updated,
    /// Existing level removed (size zero)
    Removed,
    /// Zero size for an absent price, nothing to do
    Unchanged,
}

/// Ordering defect found by [`Ladder::verify`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LadderViolation {
    #[error("{side} levels out of order at index {index}: {previous} then {current}")]
    Unsorted {
        side: Side,
        index: usize,
        previous: Decimal,
        current: Decimal,
    },

    #[error("{side} ladder holds duplicate price {price} at index {index}")]
    DuplicatePrice {
        side: Side,
        index: usize,
        price: Decimal,
    },

    #[error("{side} ladder holds non-positive size {size} at price {price}")]
    NonPositiveSize {
        side: Side,
        price: Decimal,
        size: Decimal,
    },
}

/// One side of an order book
#[derive(Debug, Clone)]
pub struct Ladder {
    side: Side,
    levels: Vec<PriceLevel>,
}

impl Ladder {
    #[cfg(test)]
    pub(crate) fn from_raw(side: Side, levels: Vec<PriceLevel>) -> Self {
        Self { side, levels }
    }

    /// Create an empty ladder for a side
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: Vec::new(),
        }
    }

    /// Empty bid ladder (descending)
    pub fn bids() -> Self {
        Self::new(Side::Buy)
    }

    /// Empty ask ladder (ascending)
    pub fn asks() -> Self {
        Self::new(Side::Sell)
    }

    /// Side this ladder holds
    pub fn side(&self) -> Side {
        self.side
    }

    /// Order of `a` relative to `b` in this ladder
    fn order(&self, a: &Decimal, b: &Decimal) -> Ordering {
        match self.side {
            Side::Buy => b.cmp(a),
            Side::Sell => a.cmp(b),
        }
    }

    /// Index of `price`, or where it would be inserted
    fn search(&self, price: &Decimal) -> Result<usize, usize> {
        self.levels
            .binary_search_by(|level| self.order(&level.price, price))
    }

    /// Insert, overwrite or (size zero) remove the level at `price`
    pub fn apply(&mut self, price: Decimal, size: Decimal) -> LevelEdit {
        match (self.search(&price), size.is_zero()) {
            (Ok(idx), true) => {
                self.levels.remove(idx);
                LevelEdit::Removed
            }
            (Err(_), true) => LevelEdit::Unchanged,
            (Ok(idx), false) => {
                self.levels[idx].size = size;
                LevelEdit::Updated
            }
            (Err(idx), false) => {
                self.levels.insert(idx, PriceLevel::new(price, size));
                LevelEdit::Inserted
            }
        }
    }

    /// Look up the level at `price`
    pub fn get(&self, price: &Decimal) -> Option<&PriceLevel> {
        self.search(price).ok().map(|idx| &self.levels[idx])
    }

    /// Replace the whole ladder from unsorted input
    ///
    /// Zero-size levels are dropped silently. Malformed levels and repeats of
    /// a price already seen earlier in `levels` are skipped and returned.
    pub fn load(&mut self, levels: &[PriceLevel]) -> Vec<RejectedLevel> {
        let mut rejected = Vec::new();
        self.levels.clear();
        self.levels.reserve(levels.len());

        for level in levels {
            if let Some(defect) = level.defect() {
                rejected.push(RejectedLevel {
                    side: self.side,
                    level: *level,
                    defect,
                });
            } else if !level.is_zero() {
                self.levels.push(*level);
            }
        }

        // Stable sort keeps the first occurrence of a price ahead of repeats
        let side = self.side;
        self.levels.sort_by(|a, b| match side {
            Side::Buy => b.price.cmp(&a.price),
            Side::Sell => a.price.cmp(&b.price),
        });

        let mut kept: Vec<PriceLevel> = Vec::with_capacity(self.levels.len());
        for level in self.levels.drain(..) {
            match kept.last() {
                Some(last) if last.price == level.price => rejected.push(RejectedLevel {
                    side,
                    level,
                    defect: LevelDefect::DuplicatePrice,
                }),
                _ => kept.push(level),
            }
        }
        self.levels = kept;

        rejected
    }

    /// Best level (highest bid / lowest ask)
    pub fn best(&self) -> Option<&PriceLevel> {
        self.levels.first()
    }

    /// Best price
    pub fn best_price(&self) -> Option<Decimal> {
        self.best().map(|l| l.price)
    }

    /// All levels, best first
    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// Iterator over levels, best first
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.iter()
    }

    /// Copy of every level
    pub fn to_vec(&self) -> Vec<PriceLevel> {
        self.levels.clone()
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the ladder is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Clear all levels
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Keep only the best `max_depth` levels
    pub fn truncate(&mut self, max_depth: usize) {
        self.levels.truncate(max_depth);
    }

    /// Check strict ordering, uniqueness and positive sizes
    pub fn verify(&self) -> Result<(), LadderViolation> {
        for (index, pair) in self.levels.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            match self.order(&previous.price, &current.price) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(LadderViolation::DuplicatePrice {
                        side: self.side,
                        index: index + 1,
                        price: current.price,
                    })
                }
                Ordering::Greater => {
                    return Err(LadderViolation::Unsorted {
                        side: self.side,
                        index: index + 1,
                        previous: previous.price,
                        current: current.price,
                    })
                }
            }
        }

        if let Some(level) = self.levels.iter().find(|l| l.size <= Decimal::ZERO) {
            return Err(LadderViolation::NonPositiveSize {
                side: self.side,
                price: level.price,
                size: level.size,
            });
        }

        Ok(())
    }
}

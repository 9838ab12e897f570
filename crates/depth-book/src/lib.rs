//! Order book synchronization engine for a single instrument
//!
//! Turns an exchange's snapshot-plus-incremental depth feed into a
//! consistent local book. The crate is synchronous and lock-free by itself:
//! the registry in `depth-sync` owns the per-book locks.
//!
//! # Constraints
//!
//! - NO `tokio`
//! - NO logging (outcomes are returned for the caller to log)
//! - NO networking code
//!
//! # Example
//!
//! ```
//! use depth_book::{OrderBook, SyncState};
//! use depth_types::{CurrencyPair, InstrumentKey};
//!
//! let book = OrderBook::new(InstrumentKey::spot("binance", CurrencyPair::new("BTC", "USDT")));
//! assert_eq!(book.state(), SyncState::AwaitingSnapshot);
//! ```

pub mod book;
pub mod ladder;
pub mod pending;

pub use book::{
    BookSettings, BookStats, BookView, InvariantViolation, OrderBook, SnapshotOutcome, SyncState,
    UpdateOutcome,
};
pub use ladder::{Ladder, LadderViolation, LevelEdit};
pub use pending::{DrainedUpdates, PendingBuffer, DEFAULT_PENDING_CAPACITY};

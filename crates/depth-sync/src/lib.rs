//! Concurrent order book synchronization for multi-venue market data
//!
//! This crate wires single-instrument [`depth_book::OrderBook`]s into a
//! shared registry that venue connections feed and readers query.
//!
//! # Features
//!
//! - Per-instrument locking: contention on one book never stalls another
//! - Pre-snapshot buffering with resync detection
//! - Coalescing, non-blocking change notifications as a `Stream`
//! - Binance and Coinbase Pro depth decoders producing [`BookMessage`]s
//!
//! # Example
//!
//! ```
//! use depth_sync::{BookRegistry, SyncConfig};
//! use depth_types::{BookSnapshot, CurrencyPair, InstrumentKey, PriceLevel, Utc};
//! use rust_decimal::Decimal;
//!
//! let registry = BookRegistry::new(SyncConfig::default()).unwrap();
//! let key = InstrumentKey::spot("binance", CurrencyPair::new("BTC", "USDT"));
//!
//! let snapshot = BookSnapshot::new(
//!     vec![PriceLevel::new(Decimal::from(100), Decimal::ONE)],
//!     vec![PriceLevel::new(Decimal::from(101), Decimal::ONE)],
//!     10,
//!     Utc::now(),
//! );
//! registry.load_snapshot(&key, &snapshot, true).unwrap();
//!
//! let book = registry.get_book(&key).unwrap();
//! assert_eq!(book.last_update_id, 10);
//! ```

pub mod config;
pub mod events;
pub mod feeds;
pub mod notifier;
pub mod registry;

pub use config::{ConfigError, SyncConfig};
pub use events::{BookChange, ChangeKind};
pub use feeds::{BinanceDepthFeed, CoinbaseLevel2Feed, FeedDecoder, FeedError};
pub use notifier::{ChangeNotifier, Subscription};
pub use registry::{BookHandle, BookRegistry};

// Re-export engine types for convenience
pub use depth_book::{BookStats, BookView, SnapshotOutcome, SyncState, UpdateOutcome};
pub use depth_types::{BookError, BookMessage, BookSnapshot, BookUpdate, InstrumentKey};

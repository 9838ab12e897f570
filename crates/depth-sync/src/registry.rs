//! Concurrent registry of per-instrument order books
//!
//! The map itself is only locked long enough to fetch or create a book's
//! handle. Each book then carries its own lock, so ingestion on one
//! instrument never waits on another. Change notifications are published
//! after the book lock is released.

use crate::config::{ConfigError, SyncConfig};
use crate::events::{BookChange, ChangeKind};
use crate::notifier::{ChangeNotifier, Subscription};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use depth_book::{BookStats, BookView, OrderBook, SnapshotOutcome, SyncState, UpdateOutcome};
use depth_types::{BookError, BookMessage, BookSnapshot, BookUpdate, InstrumentKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Shared handle to one instrument's book
pub type BookHandle = Arc<RwLock<OrderBook>>;

/// Map from instrument to synchronized order book
///
/// Construct one explicitly and share it by reference (or `Arc`) with every
/// feed task and reader.
#[derive(Debug)]
pub struct BookRegistry {
    books: DashMap<InstrumentKey, BookHandle>,
    config: SyncConfig,
    notifier: ChangeNotifier,
}

impl BookRegistry {
    /// Create a registry with the given configuration
    pub fn new(config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            books: DashMap::new(),
            notifier: ChangeNotifier::new(config.subscriber_capacity),
            config,
        })
    }

    /// Create a registry with default configuration
    pub fn with_defaults() -> Self {
        let config = SyncConfig::default();
        Self {
            books: DashMap::new(),
            notifier: ChangeNotifier::new(config.subscriber_capacity),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch a book, creating an empty one on first use
    pub fn get_or_create(&self, key: &InstrumentKey) -> BookHandle {
        if let Some(book) = self.books.get(key) {
            return Arc::clone(book.value());
        }

        let entry = self.books.entry(key.clone()).or_insert_with(|| {
            debug!(instrument = %key, "Creating order book");
            Arc::new(RwLock::new(OrderBook::with_settings(
                key.clone(),
                self.config.book_settings(),
            )))
        });
        Arc::clone(entry.value())
    }

    /// Fetch a book without creating it
    pub fn get(&self, key: &InstrumentKey) -> Option<BookHandle> {
        self.books.get(key).map(|book| Arc::clone(book.value()))
    }

    /// Reset a book to its pre-snapshot state
    ///
    /// Returns `false` if the instrument has no book.
    pub fn invalidate(&self, key: &InstrumentKey) -> bool {
        let Some(book) = self.get(key) else {
            return false;
        };

        book.write().reset();
        debug!(instrument = %key, "Order book invalidated");

        self.notifier.notify(BookChange::new(
            key.clone(),
            Utc::now(),
            true,
            ChangeKind::Invalidated,
        ));
        true
    }

    /// Replace a book's depth with a snapshot
    ///
    /// Malformed levels are dropped and reported as
    /// [`BookError::InvalidLevel`] after the rest of the snapshot is applied.
    #[instrument(
        level = "debug",
        skip(self, key, snapshot),
        fields(instrument = %key, snapshot_id = snapshot.snapshot_id)
    )]
    pub fn load_snapshot(
        &self,
        key: &InstrumentKey,
        snapshot: &BookSnapshot,
        buffer_enabled: bool,
    ) -> Result<SnapshotOutcome, BookError> {
        let book = self.get_or_create(key);
        let result = book.write().load_snapshot(snapshot, buffer_enabled);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err @ BookError::StaleSnapshot { .. }) => {
                debug!(error = %err, "Ignoring stale snapshot");
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, "Snapshot rejected");
                return Err(err);
            }
        };

        debug!(
            replayed = outcome.replayed,
            discarded = outcome.discarded,
            "Snapshot loaded"
        );
        if !outcome.replay_rejected.is_empty() {
            warn!(
                count = outcome.replay_rejected.len(),
                "Skipped invalid levels while replaying buffered updates"
            );
        }

        self.notifier.notify(BookChange::new(
            key.clone(),
            snapshot.timestamp,
            outcome.top_of_book_changed,
            ChangeKind::Snapshot,
        ));

        if outcome.rejected.is_empty() {
            Ok(outcome)
        } else {
            for rejected in &outcome.rejected {
                warn!(
                    side = %rejected.side,
                    price = %rejected.level.price,
                    size = %rejected.level.size,
                    defect = %rejected.defect,
                    "Dropped invalid snapshot level"
                );
            }
            Err(BookError::InvalidLevel {
                key: key.clone(),
                rejected: outcome.rejected,
            })
        }
    }

    /// Apply an incremental update
    ///
    /// Before a snapshot the update is buffered (when buffering is enabled)
    /// and `Ok(UpdateOutcome::Buffered)` is returned.
    pub fn update(
        &self,
        key: &InstrumentKey,
        update: &BookUpdate,
    ) -> Result<UpdateOutcome, BookError> {
        // Only buffered updates may materialize a book
        let book = if self.config.buffer_enabled {
            self.get_or_create(key)
        } else {
            self.get(key).ok_or_else(|| BookError::NoSnapshot { key: key.clone() })?
        };

        let result = book.write().apply_update(update);

        match result {
            Ok(UpdateOutcome::Applied {
                top_of_book_changed,
                rejected,
            }) => {
                for level in &rejected {
                    warn!(
                        instrument = %key,
                        update_id = update.update_id,
                        side = %level.side,
                        price = %level.level.price,
                        size = %level.level.size,
                        defect = %level.defect,
                        "Skipped invalid level"
                    );
                }

                self.notifier.notify(BookChange::new(
                    key.clone(),
                    update.timestamp,
                    top_of_book_changed,
                    ChangeKind::Update,
                ));

                Ok(UpdateOutcome::Applied {
                    top_of_book_changed,
                    rejected,
                })
            }
            Ok(outcome @ UpdateOutcome::Buffered { .. }) => {
                debug!(
                    instrument = %key,
                    update_id = update.update_id,
                    "Buffered update awaiting snapshot"
                );
                Ok(outcome)
            }
            Err(err) => {
                match &err {
                    BookError::OutOfOrder { last_update_id, .. } => warn!(
                        instrument = %key,
                        update_id = update.update_id,
                        last_update_id,
                        "Out-of-order update, resync required"
                    ),
                    BookError::BufferOverflow { capacity, .. } => warn!(
                        instrument = %key,
                        update_id = update.update_id,
                        capacity,
                        "Pending buffer overflow, resync required"
                    ),
                    other => debug!(instrument = %key, error = %other, "Update rejected"),
                }
                Err(err)
            }
        }
    }

    /// Point-in-time copy of a book
    pub fn get_book(&self, key: &InstrumentKey) -> Result<BookView, BookError> {
        self.get(key)
            .map(|book| book.read().view())
            .ok_or_else(|| BookError::UnknownInstrument { key: key.clone() })
    }

    /// Route a decoded feed message to the matching operation
    pub fn apply(&self, message: &BookMessage) -> Result<(), BookError> {
        match message {
            BookMessage::Snapshot {
                key,
                snapshot,
                buffer_enabled,
            } => self.load_snapshot(key, snapshot, *buffer_enabled).map(|_| ()),
            BookMessage::Update { key, update } => self.update(key, update).map(|_| ()),
            BookMessage::Invalidate { key } => {
                self.invalidate(key);
                Ok(())
            }
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Change notifier shared by all books
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// End all subscriptions
    pub fn close(&self) {
        self.notifier.close();
    }

    /// Instruments with a book
    pub fn keys(&self) -> Vec<InstrumentKey> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of books
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Check if no book exists
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Synchronization state of a book
    pub fn state(&self, key: &InstrumentKey) -> Option<SyncState> {
        self.get(key).map(|book| book.read().state())
    }

    /// Counters for a book
    pub fn stats(&self, key: &InstrumentKey) -> Option<BookStats> {
        self.get(key).map(|book| book.read().stats())
    }

    /// Books whose last change is older than `max_age` at `now`
    ///
    /// Books still waiting for their first snapshot have no timestamp and
    /// are not reported.
    pub fn stale_instruments(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<InstrumentKey> {
        let handles: Vec<(InstrumentKey, BookHandle)> = self
            .books
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        handles
            .into_iter()
            .filter(|(_, book)| {
                book.read()
                    .last_update_time()
                    .is_some_and(|at| now - at > max_age)
            })
            .map(|(key, _)| key)
            .collect()
    }
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

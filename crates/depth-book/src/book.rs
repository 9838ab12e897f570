//! Order book state machine
//!
//! Owns one instrument's ladders, sequencing metadata and pending buffer.
//! Every mutation goes through [`OrderBook::load_snapshot`],
//! [`OrderBook::apply_update`] or [`OrderBook::reset`]; callers provide the
//! mutual exclusion.
//!
//! # State Machine
//!
//! ```text
//! AwaitingSnapshot ──snapshot──▶ Synced
//!        │                          │
//!   buffer overflow             reset()
//!        ▼                          │
//! ResyncRequired ──covering snapshot──▶ Synced
//! ```

use crate::{
    ladder::{Ladder, LadderViolation},
    pending::{PendingBuffer, DEFAULT_PENDING_CAPACITY},
};
use chrono::{DateTime, Utc};
use depth_types::{
    BookError, BookSnapshot, BookUpdate, InstrumentKey, LevelChange, PriceLevel, RejectedLevel,
    Side,
};
use serde::{Deserialize, Serialize};

/// Book synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncState {
    /// No snapshot yet; updates are buffered or refused
    #[default]
    AwaitingSnapshot,
    /// Snapshot loaded, applying updates
    Synced,
    /// Buffered history was lost; only a snapshot covering it can recover
    ResyncRequired,
}

/// Per-book behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSettings {
    /// Buffer updates that arrive before the snapshot
    pub buffer_enabled: bool,
    /// Pending buffer bound
    pub buffer_capacity: usize,
    /// Optional per-side depth cap
    pub max_depth: Option<usize>,
    /// Run the consistency check after every mutation
    pub verify_invariants: bool,
}

impl Default for BookSettings {
    fn default() -> Self {
        Self {
            buffer_enabled: true,
            buffer_capacity: DEFAULT_PENDING_CAPACITY,
            max_depth: None,
            verify_invariants: cfg!(debug_assertions),
        }
    }
}

/// Running counters for one book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStats {
    /// Snapshots loaded
    pub snapshots: u64,
    /// Updates applied (live and replayed)
    pub updates_applied: u64,
    /// Updates placed in the pending buffer
    pub updates_buffered: u64,
    /// Updates refused (out of order, no snapshot)
    pub updates_rejected: u64,
    /// Individual levels skipped as malformed
    pub levels_rejected: u64,
    /// Pending buffer evictions
    pub overflows: u64,
    /// Resets
    pub invalidations: u64,
}

/// Result of a successful snapshot load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotOutcome {
    /// Snapshot levels skipped as malformed or duplicate
    pub rejected: Vec<RejectedLevel>,
    /// Buffered updates applied after the snapshot
    pub replayed: usize,
    /// Buffered updates dropped as already covered
    pub discarded: usize,
    /// Levels skipped while replaying buffered updates
    pub replay_rejected: Vec<RejectedLevel>,
    /// Best bid or best ask differs from before the load
    pub top_of_book_changed: bool,
}

/// Result of a successful update call
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Changes applied to the ladders
    Applied {
        /// Best bid or best ask moved
        top_of_book_changed: bool,
        /// Levels skipped as malformed
        rejected: Vec<RejectedLevel>,
    },
    /// No snapshot yet; update queued for replay
    Buffered {
        /// Entries now pending
        pending: usize,
    },
}

impl UpdateOutcome {
    /// Check if the ladders were mutated
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Consistency failure, always a programming defect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order book {key} corrupted: {violation}")]
pub struct InvariantViolation {
    /// Book that failed
    pub key: InstrumentKey,
    /// What was wrong
    #[source]
    pub violation: LadderViolation,
}

type TopOfBook = (Option<PriceLevel>, Option<PriceLevel>);

/// One instrument's synchronized depth
#[derive(Debug, Clone)]
pub struct OrderBook {
    key: InstrumentKey,
    bids: Ladder,
    asks: Ladder,
    last_update_id: u64,
    last_update_time: Option<DateTime<Utc>>,
    state: SyncState,
    pending: PendingBuffer,
    settings: BookSettings,
    stats: BookStats,
}

impl OrderBook {
    /// Create an empty book with default settings
    pub fn new(key: InstrumentKey) -> Self {
        Self::with_settings(key, BookSettings::default())
    }

    /// Create an empty book with specific settings
    pub fn with_settings(key: InstrumentKey, settings: BookSettings) -> Self {
        Self {
            key,
            bids: Ladder::bids(),
            asks: Ladder::asks(),
            last_update_id: 0,
            last_update_time: None,
            state: SyncState::AwaitingSnapshot,
            pending: PendingBuffer::new(settings.buffer_capacity),
            settings,
            stats: BookStats::default(),
        }
    }

    /// Instrument this book tracks
    pub fn key(&self) -> &InstrumentKey {
        &self.key
    }

    /// Current synchronization state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Check if a snapshot is loaded
    pub fn has_snapshot(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// Sequence token of the latest applied snapshot or update
    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    /// Timestamp of the latest applied snapshot or update
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    /// Behaviour knobs
    pub fn settings(&self) -> &BookSettings {
        &self.settings
    }

    /// Running counters
    pub fn stats(&self) -> BookStats {
        self.stats
    }

    /// Number of updates waiting for a snapshot
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Bid ladder (descending)
    pub fn bids(&self) -> &Ladder {
        &self.bids
    }

    /// Ask ladder (ascending)
    pub fn asks(&self) -> &Ladder {
        &self.asks
    }

    /// Best bid
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.best()
    }

    /// Best ask
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.best()
    }

    fn top(&self) -> TopOfBook {
        (self.bids.best().copied(), self.asks.best().copied())
    }

    fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Replace the book's depth with a snapshot
    ///
    /// With `drain_buffer`, updates buffered before the snapshot are replayed
    /// in update-ID order, skipping those the snapshot already covers.
    /// Without it, the buffer is discarded.
    pub fn load_snapshot(
        &mut self,
        snapshot: &BookSnapshot,
        drain_buffer: bool,
    ) -> Result<SnapshotOutcome, BookError> {
        if self.state == SyncState::Synced && snapshot.snapshot_id < self.last_update_id {
            return Err(BookError::StaleSnapshot {
                key: self.key.clone(),
                snapshot_id: snapshot.snapshot_id,
                last_update_id: self.last_update_id,
            });
        }

        if drain_buffer {
            if let Some(evicted_through) = self.pending.evicted_through() {
                if !self.pending.covers(snapshot.snapshot_id) {
                    return Err(BookError::BufferOverflow {
                        key: self.key.clone(),
                        capacity: self.pending.capacity(),
                        evicted_through,
                    });
                }
            }
        }

        let before = self.top();

        let mut outcome = SnapshotOutcome {
            rejected: self.bids.load(&snapshot.bids),
            ..Default::default()
        };
        outcome.rejected.extend(self.asks.load(&snapshot.asks));
        self.enforce_depth();

        self.last_update_id = snapshot.snapshot_id;
        self.last_update_time = Some(snapshot.timestamp);
        self.state = SyncState::Synced;
        self.stats.snapshots += 1;
        self.stats.levels_rejected += outcome.rejected.len() as u64;

        if drain_buffer {
            let drained = self.pending.drain_after(snapshot.snapshot_id);
            outcome.discarded = drained.discarded;

            for update in &drained.updates {
                // Later duplicates of an ID already applied
                if update.update_id <= self.last_update_id {
                    outcome.discarded += 1;
                    continue;
                }
                let rejected = self.write_changes(&update.changes);
                self.stats.levels_rejected += rejected.len() as u64;
                outcome.replay_rejected.extend(rejected);
                self.enforce_depth();
                self.last_update_id = update.update_id;
                self.last_update_time = Some(update.timestamp);
                self.stats.updates_applied += 1;
                outcome.replayed += 1;
            }
        } else {
            outcome.discarded = self.pending.clear();
        }

        self.check();

        outcome.top_of_book_changed = self.top() != before;
        Ok(outcome)
    }

    /// Apply one batch of level changes
    ///
    /// Sequence violations are detected before any change is written, so a
    /// rejected update leaves the book untouched. Malformed levels are
    /// skipped and reported while the rest of the batch applies.
    pub fn apply_update(&mut self, update: &BookUpdate) -> Result<UpdateOutcome, BookError> {
        if self.state != SyncState::Synced {
            return self.buffer(update);
        }

        if update.update_id <= self.last_update_id {
            self.stats.updates_rejected += 1;
            return Err(BookError::OutOfOrder {
                key: self.key.clone(),
                update_id: update.update_id,
                last_update_id: self.last_update_id,
            });
        }

        let before = self.top();
        let rejected = self.write_changes(&update.changes);

        self.last_update_id = update.update_id;
        self.last_update_time = Some(update.timestamp);
        self.stats.updates_applied += 1;
        self.stats.levels_rejected += rejected.len() as u64;

        self.enforce_depth();
        self.check();

        Ok(UpdateOutcome::Applied {
            top_of_book_changed: self.top() != before,
            rejected,
        })
    }

    fn buffer(&mut self, update: &BookUpdate) -> Result<UpdateOutcome, BookError> {
        if !self.settings.buffer_enabled {
            self.stats.updates_rejected += 1;
            return Err(BookError::NoSnapshot {
                key: self.key.clone(),
            });
        }

        self.stats.updates_buffered += 1;
        if self.pending.push(update.clone()).is_some() {
            self.stats.overflows += 1;
            self.state = SyncState::ResyncRequired;
            return Err(BookError::BufferOverflow {
                key: self.key.clone(),
                capacity: self.pending.capacity(),
                evicted_through: self.pending.evicted_through().unwrap_or_default(),
            });
        }

        Ok(UpdateOutcome::Buffered {
            pending: self.pending.len(),
        })
    }

    fn write_changes(&mut self, changes: &[LevelChange]) -> Vec<RejectedLevel> {
        let mut rejected = Vec::new();

        for change in changes {
            let level = change.level();
            if let Some(defect) = level.defect() {
                rejected.push(RejectedLevel {
                    side: change.side,
                    level,
                    defect,
                });
                continue;
            }

            self.ladder_mut(change.side).apply(change.price, change.size);
        }

        rejected
    }

    fn enforce_depth(&mut self) {
        if let Some(depth) = self.settings.max_depth {
            self.bids.truncate(depth);
            self.asks.truncate(depth);
        }
    }

    fn check(&self) {
        if self.settings.verify_invariants {
            self.assert_consistent();
        }
    }

    /// Check ladder ordering, uniqueness and sizes
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.bids
            .verify()
            .and_then(|_| self.asks.verify())
            .map_err(|violation| InvariantViolation {
                key: self.key.clone(),
                violation,
            })
    }

    /// Panic if the book is corrupted
    ///
    /// Serving a book that fails this check would hand wrong prices to
    /// consumers, so a failure is treated as a bug, not a runtime condition.
    pub fn assert_consistent(&self) {
        if let Err(violation) = self.verify() {
            panic!("{violation}");
        }
    }

    /// Clear depth and buffer, returning to the pre-snapshot state
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.pending.clear();
        self.last_update_id = 0;
        self.last_update_time = None;
        self.state = SyncState::AwaitingSnapshot;
        self.stats.invalidations += 1;
    }

    /// Point-in-time copy of the book
    pub fn view(&self) -> BookView {
        BookView {
            key: self.key.clone(),
            bids: self.bids.to_vec(),
            asks: self.asks.to_vec(),
            last_update_id: self.last_update_id,
            last_update_time: self.last_update_time,
            state: self.state,
        }
    }
}

/// Immutable copy of a book's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookView {
    /// Instrument
    pub key: InstrumentKey,
    /// Bid levels, highest first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, lowest first
    pub asks: Vec<PriceLevel>,
    /// Sequence token of the latest applied change
    pub last_update_id: u64,
    /// Time of the latest applied change
    pub last_update_time: Option<DateTime<Utc>>,
    /// State at time of copy
    pub state: SyncState,
}

impl BookView {
    /// Check if the copy reflects a loaded snapshot
    pub fn has_snapshot(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// Best bid
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Top N bids
    pub fn top_bids(&self, n: usize) -> &[PriceLevel] {
        &self.bids[..n.min(self.bids.len())]
    }

    /// Top N asks
    pub fn top_asks(&self, n: usize) -> &[PriceLevel] {
        &self.asks[..n.min(self.asks.len())]
    }
}

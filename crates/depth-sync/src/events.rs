//! Book change notifications

use depth_types::{DateTime, InstrumentKey, Utc};
use serde::{Deserialize, Serialize};

/// What caused a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A snapshot was loaded
    Snapshot,
    /// An incremental update was applied
    Update,
    /// The book was reset and awaits a new snapshot
    Invalidated,
}

/// "State changed, re-read it" signal for one instrument
///
/// Carries no depth data, so merging several into one loses nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChange {
    /// Instrument that changed
    pub key: InstrumentKey,
    /// Timestamp of the change
    pub timestamp: DateTime<Utc>,
    /// Best bid or best ask moved
    pub top_of_book_changed: bool,
    /// Cause of the latest change
    pub kind: ChangeKind,
}

impl BookChange {
    /// Create a change notification
    pub fn new(
        key: InstrumentKey,
        timestamp: DateTime<Utc>,
        top_of_book_changed: bool,
        kind: ChangeKind,
    ) -> Self {
        Self {
            key,
            timestamp,
            top_of_book_changed,
            kind,
        }
    }

    /// Fold a newer notification for the same instrument into this one
    pub fn merge(&mut self, newer: BookChange) {
        self.top_of_book_changed |= newer.top_of_book_changed;
        self.timestamp = self.timestamp.max(newer.timestamp);
        self.kind = newer.kind;
    }
}

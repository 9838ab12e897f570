//! Bounded queue of updates received before a snapshot
//!
//! Holds raw updates while a book waits for its snapshot. Once full, the
//! oldest entry is evicted and the highest evicted update ID is remembered so
//! a snapshot that predates the lost history can be refused.

use depth_types::BookUpdate;
use std::collections::VecDeque;

/// Default number of updates held per book
pub const DEFAULT_PENDING_CAPACITY: usize = 1000;

/// Updates released by [`PendingBuffer::drain_after`]
#[derive(Debug, Clone, Default)]
pub struct DrainedUpdates {
    /// Updates newer than the snapshot, ascending by update ID
    pub updates: Vec<BookUpdate>,
    /// Entries already represented in the snapshot
    pub discarded: usize,
}

/// Per-book pending-update ring buffer
#[derive(Debug, Clone)]
pub struct PendingBuffer {
    entries: VecDeque<BookUpdate>,
    capacity: usize,
    evicted_through: Option<u64>,
}

impl PendingBuffer {
    /// Create a buffer holding at most `capacity` updates
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted_through: None,
        }
    }

    /// Append an update, evicting and returning the oldest one when full
    pub fn push(&mut self, update: BookUpdate) -> Option<BookUpdate> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        if let Some(old) = &evicted {
            let through = self.evicted_through.map_or(old.update_id, |e| e.max(old.update_id));
            self.evicted_through = Some(through);
        }

        self.entries.push_back(update);
        evicted
    }

    /// Highest update ID lost to eviction since the last clear
    pub fn evicted_through(&self) -> Option<u64> {
        self.evicted_through
    }

    /// Whether a snapshot at `snapshot_id` already covers every evicted update
    pub fn covers(&self, snapshot_id: u64) -> bool {
        self.evicted_through.map_or(true, |e| snapshot_id >= e)
    }

    /// Remove everything, returning updates newer than `snapshot_id` in ID order
    pub fn drain_after(&mut self, snapshot_id: u64) -> DrainedUpdates {
        let mut updates: Vec<BookUpdate> = self.entries.drain(..).collect();
        self.evicted_through = None;

        let before = updates.len();
        updates.retain(|u| u.update_id > snapshot_id);
        let discarded = before - updates.len();

        // Stable: equal IDs keep arrival order
        updates.sort_by_key(|u| u.update_id);

        DrainedUpdates { updates, discarded }
    }

    /// Drop all entries and forget evicted history
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.evicted_through = None;
        dropped
    }

    /// Number of buffered updates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of buffered updates
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterator over buffered updates (arrival order)
    pub fn iter(&self) -> impl Iterator<Item = &BookUpdate> {
        self.entries.iter()
    }
}

impl Default for PendingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_CAPACITY)
    }
}

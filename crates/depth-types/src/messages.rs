//! Canonical book records produced by venue feed decoders

use crate::{InstrumentKey, LevelChange, PriceLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full replacement of one instrument's depth at a known sequence token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels, any order
    pub bids: Vec<PriceLevel>,
    /// Ask levels, any order
    pub asks: Vec<PriceLevel>,
    /// Sequence token the snapshot is current as of
    pub snapshot_id: u64,
    /// Venue or receipt time of the snapshot
    pub timestamp: DateTime<Utc>,
}

impl BookSnapshot {
    /// Create a new snapshot
    pub fn new(
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        snapshot_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            bids,
            asks,
            snapshot_id,
            timestamp,
        }
    }
}

/// Incremental set of level changes since the previous sequence token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookUpdate {
    /// Sequence token of this update
    pub update_id: u64,
    /// Level changes, applied in order
    pub changes: Vec<LevelChange>,
    /// Venue or receipt time of the update
    pub timestamp: DateTime<Utc>,
}

impl BookUpdate {
    /// Create a new update
    pub fn new(update_id: u64, changes: Vec<LevelChange>, timestamp: DateTime<Utc>) -> Self {
        Self {
            update_id,
            changes,
            timestamp,
        }
    }
}

/// Decoded book message, classified once at the feed boundary
#[derive(Debug, Clone, PartialEq)]
pub enum BookMessage {
    /// Load a full snapshot
    Snapshot {
        /// Target instrument
        key: InstrumentKey,
        /// Snapshot payload
        snapshot: BookSnapshot,
        /// Replay updates buffered before this snapshot
        buffer_enabled: bool,
    },
    /// Apply an incremental update
    Update {
        /// Target instrument
        key: InstrumentKey,
        /// Update payload
        update: BookUpdate,
    },
    /// Reset the book to its pre-snapshot state
    Invalidate {
        /// Target instrument
        key: InstrumentKey,
    },
}

impl BookMessage {
    /// Instrument this message targets
    pub fn key(&self) -> &InstrumentKey {
        match self {
            Self::Snapshot { key, .. } | Self::Update { key, .. } | Self::Invalidate { key } => key,
        }
    }
}

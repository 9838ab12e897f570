//! Error types for book synchronization

use crate::{InstrumentKey, RejectedLevel};
use thiserror::Error;

/// Recoverable, per-instrument synchronization error
///
/// All variants are returned as values to the feed adapter, which decides
/// whether to resync, log or drop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    /// Update arrived with buffering disabled and no snapshot loaded
    #[error("no snapshot loaded for {key}")]
    NoSnapshot { key: InstrumentKey },

    /// Update sequence token is not ahead of the book
    #[error("out of order update for {key}: update {update_id} <= last {last_update_id}")]
    OutOfOrder {
        key: InstrumentKey,
        update_id: u64,
        last_update_id: u64,
    },

    /// Snapshot is older than state already applied
    #[error("stale snapshot for {key}: snapshot {snapshot_id} < last {last_update_id}")]
    StaleSnapshot {
        key: InstrumentKey,
        snapshot_id: u64,
        last_update_id: u64,
    },

    /// Pending-update buffer lost history; a snapshot newer than the lost range is needed
    #[error("pending buffer overflow for {key} (capacity {capacity}, history lost through {evicted_through})")]
    BufferOverflow {
        key: InstrumentKey,
        capacity: usize,
        evicted_through: u64,
    },

    /// Some levels were malformed and skipped; the rest were applied
    #[error("{} invalid level(s) skipped for {key}", .rejected.len())]
    InvalidLevel {
        key: InstrumentKey,
        rejected: Vec<RejectedLevel>,
    },

    /// Read for an instrument that was never initialized
    #[error("unknown instrument: {key}")]
    UnknownInstrument { key: InstrumentKey },
}

impl BookError {
    /// Instrument the error concerns
    pub fn key(&self) -> &InstrumentKey {
        match self {
            Self::NoSnapshot { key }
            | Self::OutOfOrder { key, .. }
            | Self::StaleSnapshot { key, .. }
            | Self::BufferOverflow { key, .. }
            | Self::InvalidLevel { key, .. }
            | Self::UnknownInstrument { key } => key,
        }
    }

    /// Returns true if the caller must fetch a fresh snapshot
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Self::NoSnapshot { .. } | Self::OutOfOrder { .. } | Self::BufferOverflow { .. }
        )
    }

    /// Returns true if the payload can be dropped without further action
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::StaleSnapshot { .. })
    }

    /// Returns true if the book was still mutated despite the error
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::InvalidLevel { .. })
    }
}

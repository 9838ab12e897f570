//! Registry configuration

use depth_book::{BookSettings, DEFAULT_PENDING_CAPACITY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default pending notifications per subscriber
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Pending-update buffer cannot hold anything
    #[error("buffer_capacity must be greater than zero")]
    ZeroBufferCapacity,

    /// Subscribers cannot hold a notification
    #[error("subscriber_capacity must be greater than zero")]
    ZeroSubscriberCapacity,

    /// Depth cap would empty every book
    #[error("max_depth must be greater than zero when set")]
    ZeroMaxDepth,
}

/// Configuration for a [`BookRegistry`](crate::BookRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Buffer updates that arrive before a snapshot
    pub buffer_enabled: bool,
    /// Pending-update buffer bound per book
    pub buffer_capacity: usize,
    /// Pending notifications per subscriber before the oldest is dropped
    pub subscriber_capacity: usize,
    /// Optional per-side depth cap
    pub max_depth: Option<usize>,
    /// Run the consistency check after every mutation
    pub verify_invariants: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            buffer_enabled: true,
            buffer_capacity: DEFAULT_PENDING_CAPACITY,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            max_depth: None,
            verify_invariants: cfg!(debug_assertions),
        }
    }
}

impl SyncConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pre-snapshot buffering
    pub fn with_buffering(mut self, enabled: bool) -> Self {
        self.buffer_enabled = enabled;
        self
    }

    /// Refuse updates that arrive before a snapshot
    pub fn without_buffering(self) -> Self {
        self.with_buffering(false)
    }

    /// Set the pending-update buffer bound
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the per-subscriber notification bound
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    /// Cap each side at `depth` levels
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Enable or disable the post-mutation consistency check
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::ZeroSubscriberCapacity);
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::ZeroMaxDepth);
        }
        Ok(())
    }

    /// Settings for each book the registry creates
    pub fn book_settings(&self) -> BookSettings {
        BookSettings {
            buffer_enabled: self.buffer_enabled,
            buffer_capacity: self.buffer_capacity,
            max_depth: self.max_depth,
            verify_invariants: self.verify_invariants,
        }
    }
}

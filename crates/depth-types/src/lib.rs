//! Shared types for the multi-venue depth synchronization engine
//!
//! This crate provides the value types that cross the boundary between venue
//! feed decoders, the per-instrument book engine and its consumers. It has
//! minimal dependencies and performs no locking or I/O.
//!
//! # Key Types
//!
//! - [`InstrumentKey`] - (venue, pair, asset type) identifying one order book
//! - [`PriceLevel`], [`LevelChange`] - Depth entries with decimal precision
//! - [`Side`], [`AssetType`], [`Venue`] - Classification enums
//! - [`BookSnapshot`], [`BookUpdate`], [`BookMessage`] - Canonical feed records
//! - [`BookError`] - Recoverable per-instrument errors

pub mod enums;
pub mod error;
pub mod instrument;
pub mod level;
pub mod messages;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use instrument::*;
pub use level::*;
pub use messages::*;

// Re-export for users
pub use chrono::{DateTime, Utc};
pub use rust_decimal::Decimal;

//! # arlock shared types (arlock-common)
//!
//! Shared value types, configuration, and the event bus used by the
//! QR-to-world anchoring pipeline.
//!
//! **Purpose:** Keep wire-facing value types (geometry, events, config) in one
//! crate so observing layers can depend on them without pulling in the engine.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;

pub use error::{Error, Result};

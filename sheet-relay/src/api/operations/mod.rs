//! Sheets write operations
//!
//! This module provides the value-write requests the relay issues and the
//! per-request outcome reported back to callers.

pub mod operation;

pub use operation::{UpdateOutcome, UpdateRequest};

//! Shared constants and value types for the disk latency probe
//!
//! This crate holds the fixed parameters of a probe session and the
//! small value types that cross module boundaries in the daemon.

#![no_std]

pub mod constants;
pub mod types;

// Re-export commonly used types
pub use constants::*;
pub use types::{secs_to_ms, NewHigh};

//! Shared types for the distributed-algorithm stress harness
//!
//! Holds what every harness-side tool agrees on: process identities,
//! hosts-file entries, per-process artifact naming and logging helpers.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

//! Benchmark engine module
//!
//! Contains the timing loop that drives a single direct I/O run.

pub mod engine;

// Re-export commonly used types
pub use engine::{IoEngine, RandomOffsets, TransferState};

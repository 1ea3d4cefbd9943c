//! Data models module
//!
//! Run measurements and the record formats they are printed in.

pub mod result;

// Re-export commonly used types
pub use result::{BenchmarkRecord, Measurement, OutputFormat};

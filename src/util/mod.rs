//! Utility functions module
//!
//! Size parsing and formatting helpers shared by both binaries.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_iops, calculate_throughput_mbps, format_bytes, parse_buffer_size, parse_bytes,
};

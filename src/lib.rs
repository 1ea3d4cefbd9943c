//! iobench - direct I/O disk microbenchmark
//!
//! Measures raw device throughput by timing unbuffered, cache-bypassing
//! reads or writes of a fixed volume, and generates operation-size and
//! stride test points for sweeping a device.

use std::fmt;
use std::path::PathBuf;

pub mod bench;
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod params;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum IoBenchError {
    /// Missing or malformed input, reported before any device access
    InvalidArgument(String),
    /// Configuration file could not be read or parsed
    ConfigError(String),
    /// Target path could not be opened
    OpenFailed { path: PathBuf, source: std::io::Error },
    /// Aligned buffer allocation failed
    AllocationFailed { size: usize, source: std::io::Error },
    /// A read call failed
    ReadFailed { offset: u64, source: std::io::Error },
    /// A write call failed
    WriteFailed { offset: u64, source: std::io::Error },
    /// Positioning the handle failed
    SeekFailed { source: std::io::Error },
    /// Flushing to stable storage failed
    SyncFailed { source: std::io::Error },
    /// Breakpoint set reached its limit
    CapacityExceeded { limit: usize },
    /// Result could not be rendered
    FormatError(String),
}

impl fmt::Display for IoBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoBenchError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            IoBenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            IoBenchError::OpenFailed { path, source } => {
                write!(f, "Error opening device {}: {}", path.display(), source)
            }
            IoBenchError::AllocationFailed { size, source } => {
                write!(f, "Error allocating {} bytes of aligned memory: {}", size, source)
            }
            IoBenchError::ReadFailed { offset, source } => {
                write!(f, "Read error at byte {}: {}", offset, source)
            }
            IoBenchError::WriteFailed { offset, source } => {
                write!(f, "Write error at byte {}: {}", offset, source)
            }
            IoBenchError::SeekFailed { source } => write!(f, "Seek error: {}", source),
            IoBenchError::SyncFailed { source } => write!(f, "Sync error: {}", source),
            IoBenchError::CapacityExceeded { limit } => {
                write!(f, "Breakpoint capacity exceeded (limit: {})", limit)
            }
            IoBenchError::FormatError(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for IoBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoBenchError::OpenFailed { source, .. }
            | IoBenchError::AllocationFailed { source, .. }
            | IoBenchError::ReadFailed { source, .. }
            | IoBenchError::WriteFailed { source, .. }
            | IoBenchError::SeekFailed { source }
            | IoBenchError::SyncFailed { source } => Some(source),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for IoBenchError {
    fn from(err: toml::de::Error) -> Self {
        IoBenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_json::Error> for IoBenchError {
    fn from(err: serde_json::Error) -> Self {
        IoBenchError::FormatError(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for iobench operations
pub type Result<T> = std::result::Result<T, IoBenchError>;

/// Error handling utilities
pub mod error {
    use super::{IoBenchError, Result};

    /// Retry policy for a whole benchmark run.
    ///
    /// The default is a single attempt: any I/O failure ends the run.
    #[derive(Debug, Clone)]
    pub struct RetryConfig {
        /// Maximum number of attempts, including the first one
        pub max_attempts: usize,
    }

    impl Default for RetryConfig {
        fn default() -> Self {
            Self { max_attempts: 1 }
        }
    }

    impl RetryConfig {
        pub fn with_max_attempts(mut self, attempts: usize) -> Self {
            self.max_attempts = attempts.max(1);
            self
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    pub fn retry<F, T>(mut operation: F, config: &RetryConfig) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let attempts = config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && is_retryable_error(&err) => {
                    log::warn!("attempt {}/{} failed: {}; retrying", attempt, attempts, err);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Check if an error is retryable
    pub fn is_retryable_error(error: &IoBenchError) -> bool {
        match error {
            IoBenchError::ReadFailed { source, .. }
            | IoBenchError::WriteFailed { source, .. }
            | IoBenchError::SeekFailed { source }
            | IoBenchError::SyncFailed { source } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Process exit code for a failed run
    pub fn exit_code(_error: &IoBenchError) -> i32 {
        1
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &IoBenchError) -> String {
        match error {
            IoBenchError::OpenFailed { source, .. } => match source.kind() {
                std::io::ErrorKind::PermissionDenied => format!(
                    "{}. Check permissions on the device or run with elevated privileges.",
                    error
                ),
                std::io::ErrorKind::InvalidInput => format!(
                    "{}. The filesystem may not support direct I/O; try --allow-buffered.",
                    error
                ),
                _ => error.to_string(),
            },
            IoBenchError::ReadFailed { source, .. } | IoBenchError::WriteFailed { source, .. }
                if source.kind() == std::io::ErrorKind::InvalidInput =>
            {
                format!(
                    "{}. Direct I/O needs sizes and offsets aligned to the device block size.",
                    error
                )
            }
            IoBenchError::CapacityExceeded { .. } => {
                format!("{}. Raise --max-points or coarsen the granularity.", error)
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "iobench";
/// Buffer alignment required for direct I/O
pub const KB4: usize = 4 * 1024;
/// Bytes transferred per run unless overridden
pub const DEFAULT_TRANSFER_VOLUME: u64 = 32 * 1024 * 1024;
/// Upper bound on generated breakpoints unless overridden
pub const DEFAULT_MAX_BREAKPOINTS: usize = 4096;

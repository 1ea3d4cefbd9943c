//! Benchmark result data models
//!
//! The measurement a run produces and the record shapes it is printed as.

use crate::config::{BenchmarkRequest, Direction, Pattern};
use crate::util::units::{calculate_iops, calculate_throughput_mbps, format_bytes};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of one completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Wall-clock time from the first I/O to the final sync
    pub elapsed: Duration,
    /// Elapsed time in seconds
    pub elapsed_secs: f64,
    /// Reciprocal of `elapsed_secs`
    pub rate: f64,
    /// Bytes accounted as transferred
    pub bytes_transferred: u64,
    /// I/O calls issued
    pub operations: u64,
    /// Whether the page cache was bypassed
    pub direct_io: bool,
}

impl Measurement {
    pub fn new(elapsed: Duration, bytes_transferred: u64, operations: u64, direct_io: bool) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        Self {
            elapsed,
            elapsed_secs,
            rate: 1.0 / elapsed_secs,
            bytes_transferred,
            operations,
            direct_io,
        }
    }

    /// `<elapsed>,<rate>` with ten decimal places
    pub fn to_line(&self) -> String {
        format!("{:.10},{:.10}", self.elapsed_secs, self.rate)
    }

    pub fn throughput_mbps(&self) -> f64 {
        calculate_throughput_mbps(self.bytes_transferred, self.elapsed)
    }

    pub fn iops(&self) -> f64 {
        calculate_iops(self.operations, self.elapsed)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} in {:.6}s ({:.2} MiB/s, {:.0} IOPS, {})",
            format_bytes(self.bytes_transferred),
            self.elapsed_secs,
            self.throughput_mbps(),
            self.iops(),
            if self.direct_io { "direct" } else { "buffered" }
        )
    }
}

/// One row of a sweep, keyed the way result tables group runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub timestamp: DateTime<Utc>,
    pub device: String,
    pub io_size: usize,
    pub stride: u64,
    pub operation: Direction,
    pub pattern: Pattern,
    pub elapsed_secs: f64,
    pub rate: f64,
    pub bytes_transferred: u64,
    pub throughput_mbps: f64,
    pub direct_io: bool,
}

impl BenchmarkRecord {
    pub fn new(request: &BenchmarkRequest, measurement: &Measurement) -> Self {
        Self {
            timestamp: Utc::now(),
            device: request.path.display().to_string(),
            io_size: request.operation_size,
            stride: request.stride,
            operation: request.direction,
            pattern: request.pattern,
            elapsed_secs: measurement.elapsed_secs,
            rate: measurement.rate,
            bytes_transferred: measurement.bytes_transferred,
            throughput_mbps: measurement.throughput_mbps(),
            direct_io: measurement.direct_io,
        }
    }
}

/// How a successful run is printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `<elapsed>,<rate>`
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    /// Render the single output line for a run
    pub fn render(&self, request: &BenchmarkRequest, measurement: &Measurement) -> Result<String> {
        match self {
            OutputFormat::Plain => Ok(measurement.to_line()),
            OutputFormat::Json => {
                Ok(serde_json::to_string(&BenchmarkRecord::new(request, measurement))?)
            }
        }
    }
}

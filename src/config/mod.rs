//! Configuration management module
//!
//! Holds the parameters of a single benchmark run and the engine tunables
//! that can optionally be loaded from a TOML file.

use crate::{IoBenchError, Result, DEFAULT_TRANSFER_VOLUME, KB4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Direction of every I/O call in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
}

/// Access pattern across the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Sequential,
    Random,
}

impl Direction {
    /// Byte the I/O buffer is filled with before the run
    pub fn fill_byte(&self) -> u8 {
        match self {
            Direction::Read => 0,
            Direction::Write => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Sequential => "sequential",
            Pattern::Random => "random",
        }
    }
}

/// Engine tunables shared by every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Bytes to transfer before the clock stops
    pub transfer_volume: u64,
    /// Alignment of the I/O buffer (in bytes)
    pub alignment: usize,
    /// Seed for random offsets; entropy when unset
    pub seed: Option<u64>,
    /// Reopen without O_DIRECT when the filesystem rejects it
    pub allow_buffered_fallback: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            transfer_volume: DEFAULT_TRANSFER_VOLUME,
            alignment: KB4,
            seed: None,
            allow_buffered_fallback: false,
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of bytes a run transfers
    pub fn with_transfer_volume(mut self, volume: u64) -> Self {
        self.transfer_volume = volume;
        self
    }

    /// Set the buffer alignment
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Seed the random offset source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_buffered_fallback(mut self, allow: bool) -> Self {
        self.allow_buffered_fallback = allow;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.transfer_volume == 0 {
            return Err(IoBenchError::InvalidArgument(
                "Transfer volume must be greater than 0".to_string(),
            ));
        }
        if self.alignment == 0 || !self.alignment.is_power_of_two() {
            return Err(IoBenchError::InvalidArgument(format!(
                "Alignment must be a power of 2, got {}",
                self.alignment
            )));
        }
        // O_DIRECT transfers need a buffer aligned to at least one 4 KiB block
        if self.alignment < KB4 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Alignment must be at least {} bytes, got {}",
                KB4, self.alignment
            )));
        }
        Ok(())
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IoBenchError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str::<Self>(&content)
            .map_err(|e| {
                IoBenchError::ConfigError(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })
            .and_then(|config| {
                config.validate()?;
                Ok(config)
            })
    }
}

/// Parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    /// Device or file to benchmark
    pub path: PathBuf,
    /// Size of each I/O operation (in bytes)
    pub operation_size: usize,
    /// Gap skipped after each sequential operation (in bytes)
    pub stride: u64,
    pub direction: Direction,
    pub pattern: Pattern,
    pub config: BenchConfig,
}

impl BenchmarkRequest {
    /// Sequential write request with no stride and default tunables
    pub fn new(path: impl Into<PathBuf>, operation_size: usize) -> Self {
        Self {
            path: path.into(),
            operation_size,
            stride: 0,
            direction: Direction::Write,
            pattern: Pattern::Sequential,
            config: BenchConfig::default(),
        }
    }

    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_config(mut self, config: BenchConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of operation-sized slots random offsets are drawn from
    pub fn random_slots(&self) -> u64 {
        self.config.transfer_volume / self.operation_size as u64
    }

    /// Reject requests that can never run, before touching the device
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(IoBenchError::InvalidArgument(
                "Device path is required".to_string(),
            ));
        }
        if self.operation_size == 0 {
            return Err(IoBenchError::InvalidArgument(
                "Operation size must be greater than 0".to_string(),
            ));
        }
        if i64::try_from(self.stride).is_err() {
            return Err(IoBenchError::InvalidArgument(format!(
                "Stride too large: {} bytes",
                self.stride
            )));
        }
        self.config.validate()?;

        if self.pattern == Pattern::Random && self.random_slots() == 0 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Operation size {} exceeds transfer volume {} for random access",
                self.operation_size, self.config.transfer_volume
            )));
        }
        Ok(())
    }
}

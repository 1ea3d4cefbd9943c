//! Command-line definitions for the `iobench` and `genparams` binaries

use crate::config::{BenchConfig, BenchmarkRequest, Direction, Pattern};
use crate::models::OutputFormat;
use crate::params::RangeSpec;
use crate::util::units::{parse_buffer_size, parse_bytes};
use crate::{IoBenchError, Result, DEFAULT_MAX_BREAKPOINTS};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iobench")]
#[command(about = "Microbenchmark for direct (unbuffered) disk I/O", long_about = None)]
#[command(after_help = "Example:\n  iobench -d /dev/sda -s 4096 -t 4096 -o write -p sequential")]
pub struct BenchCli {
    /// Device or file to benchmark (e.g. /dev/sda)
    #[arg(short = 'd', long = "device")]
    pub device: Option<PathBuf>,

    /// Size of each I/O operation in bytes (accepts units, e.g. 4KiB)
    #[arg(short = 's', long = "size", value_parser = parse_buffer_size)]
    pub size: Option<usize>,

    /// Bytes skipped between sequential operations
    #[arg(short = 't', long = "stride", value_parser = parse_bytes, default_value = "0")]
    pub stride: u64,

    /// I/O operation type
    #[arg(short = 'o', long = "operation", value_enum, default_value_t = Direction::Write)]
    pub operation: Direction,

    /// I/O access pattern
    #[arg(short = 'p', long = "pattern", value_enum, default_value_t = Pattern::Sequential)]
    pub pattern: Pattern,

    /// Total bytes to transfer (default 32MiB)
    #[arg(long, value_parser = parse_bytes)]
    pub volume: Option<u64>,

    /// Seed for random offsets
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fall back to synchronous buffered I/O if direct I/O is rejected
    #[arg(long)]
    pub allow_buffered: bool,

    /// Read engine defaults from a TOML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Attempts per run when a transfer is interrupted
    #[arg(long, default_value_t = 1)]
    pub attempts: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl BenchCli {
    /// Build the run request, layering flags over the config file
    pub fn to_request(&self) -> Result<BenchmarkRequest> {
        let (device, size) = match (&self.device, self.size) {
            (Some(device), Some(size)) if size > 0 => (device.clone(), size),
            _ => {
                return Err(IoBenchError::InvalidArgument(
                    "Missing required arguments".to_string(),
                ))
            }
        };

        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };
        if let Some(volume) = self.volume {
            config = config.with_transfer_volume(volume);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.allow_buffered {
            config = config.with_buffered_fallback(true);
        }

        let request = BenchmarkRequest::new(device, size)
            .with_stride(self.stride)
            .with_direction(self.operation)
            .with_pattern(self.pattern)
            .with_config(config);
        request.validate()?;
        Ok(request)
    }
}

#[derive(Parser, Debug)]
#[command(name = "genparams")]
#[command(about = "Generate I/O size and stride test points by midpoint subdivision", long_about = None)]
pub struct GenCli {
    /// Smallest I/O size
    #[arg(long, value_parser = parse_bytes, default_value = "4096")]
    pub io_min: u64,

    /// Largest I/O size
    #[arg(long, value_parser = parse_bytes, default_value = "104857600")]
    pub io_max: u64,

    /// Smallest stride
    #[arg(long, value_parser = parse_bytes, default_value = "4096")]
    pub stride_min: u64,

    /// Largest stride
    #[arg(long, value_parser = parse_bytes, default_value = "104857600")]
    pub stride_max: u64,

    /// Largest acceptable gap between neighbouring points
    #[arg(long, value_parser = parse_bytes, default_value = "1048576")]
    pub granularity: u64,

    /// Maximum number of points per list
    #[arg(long, default_value_t = DEFAULT_MAX_BREAKPOINTS)]
    pub max_points: usize,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GenCli {
    pub fn io_range(&self) -> Result<RangeSpec> {
        range_from(self.io_min, self.io_max, self.granularity)
    }

    pub fn stride_range(&self) -> Result<RangeSpec> {
        range_from(self.stride_min, self.stride_max, self.granularity)
    }
}

fn range_from(min: u64, max: u64, granularity: u64) -> Result<RangeSpec> {
    let to_i64 = |value: u64| {
        i64::try_from(value)
            .map_err(|_| IoBenchError::InvalidArgument(format!("Value too large: {}", value)))
    };
    RangeSpec::new(to_i64(min)?, to_i64(max)?, to_i64(granularity)?)
}

/// Outcome of parsing arguments for a binary
pub enum Parsed<T> {
    Run(T),
    /// Help or version was printed; exit successfully
    Exit,
}

/// Parse arguments, printing help on stdout and usage errors on stderr.
///
/// Usage errors map to exit code 1 instead of clap's default.
pub fn parse_args<T, I, A>(args: I) -> std::result::Result<Parsed<T>, i32>
where
    T: Parser,
    I: IntoIterator<Item = A>,
    A: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Parsed::Run(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                Ok(Parsed::Exit)
            }
            _ => {
                let _ = err.print();
                Err(1)
            }
        },
    }
}

/// Map `-v` occurrences to a log level; warnings only by default
pub fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initialise stderr logging; `RUST_LOG` overrides the verbosity flags
pub fn init_logging(verbose: u8) {
    let _ = env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

//! Byte-size parsing and formatting
//!
//! Byte counts on the command line and in log lines, plus the derived
//! rates reported alongside a measurement.

use std::time::Duration;

/// Format bytes with binary units, one decimal above 1 KiB
///
/// # Examples
/// ```
/// use iobench::util::units::format_bytes;
///
/// assert_eq!(format_bytes(4096), "4.0 KiB");
/// assert_eq!(format_bytes(32 * 1024 * 1024), "32.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let exponent = ((63 - bytes.leading_zeros()) / 10).min(UNITS.len() as u32) as usize;
    let scaled = bytes as f64 / (1u64 << (10 * exponent)) as f64;
    format!("{:.1} {}", scaled, UNITS[exponent - 1])
}

/// Parse a byte count with an optional binary suffix.
///
/// Accepts a plain integer, optionally followed by `B`, `K`/`KiB`,
/// `M`/`MiB`, `G`/`GiB` or `T`/`TiB` (case-insensitive, space allowed).
///
/// # Examples
/// ```
/// use iobench::util::units::parse_bytes;
///
/// assert_eq!(parse_bytes("104857600").unwrap(), 104857600);
/// assert_eq!(parse_bytes("4KiB").unwrap(), 4096);
/// assert_eq!(parse_bytes("1 M").unwrap(), 1048576);
/// ```
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, suffix) = input.split_at(split);
    if digits.is_empty() {
        return Err(format!("Invalid size: '{}'", input));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Size too large: {}", input))?;
    let shift = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KIB" => 10,
        "M" | "MIB" => 20,
        "G" | "GIB" => 30,
        "T" | "TIB" => 40,
        _ => return Err(format!("Unknown unit: {}", suffix.trim())),
    };
    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| format!("Size too large: {}", input))
}

/// [`parse_bytes`] for sizes that index memory
pub fn parse_buffer_size(input: &str) -> Result<usize, String> {
    let bytes = parse_bytes(input)?;
    usize::try_from(bytes).map_err(|_| format!("Size too large for this platform: {}", input))
}

/// Calculate throughput in MiB/s from bytes and duration
pub fn calculate_throughput_mbps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    let megabytes = bytes as f64 / 1_048_576.0;
    megabytes / duration.as_secs_f64()
}

/// Calculate IOPS (Input/Output Operations Per Second)
pub fn calculate_iops(operations: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    operations as f64 / duration.as_secs_f64()
}

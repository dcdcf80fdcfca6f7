//! Parsing of human-readable data sizes and durations.

use std::time::Duration;

use crate::error::ScanError;

/// One kibibyte.
pub const KB: u64 = 1024;
/// One mebibyte.
pub const MB: u64 = 1024 * KB;
/// One gibibyte.
pub const GB: u64 = 1024 * MB;
/// One tebibyte.
pub const TB: u64 = 1024 * GB;
/// One pebibyte.
pub const PB: u64 = 1024 * TB;
/// One exbibyte.
pub const EB: u64 = 1024 * PB;

/// Split `"5 mb"` into `("5", "mb")`.
///
/// Returns `None` when the string does not start with a digit or when
/// anything other than letters follows the optional whitespace.
fn split_quantity(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }

    let (number, rest) = s.split_at(digits_end);
    let unit = rest.trim_start();
    if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((number, unit))
}

fn size_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit {
        "" | "b" => 1,
        "k" | "kb" => KB,
        "m" | "mb" => MB,
        "g" | "gb" => GB,
        "t" | "tb" => TB,
        "p" | "pb" => PB,
        "e" | "eb" => EB,
        _ => return None,
    };
    Some(multiplier)
}

/// Parse a data size string (e.g., "5mb", "5 MB", "1k", "500").
///
/// Units are case-insensitive binary multiples of 1024. A missing unit
/// means raw bytes.
pub fn parse_data_size(value: &str) -> Result<u64, ScanError> {
    let invalid = |reason: &str| ScanError::InvalidSize {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (number, unit) = split_quantity(value)
        .ok_or_else(|| invalid("expected a number followed by an optional unit"))?;
    let size: u64 = number.parse().map_err(|_| invalid("the number is out of range"))?;
    let unit = unit.to_ascii_lowercase();
    let multiplier =
        size_multiplier(&unit).ok_or_else(|| invalid(&format!("unknown unit '{unit}'")))?;

    size
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("the size is out of range"))
}

fn duration_multiplier(unit: &str) -> Option<u64> {
    let seconds = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        "w" | "week" | "weeks" => 7 * 24 * 60 * 60,
        _ => return None,
    };
    Some(seconds)
}

/// Parse a duration string (e.g., "15m", "8h", "5 minute", "30").
///
/// A missing unit means seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ScanError> {
    let invalid = |reason: &str| ScanError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (number, unit) = split_quantity(value)
        .ok_or_else(|| invalid("expected a number followed by an optional unit"))?;
    let amount: u64 = number.parse().map_err(|_| invalid("the number is out of range"))?;
    let unit = unit.to_ascii_lowercase();
    let multiplier =
        duration_multiplier(&unit).ok_or_else(|| invalid(&format!("unknown unit '{unit}'")))?;

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid("the duration is out of range"))
}

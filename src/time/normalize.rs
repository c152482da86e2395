//! Timestamp normalization
//!
//! Callers send wall-clock timestamps in the server's local time, suffixed with a
//! literal `Z`. This module parses both accepted shapes and re-expresses them as
//! canonical UTC strings for range filters.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, Utc};

use crate::time::error::{TimeError, TimeResult};

/// Accepted input formats, tried in order
const INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// Canonical output format (microsecond precision, `Z` suffix)
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Parse a caller timestamp into a naive local wall-clock time.
///
/// A trailing `+00:00` offset is rewritten to `Z` before parsing.
pub fn parse_local(input: &str) -> TimeResult<NaiveDateTime> {
    let trimmed = input.trim();
    let candidate = match trimmed.strip_suffix("+00:00") {
        Some(head) => format!("{}Z", head),
        None => trimmed.to_string(),
    };

    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&candidate, fmt).ok())
        .ok_or_else(|| TimeError::InvalidTimestamp(input.to_string()))
}

/// Interpret a local wall-clock time at `offset` and convert it to UTC
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Parse a caller timestamp and convert it to a UTC instant
pub fn parse_utc(input: &str, offset: FixedOffset) -> TimeResult<DateTime<Utc>> {
    parse_local(input).map(|local| local_to_utc(local, offset))
}

/// Normalize a caller timestamp into the canonical UTC string
///
/// # Example
///
/// ```
/// use chrono::FixedOffset;
/// use dashquery::time::normalize_timestamp;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let out = normalize_timestamp("2024-01-01T00:00:00Z", utc).unwrap();
/// assert_eq!(out, "2024-01-01T00:00:00.000000Z");
/// ```
pub fn normalize_timestamp(input: &str, offset: FixedOffset) -> TimeResult<String> {
    Ok(parse_utc(input, offset)?
        .format(CANONICAL_FORMAT)
        .to_string())
}

/// Parse a `+HH:MM` / `-HH:MM` offset descriptor (`Z` and `UTC` mean zero)
pub fn parse_offset(descriptor: &str) -> TimeResult<FixedOffset> {
    let s = descriptor.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || TimeError::InvalidOffset(descriptor.to_string());

    let (sign, rest) = if let Some(rest) = s.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

//! Utility functions for timestamps, labels and coordinate checks

use crate::{Result, TripError};
use chrono::DateTime;

/// Valid latitude range in degrees (WGS84)
pub const MAX_LATITUDE: f64 = 90.0;

/// Valid longitude range in degrees (WGS84)
pub const MAX_LONGITUDE: f64 = 180.0;

/// Label substituted when the caller supplies an empty or blank one
pub const UNLABELED: &str = "unlabeled";

/// Second-precision UTC format used for `start_time` / `end_time`
const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format epoch milliseconds as `yyyy-MM-ddTHH:mm:ssZ` in UTC
///
/// Sub-second precision is truncated, never rounded.
///
/// # Arguments
/// * `millis` - Milliseconds since the Unix epoch
///
/// # Returns
/// The formatted timestamp, or [`TripError::InvalidTimestamp`] if chrono cannot
/// represent the instant
pub fn iso_utc(millis: i64) -> Result<String> {
    let datetime =
        DateTime::from_timestamp_millis(millis).ok_or(TripError::InvalidTimestamp(millis))?;
    Ok(datetime.format(ISO_UTC_FORMAT).to_string())
}

/// Parse an RFC 3339 timestamp (any offset) into epoch milliseconds
pub fn parse_rfc3339_millis(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.timestamp_millis())
}

/// Route label stored in the artifact: the caller's label, or [`UNLABELED`] when blank
#[inline]
pub fn route_label(label: &str) -> String {
    if label.trim().is_empty() {
        UNLABELED.to_string()
    } else {
        label.to_string()
    }
}

/// ASCII whitespace including vertical tab; other Unicode spaces are dropped, not joined
fn is_label_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Reduce a free-form label to `[a-z0-9\-_]` for use in a filename
///
/// Lowercases, collapses every whitespace run into a single `-`, then drops any other
/// character outside the allowed set. Falls back to [`UNLABELED`] if nothing survives.
pub fn sanitize_label(label: &str) -> String {
    let mut safe = String::with_capacity(label.len());
    let mut in_whitespace = false;

    for c in label.to_lowercase().chars() {
        if is_label_whitespace(c) {
            if !in_whitespace {
                safe.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
            safe.push(c);
        }
    }

    if safe.is_empty() {
        UNLABELED.to_string()
    } else {
        safe
    }
}

/// Check if a coordinate pair is within WGS84 bounds
#[inline(always)]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) && (-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon)
}

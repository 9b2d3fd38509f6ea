//! Timestamp utilities
//!
//! Log records carry a local wall-clock timestamp in the archive's
//! `YYYY-MM-DD HH:MM:SS` format, without timezone.

use chrono::{Local, NaiveDateTime, Timelike};

/// Timestamp format used in the description log
pub const FECHA_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current local timestamp, truncated to whole seconds
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Format a timestamp for the log file
pub fn format_fecha(timestamp: &NaiveDateTime) -> String {
    timestamp.format(FECHA_FORMAT).to_string()
}

/// Parse a log file timestamp
///
/// Returns `None` for empty or malformed cells.
pub fn parse_fecha(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), FECHA_FORMAT).ok()
}

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

/// IEC units for byte quantities.
const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Formats a byte count into a human-readable string using IEC units.
///
/// Scales the value by dividing by 1024 repeatedly until it falls below 1024,
/// then formats it with either exact bytes (for < 1024) or two decimal places.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Formats a recording length as `MM:SS`, or `HH:MM:SS` past an hour.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut out = String::with_capacity(8);
    // Writing into a String cannot fail.
    let _ = if hours > 0 {
        write!(&mut out, "{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        write!(&mut out, "{:02}:{:02}", minutes, secs)
    };

    out
}

/// Formats a memo date in the local time zone.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

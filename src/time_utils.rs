// SPDX-License-Identifier: MIT

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a millisecond duration as `HH:MM:SS` for the elapsed-time readout.
pub fn format_duration_hms(millis: u64) -> String {
    let seconds = (millis / 1000) % 60;
    let minutes = (millis / (1000 * 60)) % 60;
    let hours = millis / (1000 * 60 * 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

//! Local-time rendering and parsing.
//!
//! Readings are stored in UTC; everything a person reads or types is in the
//! local time zone.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Utc};

/// Full date and time, in the style of an en-US locale string.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Time of day only, used for chart x-axis labels.
pub const TIME_LABEL_FORMAT: &str = "%-I:%M:%S %p";

/// Format accepted when typing a date range.
pub const INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render a UTC instant in local time with the given strftime pattern.
pub fn format_local(ts: &DateTime<Utc>, pattern: &str) -> String {
    ts.with_timezone(&Local).format(pattern).to_string()
}

/// Parse a local "YYYY-MM-DD HH:MM" string into a UTC instant.
///
/// Returns `None` for malformed input and for local times that do not
/// exist or are ambiguous (DST transitions).
pub fn parse_local(input: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), INPUT_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Day or night, decided by the local wall-clock hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    /// Night when the hour is before 6 or after 18.
    pub fn from_hour(hour: u32) -> Self {
        if hour < 6 || hour > 18 {
            DayPhase::Night
        } else {
            DayPhase::Day
        }
    }

    /// Phase for the current local time.
    pub fn now() -> Self {
        Self::from_hour(Local::now().hour())
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DayPhase::Day => "☀",
            DayPhase::Night => "☾",
        }
    }
}

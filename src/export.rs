//! CSV export of the visible history.
//!
//! Columns follow the chart's visibility toggles. Timestamps are rendered in
//! local time; since the default rendering contains a comma, fields are
//! quoted per RFC 4180 when needed.

use std::borrow::Cow;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::data::time::format_local;
use crate::data::{Metric, Reading, Visibility};

/// Suggested file name for downloads.
pub const DEFAULT_FILE_NAME: &str = "plantpulse_data.csv";

/// Encode rows as CSV, rendering timestamps with a local strftime pattern.
pub fn encode_csv(rows: &[Reading], visibility: &Visibility, timestamp_format: &str) -> String {
    encode_csv_with(rows, visibility, |ts| format_local(ts, timestamp_format))
}

/// Encode rows as CSV with a caller-supplied timestamp renderer.
pub fn encode_csv_with<F>(rows: &[Reading], visibility: &Visibility, format_timestamp: F) -> String
where
    F: Fn(&DateTime<Utc>) -> String,
{
    let metrics: Vec<Metric> = visibility.metrics().collect();

    let mut header = vec!["Timestamp"];
    header.extend(metrics.iter().map(|m| m.csv_header()));

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));

    for row in rows {
        let mut fields = vec![escape_field(&format_timestamp(&row.timestamp)).into_owned()];
        fields.extend(
            metrics
                .iter()
                .map(|&m| row.value(m).map(|v| v.to_string()).unwrap_or_default()),
        );
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write encoded CSV to `path`.
pub fn write_csv(path: &Path, csv: &str) -> Result<()> {
    std::fs::write(path, csv)?;
    info!(path = %path.display(), bytes = csv.len(), "Exported CSV");
    Ok(())
}

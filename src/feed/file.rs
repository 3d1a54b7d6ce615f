//! File-based feed.
//!
//! Polls a JSON file of readings written by the ingestion process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::Feed;
use crate::data::Reading;
use crate::error::FeedError;
use crate::store::MemoryStore;

/// A feed that mirrors a readings file into the store.
///
/// The file holds either a JSON array of readings or one reading per line.
/// The feed tracks the file's modification time and reloads the whole file
/// when it changes.
#[derive(Debug)]
pub struct FileFeed {
    path: PathBuf,
    store: MemoryStore,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileFeed {
    /// Create a new feed for the given path, writing into `store`.
    pub fn new<P: AsRef<Path>>(path: P, store: MemoryStore) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            store,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    /// Returns the path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn read_file(&self) -> Result<ParsedReadings, FeedError> {
        let content = fs::read_to_string(&self.path)?;
        parse_readings(&content)
    }
}

/// Readings recovered from a file, plus the documents that were left out.
#[derive(Debug, Default)]
pub struct ParsedReadings {
    pub readings: Vec<Reading>,
    pub skipped: usize,
    first_error: Option<serde_json::Error>,
}

impl ParsedReadings {
    fn push(&mut self, document: serde_json::Result<Reading>) {
        match document {
            Ok(reading) => self.readings.push(reading),
            Err(e) => {
                warn!(error = %e, "Skipping malformed reading");
                self.skipped += 1;
                self.first_error.get_or_insert(e);
            }
        }
    }

    /// Split into the readings and an error describing what was skipped.
    pub fn into_parts(self) -> (Vec<Reading>, Option<FeedError>) {
        let skipped = self.first_error.map(|first| FeedError::Skipped {
            count: self.skipped,
            first,
        });
        (self.readings, skipped)
    }
}

/// Parse a JSON array of readings, or newline-delimited readings.
///
/// Each document is decoded on its own, so one bad entry does not hide the
/// rest. It is an error only when the content is not JSON at all, or when
/// nothing in it could be read.
pub fn parse_readings(content: &str) -> Result<ParsedReadings, FeedError> {
    let mut parsed = ParsedReadings::default();
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        let documents: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
        for document in documents {
            parsed.push(serde_json::from_value(document));
        }
    } else {
        for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
            parsed.push(serde_json::from_str(line));
        }
    }

    if parsed.readings.is_empty() {
        if let Some(e) = parsed.first_error {
            return Err(FeedError::Parse(e));
        }
    }
    Ok(parsed)
}

impl Feed for FileFeed {
    fn poll(&mut self) -> bool {
        let current_modified = self.get_modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, always read
            (Some(_), None) => false, // File disappeared, keep what we have
            (Some(last), Some(current)) => current > last,
        };

        if !file_changed {
            return false;
        }

        match self.read_file() {
            Ok(parsed) => {
                let (readings, skipped) = parsed.into_parts();
                debug!(path = %self.path.display(), count = readings.len(), "Loaded readings file");
                self.last_error = skipped.map(|e| e.to_string());
                self.last_modified = current_modified;
                self.store.replace_all(readings);
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load readings file");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

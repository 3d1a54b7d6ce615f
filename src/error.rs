//! Error types for the library layer.

use thiserror::Error;

/// Errors returned by a [`ReadingStore`](crate::store::ReadingStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has been shut down and accepts no new subscriptions.
    #[error("Store is closed")]
    Closed,

    /// The query bounds are inverted.
    #[error("Invalid range: start is after end")]
    InvalidRange,
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A field had a value outside its accepted format.
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Errors raised while ingesting readings.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Could not reach the reading stream.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Some documents were unreadable and left out; the rest were loaded.
    #[error("Skipped {count} malformed reading(s): {first}")]
    Skipped {
        count: usize,
        #[source]
        first: serde_json::Error,
    },

    /// The remote end closed the stream.
    #[error("Connection closed")]
    Closed,
}

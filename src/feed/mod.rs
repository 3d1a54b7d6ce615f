//! Feeds move readings from the outside world into a [`MemoryStore`].
//!
//! The dashboard subscribes to the store; feeds are the ingestion side and
//! never talk to the UI directly.
//!
//! - [`FileFeed`]: polls a JSON file and replaces the store contents on change
//! - [`StreamFeed`]: reads newline-delimited JSON readings from an async
//!   stream (TCP, stdin, ...) and appends them
//! - [`SimulatedFeed`]: generates plausible readings on an interval
//!
//! [`MemoryStore`]: crate::store::MemoryStore

mod file;
mod simulated;
mod stream;

pub use file::{parse_readings, FileFeed, ParsedReadings};
pub use simulated::{SimulatedFeed, SimulationSettings};
pub use stream::StreamFeed;

use std::fmt::Debug;

/// Trait for anything that writes readings into the store.
///
/// # Example
///
/// ```
/// use plantpulse::feed::{Feed, FileFeed};
/// use plantpulse::store::MemoryStore;
///
/// let store = MemoryStore::new("file: readings.json");
/// let mut feed = FileFeed::new("readings.json", store.clone());
/// if feed.poll() {
///     println!("Loaded {} readings", store.len());
/// }
/// ```
pub trait Feed: Send + Debug {
    /// Do any synchronous ingestion work.
    ///
    /// Returns true if the store was updated. Background feeds return false
    /// and write to the store from their own task.
    fn poll(&mut self) -> bool;

    /// Returns a human-readable description of the feed.
    fn description(&self) -> &str;

    /// The most recent ingestion error, if the feed is currently failing.
    fn error(&self) -> Option<String>;
}

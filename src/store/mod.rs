//! Reading store abstraction.
//!
//! The dashboard never reads the store directly. It opens live queries and
//! receives full result sets ("snapshots") whenever the matching data
//! changes:
//!
//! ```text
//! ReadingStore::subscribe(query) ──▶ Subscription ──poll()──▶ Vec<Reading>
//!                                         │
//!                                   unsubscribe() / drop
//! ```
//!
//! [`MemoryStore`] is the in-process implementation. Feeds in
//! [`crate::feed`] fill it from files, sockets or a simulator.

mod memory;
mod subscription;

pub use memory::MemoryStore;
pub use subscription::{SnapshotPoll, Subscription};

use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::data::Reading;
use crate::error::StoreError;

/// Sort order of a query's result set, by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A live query over the stored readings.
///
/// Bounds are inclusive on both ends. `limit` is applied after ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingQuery {
    pub order: SortOrder,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ReadingQuery {
    /// The single most recent reading.
    pub fn latest() -> Self {
        Self {
            order: SortOrder::Descending,
            start: None,
            end: None,
            limit: Some(1),
        }
    }

    /// Every reading, in the given order.
    pub fn all(order: SortOrder) -> Self {
        Self {
            order,
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Readings in `[start, end]`, oldest first.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            order: SortOrder::Ascending,
            start: Some(start),
            end: Some(end),
            limit: None,
        }
    }

    /// Readings at or after `start`, oldest first. Later inserts keep matching.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            order: SortOrder::Ascending,
            start: Some(start),
            end: None,
            limit: None,
        }
    }

    /// Check the bounds are not inverted.
    pub fn validate(&self) -> Result<(), StoreError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(StoreError::InvalidRange),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, reading: &Reading) -> bool {
        self.start.is_none_or(|start| reading.timestamp >= start)
            && self.end.is_none_or(|end| reading.timestamp <= end)
    }

    /// Evaluate the query over readings sorted oldest first.
    pub fn apply(&self, readings: &[Reading]) -> Vec<Reading> {
        let matching = readings.iter().filter(|r| self.matches(r));
        let limit = self.limit.unwrap_or(usize::MAX);
        match self.order {
            SortOrder::Ascending => matching.take(limit).cloned().collect(),
            SortOrder::Descending => matching.rev().take(limit).cloned().collect(),
        }
    }
}

/// A source of live reading queries.
///
/// Implementations deliver the complete matching result set on subscribe
/// and again after every change that affects it.
pub trait ReadingStore: Send + Sync + Debug {
    /// Open a live query.
    fn subscribe(&self, query: ReadingQuery) -> Result<Subscription, StoreError>;

    /// Returns a human-readable description of the store.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use chrono::{Duration, TimeZone};

    fn readings() -> Vec<Reading> {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (0..5)
            .map(|i| Reading::new(t0 + Duration::minutes(i)).with(Metric::Temperature, i as f64))
            .collect()
    }

    fn temps(rows: &[Reading]) -> Vec<f64> {
        rows.iter().filter_map(|r| r.value(Metric::Temperature)).collect()
    }

    #[test]
    fn test_latest_returns_newest() {
        assert_eq!(temps(&ReadingQuery::latest().apply(&readings())), vec![4.0]);
    }

    #[test]
    fn test_between_is_inclusive() {
        let rows = readings();
        let query = ReadingQuery::between(rows[1].timestamp, rows[3].timestamp);
        assert_eq!(temps(&query.apply(&rows)), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_all_descending() {
        let rows = ReadingQuery::all(SortOrder::Descending).apply(&readings());
        assert_eq!(temps(&rows), vec![4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let rows = readings();
        let query = ReadingQuery::between(rows[3].timestamp, rows[1].timestamp);
        assert!(matches!(query.validate(), Err(StoreError::InvalidRange)));
    }
}

//! In-process reading store.
//!
//! Keeps readings sorted by timestamp and pushes the full result set of
//! every registered query through a watch channel whenever it changes.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::{ReadingQuery, ReadingStore, Subscription};
use crate::data::Reading;
use crate::error::StoreError;

#[derive(Debug)]
struct Listener {
    query: ReadingQuery,
    sender: watch::Sender<Vec<Reading>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Sorted oldest first.
    readings: Vec<Reading>,
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
    closed: bool,
    /// Oldest readings beyond this count are dropped.
    retention: Option<usize>,
}

impl Inner {
    fn enforce_retention(&mut self) {
        let Some(max) = self.retention else {
            return;
        };
        let excess = self.readings.len().saturating_sub(max);
        if excess > 0 {
            self.readings.drain(..excess);
            debug!(dropped = excess, "Retention limit reached");
        }
    }

    /// Re-evaluate every query and publish the results that changed.
    fn notify(&self) {
        for (id, listener) in &self.listeners {
            let snapshot = listener.query.apply(&self.readings);
            let changed = listener.sender.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot;
                    true
                }
            });
            if changed {
                debug!(subscription = id, "Published snapshot");
            }
        }
    }
}

/// A [`ReadingStore`] held in memory.
///
/// Cloning is cheap; clones share the same readings and listeners, so a feed
/// task can write through one clone while the UI subscribes through another.
///
/// Every change re-runs each registered query over the stored readings and
/// clones the results that differ. A retention limit keeps that cost bounded
/// for feeds that run indefinitely.
///
/// # Example
///
/// ```
/// use plantpulse::store::{MemoryStore, ReadingQuery, ReadingStore, SnapshotPoll};
/// use plantpulse::data::{Metric, Reading};
///
/// let store = MemoryStore::new("memory");
/// let mut latest = store.subscribe(ReadingQuery::latest()).unwrap();
///
/// store.insert(Reading::new(chrono::Utc::now()).with(Metric::Moisture, 42.0));
///
/// match latest.poll() {
///     SnapshotPoll::Snapshot(rows) => assert_eq!(rows.len(), 1),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    description: String,
}

impl MemoryStore {
    pub fn new(description: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            description: description.to_string(),
        }
    }

    /// Keep at most `max_readings`, dropping the oldest first. `None` keeps
    /// everything.
    pub fn with_retention(self, max_readings: Option<usize>) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.retention = max_readings;
            inner.enforce_retention();
        }
        self
    }

    /// Add one reading, keeping timestamp order.
    pub fn insert(&self, reading: Reading) {
        let mut inner = self.inner.lock();
        let at = inner.readings.partition_point(|r| r.timestamp <= reading.timestamp);
        inner.readings.insert(at, reading);
        inner.enforce_retention();
        inner.notify();
    }

    /// Add many readings with a single notification.
    pub fn extend<I>(&self, readings: I)
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut inner = self.inner.lock();
        inner.readings.extend(readings);
        inner.readings.sort_by_key(|r| r.timestamp);
        inner.enforce_retention();
        inner.notify();
    }

    /// Replace the whole data set.
    pub fn replace_all(&self, mut readings: Vec<Reading>) {
        readings.sort_by_key(|r| r.timestamp);
        let mut inner = self.inner.lock();
        inner.readings = readings;
        inner.enforce_retention();
        inner.notify();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().readings.is_empty()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Shut the store down. Open subscriptions observe
    /// [`SnapshotPoll::Closed`](super::SnapshotPoll::Closed).
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.listeners.clear();
        info!(store = %self.description, "Store closed");
    }

    fn release(inner: &Weak<Mutex<Inner>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            if inner.lock().listeners.remove(&id).is_some() {
                debug!(subscription = id, "Subscription released");
            }
        }
    }
}

impl ReadingStore for MemoryStore {
    fn subscribe(&self, query: ReadingQuery) -> Result<Subscription, StoreError> {
        query.validate()?;

        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(StoreError::Closed);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let (sender, receiver) = watch::channel(query.apply(&inner.readings));
        debug!(subscription = id, ?query, "Subscription opened");
        inner.listeners.insert(id, Listener { query, sender });
        drop(inner);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(receiver, move || Self::release(&weak, id)))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use crate::store::{SnapshotPoll, SortOrder};
    use chrono::{Duration, TimeZone, Utc};

    fn at(minutes: i64) -> Reading {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Reading::new(t0 + Duration::minutes(minutes)).with(Metric::Temperature, minutes as f64)
    }

    fn snapshot(sub: &mut Subscription) -> Vec<Reading> {
        match sub.poll() {
            SnapshotPoll::Snapshot(rows) => rows,
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_delivers_current_result() {
        let store = MemoryStore::new("test");
        store.extend([at(0), at(1)]);

        let mut sub = store.subscribe(ReadingQuery::all(SortOrder::Ascending)).unwrap();
        assert_eq!(snapshot(&mut sub).len(), 2);
        assert_eq!(sub.poll(), SnapshotPoll::Idle);
    }

    #[test]
    fn test_insert_keeps_order_and_notifies() {
        let store = MemoryStore::new("test");
        let mut sub = store.subscribe(ReadingQuery::all(SortOrder::Ascending)).unwrap();
        let _ = sub.poll();

        store.insert(at(5));
        store.insert(at(2));

        let rows = snapshot(&mut sub);
        assert_eq!(rows, vec![at(2), at(5)]);
    }

    #[test]
    fn test_unaffected_query_not_notified() {
        let store = MemoryStore::new("test");
        store.insert(at(10));
        let mut latest = store.subscribe(ReadingQuery::latest()).unwrap();
        let _ = latest.poll();

        // Older than the current latest: the result set is unchanged
        store.insert(at(1));
        assert_eq!(latest.poll(), SnapshotPoll::Idle);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let store = MemoryStore::new("test");
        let mut sub = store.subscribe(ReadingQuery::latest()).unwrap();
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);

        store.insert(at(1));
        assert_eq!(sub.poll(), SnapshotPoll::Idle);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let store = MemoryStore::new("test");
        {
            let _sub = store.subscribe(ReadingQuery::latest()).unwrap();
            assert_eq!(store.listener_count(), 1);
        }
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_close_reports_closed() {
        let store = MemoryStore::new("test");
        let mut sub = store.subscribe(ReadingQuery::latest()).unwrap();
        let _ = sub.poll();

        store.close();
        assert_eq!(sub.poll(), SnapshotPoll::Closed);
        assert!(matches!(
            store.subscribe(ReadingQuery::latest()),
            Err(StoreError::Closed)
        ));
    }

    #[test]
    fn test_retention_drops_oldest() {
        let store = MemoryStore::new("test").with_retention(Some(3));
        let mut sub = store.subscribe(ReadingQuery::all(SortOrder::Ascending)).unwrap();

        store.extend([at(0), at(1), at(2)]);
        store.insert(at(3));
        store.insert(at(4));

        assert_eq!(store.len(), 3);
        assert_eq!(snapshot(&mut sub), vec![at(2), at(3), at(4)]);
    }

    #[test]
    fn test_replace_all_sorts() {
        let store = MemoryStore::new("test");
        store.replace_all(vec![at(3), at(1), at(2)]);
        let mut sub = store.subscribe(ReadingQuery::all(SortOrder::Descending)).unwrap();
        assert_eq!(snapshot(&mut sub), vec![at(3), at(2), at(1)]);
        assert_eq!(store.len(), 3);
    }
}

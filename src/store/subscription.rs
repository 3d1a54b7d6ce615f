//! Subscription handle returned by a store.

use std::fmt;

use tokio::sync::watch;

use crate::data::Reading;

/// Result of polling a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotPoll {
    /// Nothing new since the last poll (or the subscription was released).
    Idle,
    /// A fresh full result set.
    Snapshot(Vec<Reading>),
    /// The store side went away; no further snapshots will arrive.
    Closed,
}

type Release = Box<dyn FnOnce() + Send>;

/// A live query.
///
/// Holding a `Subscription` keeps the query registered with its store.
/// [`unsubscribe`](Self::unsubscribe) releases it immediately and is safe to
/// call more than once; dropping the handle does the same.
pub struct Subscription {
    receiver: Option<watch::Receiver<Vec<Reading>>>,
    release: Option<Release>,
}

impl Subscription {
    /// Wrap a snapshot receiver and the action that unregisters it.
    ///
    /// The receiver's current value is delivered on the first poll.
    pub fn new<F>(mut receiver: watch::Receiver<Vec<Reading>>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        receiver.mark_changed();
        Self {
            receiver: Some(receiver),
            release: Some(Box::new(release)),
        }
    }

    /// Check for a new snapshot without blocking.
    pub fn poll(&mut self) -> SnapshotPoll {
        let Some(receiver) = self.receiver.as_mut() else {
            return SnapshotPoll::Idle;
        };

        match receiver.has_changed() {
            Ok(true) => SnapshotPoll::Snapshot(receiver.borrow_and_update().clone()),
            Ok(false) => SnapshotPoll::Idle,
            Err(_) => SnapshotPoll::Closed,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription is released or the store closes.
    pub async fn changed(&mut self) -> Option<Vec<Reading>> {
        let receiver = self.receiver.as_mut()?;
        receiver.changed().await.ok()?;
        Some(receiver.borrow_and_update().clone())
    }

    /// Release the query. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.receiver = None;
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

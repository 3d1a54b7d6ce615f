//! Subscriber for the most recent reading.

use tracing::{info, warn};

use super::ConnectionState;
use crate::data::Reading;
use crate::error::StoreError;
use crate::store::{ReadingQuery, ReadingStore, SnapshotPoll, Subscription};

/// Tracks the newest reading in the store.
///
/// Opens a single "latest, limit 1" query. Each snapshot replaces the
/// current reading; an empty snapshot leaves it unchanged.
#[derive(Debug, Default)]
pub struct LiveReading {
    subscription: Option<Subscription>,
    current: Option<Reading>,
    connection: ConnectionState,
}

impl LiveReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the store, then release any previous subscription.
    ///
    /// On failure the previous state is kept, including a lost connection
    /// and the last reading.
    pub fn open(&mut self, store: &dyn ReadingStore) -> Result<(), StoreError> {
        let subscription = store.subscribe(ReadingQuery::latest())?;
        self.close();
        info!(store = store.description(), "Live reading subscription opened");
        self.subscription = Some(subscription);
        self.connection = ConnectionState::Live;
        Ok(())
    }

    /// Apply any pending snapshot. Returns true if the current reading changed.
    pub fn poll(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.poll() {
            SnapshotPoll::Snapshot(rows) => {
                let newest = rows.into_iter().max_by_key(|r| r.timestamp);
                match newest {
                    Some(reading) if self.current.as_ref() != Some(&reading) => {
                        self.current = Some(reading);
                        true
                    }
                    _ => false,
                }
            }
            SnapshotPoll::Idle => false,
            SnapshotPoll::Closed => {
                if self.connection != ConnectionState::Lost {
                    warn!("Live reading subscription closed by store");
                    self.connection = ConnectionState::Lost;
                }
                false
            }
        }
    }

    /// Release the subscription. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("Live reading subscription closed");
        }
        self.connection = ConnectionState::Idle;
    }

    pub fn current(&self) -> Option<&Reading> {
        self.current.as_ref()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }
}

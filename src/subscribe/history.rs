//! Subscriber for the historical window shown in the chart.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::ConnectionState;
use crate::data::duration::format_duration;
use crate::data::time::{format_local, INPUT_FORMAT};
use crate::data::Reading;
use crate::error::StoreError;
use crate::store::{ReadingQuery, ReadingStore, SnapshotPoll, SortOrder, Subscription};

/// Which readings the history covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// The last `duration`. The start is anchored at subscription time; the
    /// end stays open so newer readings keep arriving.
    Rolling(Duration),
    /// An explicit inclusive range.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Everything in the store.
    All,
}

impl HistoryWindow {
    /// Build the store query for this window as of `now`.
    ///
    /// Bounded windows are fetched oldest first. The unbounded window is
    /// fetched newest first; the subscriber reverses it.
    pub fn query(&self, now: DateTime<Utc>) -> ReadingQuery {
        match *self {
            HistoryWindow::Rolling(duration) => {
                let span = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
                let start = now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);
                ReadingQuery::since(start)
            }
            HistoryWindow::Range { start, end } => ReadingQuery::between(start, end),
            HistoryWindow::All => ReadingQuery::all(SortOrder::Descending),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            HistoryWindow::Rolling(duration) => format!("Last {}", format_duration(*duration)),
            HistoryWindow::Range { start, end } => format!(
                "{} → {}",
                format_local(start, INPUT_FORMAT),
                format_local(end, INPUT_FORMAT)
            ),
            HistoryWindow::All => "All readings".to_string(),
        }
    }
}

/// User-controlled history filter.
///
/// The rolling window wins when enabled. Otherwise an explicit range is used
/// once both ends are set, and the full history before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryFilter {
    pub rolling_enabled: bool,
    pub rolling: Duration,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn new(rolling: Duration) -> Self {
        Self {
            rolling_enabled: true,
            rolling,
            start: None,
            end: None,
        }
    }

    pub fn window(&self) -> HistoryWindow {
        if self.rolling_enabled {
            return HistoryWindow::Rolling(self.rolling);
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => HistoryWindow::Range { start, end },
            _ => HistoryWindow::All,
        }
    }
}

/// Keeps the readings of the active window, oldest first.
#[derive(Debug, Default)]
pub struct HistorySubscriber {
    window: Option<HistoryWindow>,
    order: Option<SortOrder>,
    subscription: Option<Subscription>,
    anchored_at: Option<DateTime<Utc>>,
    rows: Vec<Reading>,
    connection: ConnectionState,
}

impl HistorySubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `window`, re-subscribing if it differs from the active one.
    ///
    /// Returns true when a new subscription was opened.
    pub fn set_window(
        &mut self,
        store: &dyn ReadingStore,
        window: HistoryWindow,
    ) -> Result<bool, StoreError> {
        self.set_window_at(store, window, Utc::now())
    }

    /// As [`set_window`](Self::set_window), anchoring rolling windows at `now`.
    pub fn set_window_at(
        &mut self,
        store: &dyn ReadingStore,
        window: HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if self.window == Some(window) && self.subscription.is_some() {
            return Ok(false);
        }
        self.subscribe(store, window, now)?;
        Ok(true)
    }

    /// Re-issue the active window's query, re-anchoring rolling windows.
    pub fn refresh(&mut self, store: &dyn ReadingStore) -> Result<(), StoreError> {
        self.refresh_at(store, Utc::now())
    }

    pub fn refresh_at(
        &mut self,
        store: &dyn ReadingStore,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.window {
            Some(window) => self.subscribe(store, window, now),
            None => Ok(()),
        }
    }

    fn subscribe(
        &mut self,
        store: &dyn ReadingStore,
        window: HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = window.query(now);
        let order = query.order;
        let subscription = store.subscribe(query)?;

        // Old query and rows stay until the new one is accepted
        self.close();
        self.window = Some(window);
        info!(window = %window.describe(), "History subscription opened");

        self.order = Some(order);
        self.anchored_at = Some(now);
        self.subscription = Some(subscription);
        self.connection = ConnectionState::Live;
        Ok(())
    }

    /// Apply any pending snapshot. Returns true if the rows changed.
    pub fn poll(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.poll() {
            SnapshotPoll::Snapshot(mut rows) => {
                if self.order == Some(SortOrder::Descending) {
                    rows.reverse();
                }
                self.rows = rows;
                true
            }
            SnapshotPoll::Idle => false,
            SnapshotPoll::Closed => {
                if self.connection != ConnectionState::Lost {
                    warn!("History subscription closed by store");
                    self.connection = ConnectionState::Lost;
                }
                false
            }
        }
    }

    /// Release the subscription and clear the rows. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.rows.clear();
        self.order = None;
        self.anchored_at = None;
        self.connection = ConnectionState::Idle;
    }

    /// Readings in the window, oldest first.
    pub fn rows(&self) -> &[Reading] {
        &self.rows
    }

    pub fn window(&self) -> Option<&HistoryWindow> {
        self.window.as_ref()
    }

    /// True when a rolling window was anchored at least `max_age` before `now`.
    pub fn rolling_anchor_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let rolling = matches!(self.window, Some(HistoryWindow::Rolling(_)));
        let expired = self
            .anchored_at
            .and_then(|at| (now - at).to_std().ok())
            .is_some_and(|age| age >= max_age);
        rolling && expired && self.connection == ConnectionState::Live
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }
}

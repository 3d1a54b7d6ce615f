//! Long-lived subscribers that turn store snapshots into view state.
//!
//! - [`LiveReading`]: tracks the single most recent reading
//! - [`HistorySubscriber`]: tracks the readings inside a [`HistoryWindow`]
//!
//! Both own at most one [`Subscription`](crate::store::Subscription) at a
//! time and release it on `close()`, on re-subscription and on drop.

mod history;
mod live;

pub use history::{HistoryFilter, HistorySubscriber, HistoryWindow};
pub use live::LiveReading;

/// Whether a subscriber is receiving data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No subscription open.
    #[default]
    Idle,
    /// Subscribed and receiving snapshots.
    Live,
    /// The store closed the subscription.
    Lost,
}

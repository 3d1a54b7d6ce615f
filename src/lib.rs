//! # plantpulse
//!
//! A terminal dashboard and library for monitoring plant sensors.
//!
//! Readings (temperature, soil moisture, pressure) live in a store that
//! pushes full result sets to subscribers whenever they change. The
//! dashboard keeps two subscriptions open: one for the newest reading, which
//! drives the summary cards, the plant and the alerts, and one for a history
//! window, which drives the chart, the statistics and CSV export.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌────────┐    ┌────────────┐    ┌──────────┐    ┌─────────┐ │
//! │  │  feed  │───▶│   store    │───▶│subscribe │───▶│   app   │ │
//! │  │(ingest)│    │(snapshots) │    │(live/hist)    │ (state) │ │
//! │  └────────┘    └────────────┘    └──────────┘    └────┬────┘ │
//! │                                                       │      │
//! │                                  ┌──────────┐    ┌────▼────┐ │
//! │                                  │   data   │◀───│   ui    │ │
//! │                                  │ (derive) │    │(render) │ │
//! │                                  └──────────┘    └─────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`store`]**: [`ReadingStore`] trait, queries and scoped subscriptions,
//!   plus the in-process [`MemoryStore`]
//! - **[`feed`]**: Moves readings into the store from a file, a TCP stream
//!   or a simulator
//! - **[`subscribe`]**: [`LiveReading`] and [`HistorySubscriber`]
//! - **[`data`]**: Readings, thresholds and alerts, statistics, chart series
//! - **[`export`]**: CSV encoding of the visible history
//! - **[`app`]**, **[`events`]**, **[`ui`]**: The terminal dashboard
//! - **[`config`]**: Layered settings (file and environment)
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a readings file written by the ingestion process
//! plantpulse --file readings.json
//!
//! # Receive newline-delimited readings over TCP
//! plantpulse --connect localhost:9090
//!
//! # Demo mode
//! plantpulse --simulate
//! ```
//!
//! ### As a library
//!
//! ```
//! use plantpulse::data::{Metric, Reading, ThresholdTable};
//! use plantpulse::store::MemoryStore;
//! use plantpulse::subscribe::LiveReading;
//!
//! let store = MemoryStore::new("memory");
//! let mut live = LiveReading::new();
//! live.open(&store).unwrap();
//!
//! store.insert(Reading::new(chrono::Utc::now()).with(Metric::Temperature, 35.0));
//! live.poll();
//!
//! let alerts = ThresholdTable::default().evaluate(&live.current().unwrap().sensors);
//! assert_eq!(alerts[0].message, "Temperature (°C) is too high! (35)");
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod export;
pub mod feed;
pub mod store;
pub mod subscribe;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{Alert, Metric, Reading, ThresholdTable};
pub use error::{ConfigError, FeedError, StoreError};
pub use feed::{Feed, FileFeed, SimulatedFeed, StreamFeed};
pub use store::{MemoryStore, ReadingStore, Subscription};
pub use subscribe::{HistorySubscriber, HistoryWindow, LiveReading};

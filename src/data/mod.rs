//! Data models and derived values for the dashboard.
//!
//! ## Submodules
//!
//! - [`reading`]: [`Reading`], [`Metric`] and timestamp normalization
//! - [`thresholds`]: Threshold rules and alert evaluation
//! - [`stats`]: Min/max/avg over the history window
//! - [`dashboard`]: Cards, plant height, chart series and viewport
//! - [`duration`]: Parsing and formatting of window strings (e.g. "3h")
//! - [`time`]: Local-time formatting, date input parsing, day/night phase
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot (Vec<Reading>)
//!        │
//!        ├──▶ ThresholdTable::evaluate()   (latest reading → alerts)
//!        ├──▶ compose_cards()              (latest reading → cards)
//!        ├──▶ HistoryStats::from_readings  (history → stats)
//!        └──▶ ChartModel::compose()        (history → chart)
//! ```

pub mod dashboard;
pub mod duration;
pub mod reading;
pub mod stats;
pub mod thresholds;
pub mod time;

pub use dashboard::{
    compose_cards, stem_height, Card, CardDefaults, ChartModel, Dataset, Viewport, Visibility,
    PLANT_MAX_HEIGHT,
};
pub use reading::{Axis, Metric, Reading, Sensors};
pub use stats::{HistoryStats, StatSummary};
pub use thresholds::{Alert, AlertKind, ThresholdRule, ThresholdTable};
pub use time::DayPhase;

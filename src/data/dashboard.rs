//! Derived display values: cards, plant height, chart series, viewport.
//!
//! Everything here is a pure function of the current reading, the history
//! rows and UI toggles. Rendering lives in [`crate::ui`].

use std::ops::Range;

use serde::Deserialize;

use super::reading::{Axis, Metric, Reading};
use super::thresholds::{AlertKind, ThresholdTable};
use super::time::{format_local, TIME_LABEL_FORMAT};

/// Maximum stem height of the plant, in moisture percent.
pub const PLANT_MAX_HEIGHT: f64 = 100.0;

/// Card order on screen.
const CARD_ORDER: [Metric; 3] = [Metric::Temperature, Metric::Pressure, Metric::Moisture];

/// Values shown on the cards until the first reading arrives.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CardDefaults {
    pub temperature: f64,
    pub moisture: f64,
    pub pressure: f64,
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            moisture: 40.0,
            pressure: 1013.0,
        }
    }
}

impl CardDefaults {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Moisture => self.moisture,
            Metric::Pressure => self.pressure,
        }
    }
}

/// Which metrics are shown in the chart and exported to CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub temperature: bool,
    pub moisture: bool,
    pub pressure: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            temperature: true,
            moisture: true,
            pressure: true,
        }
    }
}

impl Visibility {
    pub fn is_visible(&self, metric: Metric) -> bool {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Moisture => self.moisture,
            Metric::Pressure => self.pressure,
        }
    }

    pub fn toggle(&mut self, metric: Metric) {
        let flag = match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Moisture => &mut self.moisture,
            Metric::Pressure => &mut self.pressure,
        };
        *flag = !*flag;
    }

    /// Visible metrics in display order.
    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        Metric::ALL.into_iter().filter(|m| self.is_visible(*m))
    }
}

/// A summary card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub metric: Metric,
    pub value: f64,
    /// True when the value is a fallback rather than a reading.
    pub is_default: bool,
    pub status: Option<AlertKind>,
}

impl Card {
    pub fn title(&self) -> &'static str {
        self.metric.title()
    }

    pub fn text(&self) -> String {
        format!("{}{}", self.value, self.metric.unit())
    }
}

/// Build the summary cards for the current reading.
pub fn compose_cards(
    reading: Option<&Reading>,
    defaults: &CardDefaults,
    thresholds: &ThresholdTable,
) -> Vec<Card> {
    CARD_ORDER
        .iter()
        .map(|&metric| {
            let observed = reading.and_then(|r| r.value(metric));
            let value = observed.unwrap_or_else(|| defaults.get(metric));
            Card {
                metric,
                value,
                is_default: observed.is_none(),
                status: observed.and_then(|v| thresholds.status(metric, v)),
            }
        })
        .collect()
}

/// Plant stem height for a moisture value, clamped to `0..=100`.
///
/// The plant shows the real moisture only; with no reading it is bare soil.
pub fn stem_height(moisture: Option<f64>) -> f64 {
    moisture.unwrap_or(0.0).clamp(0.0, PLANT_MAX_HEIGHT)
}

/// One chart line.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub metric: Metric,
    pub label: &'static str,
    /// One slot per chart label; gaps where the reading lacked the metric.
    pub values: Vec<Option<f64>>,
    pub color: (u8, u8, u8),
    pub axis: Axis,
}

impl Dataset {
    /// `(x, y)` points for the slots in `range`, x being the slot index.
    pub fn points(&self, range: Range<usize>) -> Vec<(f64, f64)> {
        let end = range.end.min(self.values.len());
        let start = range.start.min(end);
        self.values[start..end]
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|y| ((start + i) as f64, y)))
            .collect()
    }
}

/// Chart input: shared x labels and one dataset per visible metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartModel {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartModel {
    /// Compose the chart from chronologically ordered history rows.
    pub fn compose(rows: &[Reading], visibility: &Visibility) -> Self {
        let labels = rows
            .iter()
            .map(|r| format_local(&r.timestamp, TIME_LABEL_FORMAT))
            .collect();
        let datasets = visibility
            .metrics()
            .map(|metric| Dataset {
                metric,
                label: metric.label(),
                values: rows.iter().map(|r| r.value(metric)).collect(),
                color: metric.color(),
                axis: metric.axis(),
            })
            .collect();
        Self { labels, datasets }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn on_axis(&self, axis: Axis) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter().filter(move |d| d.axis == axis)
    }

    /// Min and max of the values on an axis within `range`.
    pub fn bounds(&self, axis: Axis, range: Range<usize>) -> Option<(f64, f64)> {
        self.on_axis(axis)
            .flat_map(|d| d.points(range.clone()))
            .map(|(_, y)| y)
            .fold(None, |acc, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
    }
}

/// Smallest number of points a fully zoomed chart shows.
const MIN_VISIBLE_POINTS: usize = 4;
const MAX_ZOOM: u32 = 64;

/// Horizontal pan and zoom over the chart's x axis.
///
/// `offset` counts points hidden to the right of the visible window, so the
/// default view follows the newest data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    zoom: u32,
    offset: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1, offset: 0 }
    }
}

impl Viewport {
    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn is_reset(&self) -> bool {
        *self == Self::default()
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 2).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 2).max(1);
    }

    /// Pan towards older data by a quarter of the visible window.
    pub fn pan_left(&mut self, len: usize) {
        let step = (self.visible_count(len) / 4).max(1);
        self.offset = (self.offset + step).min(self.max_offset(len));
    }

    /// Pan towards newer data by a quarter of the visible window.
    pub fn pan_right(&mut self, len: usize) {
        let step = (self.visible_count(len) / 4).max(1);
        self.offset = self.offset.saturating_sub(step);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Visible slot range for a chart of `len` points.
    pub fn range(&self, len: usize) -> Range<usize> {
        let count = self.visible_count(len);
        let offset = self.offset.min(self.max_offset(len));
        let end = len - offset;
        (end - count)..end
    }

    fn visible_count(&self, len: usize) -> usize {
        let zoomed = len.div_ceil(self.zoom as usize);
        zoomed.max(MIN_VISIBLE_POINTS).min(len)
    }

    fn max_offset(&self, len: usize) -> usize {
        len - self.visible_count(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn rows() -> Vec<Reading> {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        vec![
            Reading::new(t0).with(Metric::Temperature, 20.0).with(Metric::Pressure, 1000.0),
            Reading::new(t0 + Duration::minutes(1)).with(Metric::Moisture, 35.0),
            Reading::new(t0 + Duration::minutes(2))
                .with(Metric::Temperature, 22.0)
                .with(Metric::Moisture, 36.0),
        ]
    }

    #[test]
    fn test_cards_fall_back_to_defaults() {
        let cards = compose_cards(None, &CardDefaults::default(), &ThresholdTable::default());
        let values: Vec<(Metric, f64)> = cards.iter().map(|c| (c.metric, c.value)).collect();
        assert_eq!(
            values,
            vec![
                (Metric::Temperature, 25.0),
                (Metric::Pressure, 1013.0),
                (Metric::Moisture, 40.0)
            ]
        );
        assert!(cards.iter().all(|c| c.is_default && c.status.is_none()));
    }

    #[test]
    fn test_cards_use_reading_and_status() {
        let reading = Reading::new(Utc::now()).with(Metric::Temperature, 35.0);
        let cards =
            compose_cards(Some(&reading), &CardDefaults::default(), &ThresholdTable::default());
        assert_eq!(cards[0].value, 35.0);
        assert!(!cards[0].is_default);
        assert_eq!(cards[0].status, Some(AlertKind::TooHigh));
        assert_eq!(cards[0].text(), "35°C");
        assert!(cards[1].is_default);
    }

    #[test]
    fn test_stem_height_clamped() {
        assert_eq!(stem_height(Some(55.0)), 55.0);
        assert_eq!(stem_height(Some(140.0)), 100.0);
        assert_eq!(stem_height(Some(-3.0)), 0.0);
        assert_eq!(stem_height(None), 0.0);
    }

    #[test]
    fn test_chart_respects_visibility_and_axes() {
        let visibility = Visibility {
            temperature: true,
            moisture: false,
            pressure: true,
        };
        let chart = ChartModel::compose(&rows(), &visibility);
        assert_eq!(chart.len(), 3);
        let metrics: Vec<Metric> = chart.datasets.iter().map(|d| d.metric).collect();
        assert_eq!(metrics, vec![Metric::Temperature, Metric::Pressure]);
        assert_eq!(chart.on_axis(Axis::Primary).count(), 1);
        assert_eq!(chart.on_axis(Axis::Secondary).count(), 1);
        assert_eq!(chart.datasets[0].values, vec![Some(20.0), None, Some(22.0)]);
    }

    #[test]
    fn test_chart_points_skip_gaps() {
        let chart = ChartModel::compose(&rows(), &Visibility::default());
        let temperature = &chart.datasets[0];
        assert_eq!(temperature.points(0..3), vec![(0.0, 20.0), (2.0, 22.0)]);
        assert_eq!(chart.bounds(Axis::Primary, 0..3), Some((20.0, 36.0)));
    }

    #[test]
    fn test_empty_chart() {
        let chart = ChartModel::compose(&[], &Visibility::default());
        assert!(chart.is_empty());
        assert_eq!(chart.bounds(Axis::Primary, 0..0), None);
    }

    #[test]
    fn test_visibility_toggle() {
        let mut visibility = Visibility::default();
        visibility.toggle(Metric::Moisture);
        assert!(!visibility.is_visible(Metric::Moisture));
        assert_eq!(visibility.metrics().count(), 2);
    }

    #[test]
    fn test_viewport_follows_newest_data() {
        let mut viewport = Viewport::default();
        assert_eq!(viewport.range(100), 0..100);
        viewport.zoom_in();
        assert_eq!(viewport.range(100), 50..100);
        viewport.pan_left(100);
        assert_eq!(viewport.range(100), 38..88);
        viewport.pan_right(100);
        assert_eq!(viewport.range(100), 50..100);
    }

    #[test]
    fn test_viewport_small_and_empty_series() {
        let mut viewport = Viewport::default();
        for _ in 0..10 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.range(0), 0..0);
        assert_eq!(viewport.range(3), 0..3);
        assert_eq!(viewport.range(100), 96..100);
        viewport.pan_left(3);
        assert_eq!(viewport.range(3), 0..3);
    }
}

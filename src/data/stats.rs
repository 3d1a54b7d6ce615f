//! Summary statistics over the history window.

use super::reading::{Metric, Reading};

/// Placeholder shown wherever a statistic has no data.
pub const EMPTY_PLACEHOLDER: &str = "-";

/// Min, max and mean of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

impl StatSummary {
    /// Summarize a sequence of values. Returns `None` when it is empty.
    ///
    /// Callers drop absent values before calling; zero is a real reading and
    /// is included.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (min, max, sum, count) = iter.fold((first, first, first, 1usize), |acc, v| {
            (acc.0.min(v), acc.1.max(v), acc.2 + v, acc.3 + 1)
        });
        Some(Self {
            min,
            max,
            avg: sum / count as f64,
            count,
        })
    }

    /// Mean rounded to one decimal place, halves away from zero.
    pub fn avg_display(&self) -> String {
        format!("{:.1}", (self.avg * 10.0).round() / 10.0)
    }

    pub fn min_display(&self) -> String {
        self.min.to_string()
    }

    pub fn max_display(&self) -> String {
        self.max.to_string()
    }
}

/// Per-metric statistics for the current history set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStats {
    pub temperature: Option<StatSummary>,
    pub moisture: Option<StatSummary>,
    pub pressure: Option<StatSummary>,
    /// Number of readings the stats were computed from.
    pub samples: usize,
}

impl HistoryStats {
    pub fn from_readings(readings: &[Reading]) -> Self {
        let summarize =
            |metric: Metric| StatSummary::from_values(readings.iter().filter_map(|r| r.value(metric)));
        Self {
            temperature: summarize(Metric::Temperature),
            moisture: summarize(Metric::Moisture),
            pressure: summarize(Metric::Pressure),
            samples: readings.len(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&StatSummary> {
        match metric {
            Metric::Temperature => self.temperature.as_ref(),
            Metric::Moisture => self.moisture.as_ref(),
            Metric::Pressure => self.pressure.as_ref(),
        }
    }

    /// Display strings `(min, max, avg)` for a metric, placeholders when empty.
    pub fn display(&self, metric: Metric) -> (String, String, String) {
        match self.get(metric) {
            Some(s) => (s.min_display(), s.max_display(), s.avg_display()),
            None => (
                EMPTY_PLACEHOLDER.to_string(),
                EMPTY_PLACEHOLDER.to_string(),
                EMPTY_PLACEHOLDER.to_string(),
            ),
        }
    }
}

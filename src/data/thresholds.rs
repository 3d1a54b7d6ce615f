//! Threshold rules and alert evaluation.
//!
//! The rule table is a plain value handed to whoever evaluates readings,
//! so tests and deployments can swap it without touching globals.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::reading::{Metric, Sensors};

/// Allowed range for one metric. Either bound may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub metric: Metric,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub label: String,
}

impl ThresholdRule {
    pub fn new(metric: Metric, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            metric,
            min,
            max,
            label: metric.label().to_string(),
        }
    }

    /// Classify a value against this rule. Comparisons are strict: a value
    /// equal to `min` or `max` is in range.
    pub fn check(&self, value: f64) -> Option<AlertKind> {
        if self.min.is_some_and(|min| value < min) {
            Some(AlertKind::TooLow)
        } else if self.max.is_some_and(|max| value > max) {
            Some(AlertKind::TooHigh)
        } else {
            None
        }
    }
}

/// Ordered set of rules. Alerts are emitted in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    rules: Vec<ThresholdRule>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::new(vec![
            ThresholdRule::new(Metric::Temperature, Some(18.0), Some(30.0)),
            ThresholdRule::new(Metric::Moisture, Some(20.0), Some(80.0)),
            ThresholdRule::new(Metric::Pressure, Some(980.0), Some(1050.0)),
        ])
    }
}

impl ThresholdTable {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// First rule configured for a metric.
    pub fn rule(&self, metric: Metric) -> Option<&ThresholdRule> {
        self.rules.iter().find(|r| r.metric == metric)
    }

    /// Range status of a single value, used to colour cards.
    pub fn status(&self, metric: Metric, value: f64) -> Option<AlertKind> {
        self.rule(metric).and_then(|rule| rule.check(value))
    }

    /// Evaluate the current readings against every rule.
    pub fn evaluate(&self, sensors: &Sensors) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let value = sensors.get(rule.metric)?;
                let kind = rule.check(value)?;
                Some(Alert::new(rule, kind, value))
            })
            .collect()
    }
}

/// Direction of a threshold violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    TooLow,
    TooHigh,
}

impl AlertKind {
    fn phrase(&self) -> &'static str {
        match self {
            AlertKind::TooLow => "too low",
            AlertKind::TooHigh => "too high",
        }
    }
}

/// A single out-of-range condition for the current reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub metric: Metric,
    pub kind: AlertKind,
    pub value: f64,
    pub message: String,
}

impl Alert {
    fn new(rule: &ThresholdRule, kind: AlertKind, value: f64) -> Self {
        Self {
            metric: rule.metric,
            kind,
            value,
            message: format!("{} is {}! ({})", rule.label, kind.phrase(), value),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensors(temperature: Option<f64>, moisture: Option<f64>, pressure: Option<f64>) -> Sensors {
        Sensors {
            temperature,
            moisture,
            pressure,
        }
    }

    #[test]
    fn test_boundaries_are_not_violations() {
        let table = ThresholdTable::default();
        assert!(table.evaluate(&sensors(Some(18.0), Some(20.0), Some(980.0))).is_empty());
        assert!(table.evaluate(&sensors(Some(30.0), Some(80.0), Some(1050.0))).is_empty());
    }

    #[test]
    fn test_low_temperature_alert() {
        let table = ThresholdTable::default();
        let alerts = table.evaluate(&sensors(Some(5.0), None, None));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::TooLow);
        assert_eq!(alerts[0].message, "Temperature (°C) is too low! (5)");
        assert!(alerts[0].to_string().contains('5'));
    }

    #[test]
    fn test_high_alert_keeps_fraction() {
        let table = ThresholdTable::default();
        let alerts = table.evaluate(&sensors(None, Some(85.5), None));
        assert_eq!(alerts[0].message, "Soil Moisture (%) is too high! (85.5)");
    }

    #[test]
    fn test_absent_values_skipped() {
        let table = ThresholdTable::default();
        assert!(table.evaluate(&Sensors::default()).is_empty());
    }

    #[test]
    fn test_alerts_follow_rule_order() {
        let table = ThresholdTable::new(vec![
            ThresholdRule::new(Metric::Pressure, Some(980.0), None),
            ThresholdRule::new(Metric::Temperature, None, Some(30.0)),
        ]);
        let alerts = table.evaluate(&sensors(Some(40.0), None, Some(900.0)));
        let metrics: Vec<Metric> = alerts.iter().map(|a| a.metric).collect();
        assert_eq!(metrics, vec![Metric::Pressure, Metric::Temperature]);
    }

    #[test]
    fn test_one_sided_rules() {
        let rule = ThresholdRule::new(Metric::Moisture, Some(30.0), None);
        assert_eq!(rule.check(10.0), Some(AlertKind::TooLow));
        assert_eq!(rule.check(1_000.0), None);
    }

    #[test]
    fn test_status_for_unconfigured_metric() {
        let table = ThresholdTable::new(vec![ThresholdRule::new(
            Metric::Temperature,
            Some(10.0),
            Some(30.0),
        )]);
        assert_eq!(table.status(Metric::Pressure, 0.0), None);
        assert_eq!(table.status(Metric::Temperature, 31.0), Some(AlertKind::TooHigh));
    }
}

//! Sensor readings and the metrics they carry.
//!
//! Readings arrive from the store in whatever shape the ingestion process
//! wrote them. Timestamps are normalized here, at the boundary, into a
//! single `DateTime<Utc>`; every other module works with that type only.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// One of the three monitored sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Moisture,
    Pressure,
}

/// Which y-axis a metric is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Left axis, shared by temperature and moisture.
    Primary,
    /// Right axis, pressure only.
    Secondary,
}

impl Metric {
    /// All metrics in display order.
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Moisture, Metric::Pressure];

    /// Field name used in stored documents and configuration.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Moisture => "moisture",
            Metric::Pressure => "pressure",
        }
    }

    /// Label with unit, used for chart series and alert messages.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature (°C)",
            Metric::Moisture => "Soil Moisture (%)",
            Metric::Pressure => "Pressure (hPa)",
        }
    }

    /// Short title for summary cards.
    pub fn title(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Moisture => "Soil Moisture",
            Metric::Pressure => "Pressure",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Moisture => "%",
            Metric::Pressure => "hPa",
        }
    }

    /// Column header in CSV exports.
    pub fn csv_header(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Moisture => "Moisture",
            Metric::Pressure => "Pressure",
        }
    }

    /// Series colour as an RGB triple.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Metric::Temperature => (0xef, 0x44, 0x44),
            Metric::Moisture => (0x3b, 0x82, 0xf6),
            Metric::Pressure => (0x10, 0xb9, 0x81),
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Metric::Temperature | Metric::Moisture => Axis::Primary,
            Metric::Pressure => Axis::Secondary,
        }
    }
}

/// The sensor block of a reading. Every channel is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl Sensors {
    /// Value for a metric, if present and finite.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::Temperature => self.temperature,
            Metric::Moisture => self.moisture,
            Metric::Pressure => self.pressure,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Moisture => &mut self.moisture,
            Metric::Pressure => &mut self.pressure,
        };
        *slot = value.filter(|v| v.is_finite());
    }
}

/// A point-in-time sensor sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable_sensors")]
    pub sensors: Sensors,
}

impl Reading {
    /// Create a reading with no sensor values.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            sensors: Sensors::default(),
        }
    }

    /// Builder-style setter for a single metric.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.sensors.set(metric, Some(value));
        self
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.sensors.get(metric)
    }
}

/// Timestamp encodings seen in stored documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    /// Epoch milliseconds.
    Millis(i64),
    /// Epoch milliseconds written as a float.
    FractionalMillis(f64),
    /// RFC 3339 text.
    Text(String),
    /// Store-native `{seconds, nanoseconds}` object.
    Native {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawTimestamp::deserialize(deserializer)?;
    let parsed = match raw {
        RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
        RawTimestamp::FractionalMillis(ms) if ms.is_finite() => {
            Utc.timestamp_millis_opt(ms.round() as i64).single()
        }
        RawTimestamp::FractionalMillis(_) => None,
        RawTimestamp::Text(text) => {
            DateTime::parse_from_rfc3339(&text).ok().map(|dt| dt.with_timezone(&Utc))
        }
        RawTimestamp::Native {
            seconds,
            nanoseconds,
        } => Utc.timestamp_opt(seconds, nanoseconds).single(),
    };
    parsed.ok_or_else(|| D::Error::custom("timestamp out of range or malformed"))
}

/// A `null` sensor block reads as one with no values.
fn nullable_sensors<'de, D>(deserializer: D) -> Result<Sensors, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Sensors>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any JSON value, keeping only finite numbers.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

//! Layered settings.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables prefixed `PLANTPULSE`, with `__` between
//!    sections, e.g. `PLANTPULSE__DASHBOARD__ROLLING_WINDOW=6h`

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::data::duration::parse_duration;
use crate::data::time::DEFAULT_TIMESTAMP_FORMAT;
use crate::data::{CardDefaults, ThresholdTable};
use crate::error::ConfigError;
use crate::export::DEFAULT_FILE_NAME;
use crate::ui::ThemeMode;

const ENV_PREFIX: &str = "PLANTPULSE";

/// About a week of readings at one per ten seconds.
const DEFAULT_MAX_READINGS: usize = 60_000;

/// Connection parameters for the reading store. Opaque to the dashboard.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub collection: String,
    /// Readings kept in memory before the oldest are dropped.
    pub max_readings: Option<usize>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: None,
            collection: "mqtt_data".to_string(),
            max_readings: Some(DEFAULT_MAX_READINGS),
        }
    }
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("collection", &self.collection)
            .field("max_readings", &self.max_readings)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Rolling history window, e.g. "3h".
    pub rolling_window: String,
    /// Start with the rolling window enabled.
    pub rolling_enabled: bool,
    /// How often the file feed is checked, e.g. "1s".
    pub refresh_interval: String,
    /// Card values shown before the first reading.
    pub defaults: CardDefaults,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            rolling_window: "3h".to_string(),
            rolling_enabled: true,
            refresh_interval: "1s".to_string(),
            defaults: CardDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Where the `e` key writes the CSV.
    pub path: PathBuf,
    /// strftime pattern for the timestamp column, rendered in local time.
    pub timestamp_format: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE_NAME),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Root settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub dashboard: DashboardSettings,
    pub thresholds: ThresholdTable,
    pub export: ExportSettings,
    pub theme: ThemeMode,
}

impl Settings {
    /// Load settings from the optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.rolling_window()?;
        self.refresh_interval()?;
        if self.store.max_readings == Some(0) {
            return Err(ConfigError::Invalid {
                field: "store.max_readings",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn rolling_window(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.dashboard.rolling_window).map_err(|e| ConfigError::Invalid {
            field: "dashboard.rolling_window",
            message: e.to_string(),
        })
    }

    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.dashboard.refresh_interval).map_err(|e| ConfigError::Invalid {
            field: "dashboard.refresh_interval",
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store.collection, "mqtt_data");
        assert_eq!(settings.store.max_readings, Some(60_000));
        assert_eq!(settings.rolling_window().unwrap(), Duration::from_secs(3 * 3600));
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(1));
        assert!(settings.dashboard.rolling_enabled);
        assert_eq!(settings.dashboard.defaults, CardDefaults::default());
        assert_eq!(settings.thresholds, ThresholdTable::default());
        assert_eq!(settings.export.path, PathBuf::from("plantpulse_data.csv"));
        assert_eq!(settings.theme, ThemeMode::Clock);
    }

    #[test]
    fn test_load_from_file() {
        let file = toml_file(
            r#"
            theme = "dark"

            [dashboard]
            rolling_window = "90m"

            [dashboard.defaults]
            moisture = 55.0

            [[thresholds]]
            metric = "moisture"
            min = 30.0
            label = "Soil"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.rolling_window().unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(settings.dashboard.defaults.moisture, 55.0);
        assert_eq!(settings.dashboard.defaults.temperature, 25.0);
        assert_eq!(settings.thresholds.rules().len(), 1);
        assert_eq!(settings.thresholds.rules()[0].metric, Metric::Moisture);
        assert_eq!(settings.thresholds.rules()[0].max, None);
        assert_eq!(settings.theme, ThemeMode::Dark);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let file = toml_file("[dashboard]\nrolling_window = \"soon\"\n");
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("dashboard.rolling_window"));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let file = toml_file("[store]\nmax_readings = 0\n");
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("store.max_readings"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/plantpulse.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_api_key_redacted() {
        let settings = StoreSettings {
            api_key: Some("secret-key".to_string()),
            ..StoreSettings::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}

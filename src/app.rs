//! Application state and user actions.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{ExportSettings, Settings};
use crate::data::time::{format_local, parse_local, INPUT_FORMAT};
use crate::data::{
    compose_cards, stem_height, Alert, Card, CardDefaults, ChartModel, DayPhase, HistoryStats,
    Metric, Reading, ThresholdTable, Viewport, Visibility,
};
use crate::export::{encode_csv, write_csv};
use crate::feed::Feed;
use crate::store::ReadingStore;
use crate::subscribe::{ConnectionState, HistoryFilter, HistorySubscriber, LiveReading};
use crate::ui::{Theme, ThemeMode};

/// How long a status message stays on screen.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Age at which the rolling window's start is moved up to now.
const ROLLING_REANCHOR: Duration = Duration::from_secs(60);

/// Which end of the range the date input is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateField {
    #[default]
    Start,
    End,
}

/// Text state of the date range overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateInput {
    pub start: String,
    pub end: String,
    pub field: DateField,
    pub error: Option<String>,
}

impl DateInput {
    /// Pre-fill from the current filter.
    pub fn from_filter(filter: &HistoryFilter) -> Self {
        let render = |ts: Option<DateTime<Utc>>| {
            ts.map(|ts| format_local(&ts, INPUT_FORMAT)).unwrap_or_default()
        };
        Self {
            start: render(filter.start),
            end: render(filter.end),
            ..Self::default()
        }
    }

    fn active(&mut self) -> &mut String {
        match self.field {
            DateField::Start => &mut self.start,
            DateField::End => &mut self.end,
        }
    }

    pub fn push(&mut self, c: char) {
        self.active().push(c);
        self.error = None;
    }

    pub fn pop(&mut self) {
        self.active().pop();
        self.error = None;
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            DateField::Start => DateField::End,
            DateField::End => DateField::Start,
        };
    }

    /// Parse both fields. Two empty fields clear the range.
    pub fn parse(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, String> {
        let (start, end) = (self.start.trim(), self.end.trim());
        if start.is_empty() && end.is_empty() {
            return Ok(None);
        }
        if start.is_empty() || end.is_empty() {
            return Err("Enter both a start and an end date".to_string());
        }
        let start = parse_local(start).ok_or_else(|| format!("Invalid start, use {}", HINT))?;
        let end = parse_local(end).ok_or_else(|| format!("Invalid end, use {}", HINT))?;
        if start > end {
            return Err("Start is after end".to_string());
        }
        Ok(Some((start, end)))
    }
}

/// Input format shown to the user.
pub const HINT: &str = "YYYY-MM-DD HH:MM";

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub show_stats: bool,
    pub date_input: Option<DateInput>,

    store: Box<dyn ReadingStore>,
    feed: Box<dyn Feed>,
    live: LiveReading,
    history: HistorySubscriber,

    pub filter: HistoryFilter,
    pub visibility: Visibility,
    pub viewport: Viewport,
    pub thresholds: ThresholdTable,
    pub defaults: CardDefaults,
    pub export: ExportSettings,

    // Derived from the subscriptions
    pub alerts: Vec<Alert>,
    pub stats: HistoryStats,
    pub chart: ChartModel,
    pub last_update: Option<Instant>,

    pub theme: Theme,
    theme_mode: ThemeMode,
    pub phase: DayPhase,

    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app and open the live and history subscriptions.
    pub fn new(
        store: Box<dyn ReadingStore>,
        feed: Box<dyn Feed>,
        settings: &Settings,
    ) -> Result<Self> {
        let mut filter = HistoryFilter::new(settings.rolling_window()?);
        filter.rolling_enabled = settings.dashboard.rolling_enabled;

        let mut app = Self {
            running: true,
            show_help: false,
            show_stats: true,
            date_input: None,
            store,
            feed,
            live: LiveReading::new(),
            history: HistorySubscriber::new(),
            filter,
            visibility: Visibility::default(),
            viewport: Viewport::default(),
            thresholds: settings.thresholds.clone(),
            defaults: settings.dashboard.defaults,
            export: settings.export.clone(),
            alerts: Vec::new(),
            stats: HistoryStats::default(),
            chart: ChartModel::default(),
            last_update: None,
            theme: Theme::resolve(settings.theme),
            theme_mode: settings.theme,
            phase: DayPhase::now(),
            status_message: None,
        };

        app.live.open(app.store.as_ref())?;
        app.history.set_window(app.store.as_ref(), app.filter.window())?;
        info!(feed = app.feed.description(), window = %app.filter.window().describe(), "Dashboard started");
        Ok(app)
    }

    /// Returns a description of the current feed.
    pub fn source_description(&self) -> &str {
        self.feed.description()
    }

    /// Let a synchronous feed do its work.
    pub fn poll_feed(&mut self) -> bool {
        self.feed.poll()
    }

    /// Apply pending snapshots and refresh everything derived from them.
    ///
    /// Returns true if anything visible changed.
    pub fn tick(&mut self) -> bool {
        let live_changed = self.live.poll();
        if live_changed {
            self.alerts = self
                .live
                .current()
                .map(|r| self.thresholds.evaluate(&r.sensors))
                .unwrap_or_default();
            self.last_update = Some(Instant::now());
        }

        if self.history.rolling_anchor_expired(Utc::now(), ROLLING_REANCHOR) {
            if let Err(e) = self.history.refresh(self.store.as_ref()) {
                warn!(error = %e, "Failed to re-anchor rolling window");
            }
        }

        let history_changed = self.history.poll();
        if history_changed {
            self.recompute_history();
        }

        let phase = DayPhase::now();
        let phase_changed = phase != self.phase;
        if phase_changed {
            self.phase = phase;
            if self.theme_mode == ThemeMode::Clock {
                self.theme = Theme::for_phase(phase);
            }
        }

        live_changed || history_changed || phase_changed
    }

    fn recompute_history(&mut self) {
        let rows = self.history.rows();
        self.stats = HistoryStats::from_readings(rows);
        self.chart = ChartModel::compose(rows, &self.visibility);
    }

    pub fn current(&self) -> Option<&Reading> {
        self.live.current()
    }

    pub fn cards(&self) -> Vec<Card> {
        compose_cards(self.live.current(), &self.defaults, &self.thresholds)
    }

    pub fn stem_height(&self) -> f64 {
        stem_height(self.live.current().and_then(|r| r.value(Metric::Moisture)))
    }

    /// History rows, oldest first.
    pub fn rows(&self) -> &[Reading] {
        self.history.rows()
    }

    pub fn window_description(&self) -> String {
        self.history
            .window()
            .map(|w| w.describe())
            .unwrap_or_else(|| "No history".to_string())
    }

    /// Overall connection state of both subscriptions.
    pub fn connection(&self) -> ConnectionState {
        match (self.live.connection(), self.history.connection()) {
            (ConnectionState::Lost, _) | (_, ConnectionState::Lost) => ConnectionState::Lost,
            (ConnectionState::Live, _) | (_, ConnectionState::Live) => ConnectionState::Live,
            _ => ConnectionState::Idle,
        }
    }

    /// The reason the dashboard is not receiving data, if any.
    pub fn connection_error(&self) -> Option<String> {
        if let Some(err) = self.feed.error() {
            return Some(err);
        }
        match self.connection() {
            ConnectionState::Lost => Some("Store closed the subscription".to_string()),
            _ => None,
        }
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Re-subscribe the history if the filter now selects a different window.
    pub fn apply_filter(&mut self) {
        let window = self.filter.window();
        match self.history.set_window(self.store.as_ref(), window) {
            Ok(true) => {
                self.viewport.reset();
                self.recompute_history();
                self.set_status_message(format!("History: {}", window.describe()));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Failed to change history window");
                self.set_status_message(format!("History unavailable: {}", e));
            }
        }
    }

    pub fn toggle_rolling(&mut self) {
        self.filter.rolling_enabled = !self.filter.rolling_enabled;
        self.apply_filter();
    }

    /// Use an explicit range. Switches the rolling window off so the range
    /// takes effect.
    pub fn set_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.filter.start = Some(start);
        self.filter.end = Some(end);
        self.filter.rolling_enabled = false;
        self.apply_filter();
    }

    pub fn clear_range(&mut self) {
        self.filter.start = None;
        self.filter.end = None;
        self.apply_filter();
    }

    /// Re-anchor a rolling window at now and reconnect a lost live feed.
    pub fn refresh(&mut self) {
        if self.live.connection() != ConnectionState::Live {
            if let Err(e) = self.live.open(self.store.as_ref()) {
                warn!(error = %e, "Failed to reopen live reading");
            }
        }
        match self.history.refresh(self.store.as_ref()) {
            Ok(()) => {
                self.recompute_history();
                self.set_status_message("Refreshed".to_string());
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh history");
                self.set_status_message(format!("Refresh failed: {}", e));
            }
        }
    }

    pub fn toggle_metric(&mut self, metric: Metric) {
        self.visibility.toggle(metric);
        self.chart = ChartModel::compose(self.history.rows(), &self.visibility);
    }

    pub fn toggle_stats(&mut self) {
        self.show_stats = !self.show_stats;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn open_date_input(&mut self) {
        self.date_input = Some(DateInput::from_filter(&self.filter));
    }

    pub fn cancel_date_input(&mut self) {
        self.date_input = None;
    }

    /// Apply the date input, keeping the overlay open with an error if it
    /// does not parse.
    pub fn submit_date_input(&mut self) {
        let Some(input) = self.date_input.as_mut() else {
            return;
        };
        match input.parse() {
            Ok(Some((start, end))) => {
                self.date_input = None;
                self.set_range(start, end);
            }
            Ok(None) => {
                self.date_input = None;
                self.clear_range();
            }
            Err(message) => input.error = Some(message),
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn pan_left(&mut self) {
        self.viewport.pan_left(self.chart.len());
    }

    pub fn pan_right(&mut self) {
        self.viewport.pan_right(self.chart.len());
    }

    pub fn reset_viewport(&mut self) {
        self.viewport.reset();
    }

    /// Export the visible columns of the history to CSV. Returns the number
    /// of rows written.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let rows = self.history.rows();
        let csv = encode_csv(rows, &self.visibility, &self.export.timestamp_format);
        write_csv(path, &csv)?;
        Ok(rows.len())
    }

    /// Release both subscriptions and stop the main loop.
    pub fn quit(&mut self) {
        self.live.close();
        self.history.close();
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlertKind;
    use crate::store::MemoryStore;
    use crate::subscribe::HistoryWindow;

    #[derive(Debug, Default)]
    struct NullFeed {
        error: Option<String>,
    }

    impl Feed for NullFeed {
        fn poll(&mut self) -> bool {
            false
        }

        fn description(&self) -> &str {
            "null"
        }

        fn error(&self) -> Option<String> {
            self.error.clone()
        }
    }

    fn settings() -> Settings {
        Settings {
            theme: ThemeMode::Light,
            ..Settings::default()
        }
    }

    fn app_with(store: &MemoryStore) -> App {
        App::new(Box::new(store.clone()), Box::new(NullFeed::default()), &settings()).unwrap()
    }

    fn minutes_ago(m: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::minutes(m)
    }

    #[test]
    fn test_new_opens_subscriptions() {
        let store = MemoryStore::new("test");
        let app = app_with(&store);
        assert_eq!(store.listener_count(), 2);
        assert_eq!(app.connection(), ConnectionState::Live);
        assert_eq!(app.window_description(), "Last 3h");
        assert_eq!(app.source_description(), "null");
    }

    #[test]
    fn test_cards_before_first_reading() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        app.tick();
        let values: Vec<f64> = app.cards().iter().map(|c| c.value).collect();
        assert_eq!(values, vec![25.0, 1013.0, 40.0]);
        assert_eq!(app.stem_height(), 0.0);
        assert!(app.alerts.is_empty());
        assert!(app.chart.is_empty());
    }

    #[test]
    fn test_tick_derives_alerts_stats_and_chart() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        store.extend(vec![
            Reading::new(minutes_ago(10)).with(Metric::Moisture, 30.0),
            Reading::new(minutes_ago(5))
                .with(Metric::Moisture, 10.0)
                .with(Metric::Temperature, 35.0),
        ]);

        assert!(app.tick());
        assert_eq!(app.current().and_then(|r| r.value(Metric::Moisture)), Some(10.0));
        assert_eq!(app.stem_height(), 10.0);

        let kinds: Vec<(Metric, AlertKind)> = app.alerts.iter().map(|a| (a.metric, a.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (Metric::Temperature, AlertKind::TooHigh),
                (Metric::Moisture, AlertKind::TooLow)
            ]
        );

        assert_eq!(app.rows().len(), 2);
        assert_eq!(app.stats.moisture.map(|s| s.avg), Some(20.0));
        assert_eq!(app.chart.len(), 2);

        // Nothing new
        assert!(!app.tick());
    }

    #[test]
    fn test_alerts_cleared_when_back_in_range() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        store.insert(Reading::new(minutes_ago(2)).with(Metric::Temperature, 5.0));
        app.tick();
        assert_eq!(app.alerts.len(), 1);

        store.insert(Reading::new(minutes_ago(1)).with(Metric::Temperature, 21.0));
        app.tick();
        assert!(app.alerts.is_empty());
    }

    #[test]
    fn test_rolling_off_without_range_shows_everything() {
        let store = MemoryStore::new("test");
        store.extend(vec![
            Reading::new(minutes_ago(60 * 24)).with(Metric::Moisture, 50.0),
            Reading::new(minutes_ago(1)).with(Metric::Moisture, 51.0),
        ]);
        let mut app = app_with(&store);
        app.tick();
        assert_eq!(app.rows().len(), 1);

        app.toggle_rolling();
        assert!(app.rows().is_empty());
        app.tick();
        assert_eq!(app.rows().len(), 2);
        assert!(app.rows()[0].timestamp < app.rows()[1].timestamp);
        assert_eq!(app.history.window(), Some(&HistoryWindow::All));
        assert_eq!(store.listener_count(), 2);
    }

    #[test]
    fn test_range_switches_rolling_off_and_clears_rows() {
        let store = MemoryStore::new("test");
        store.extend((0..6).map(|h| Reading::new(minutes_ago(h * 60)).with(Metric::Pressure, 1000.0)));
        let mut app = app_with(&store);
        app.tick();
        assert!(!app.rows().is_empty());

        app.set_range(minutes_ago(5 * 60 + 1), minutes_ago(4 * 60 - 1));
        assert!(!app.filter.rolling_enabled);
        assert!(app.rows().is_empty());
        app.tick();
        assert_eq!(app.rows().len(), 2);

        app.clear_range();
        app.tick();
        assert_eq!(app.rows().len(), 6);
    }

    #[test]
    fn test_toggle_metric_updates_chart() {
        let store = MemoryStore::new("test");
        store.insert(Reading::new(minutes_ago(1)).with(Metric::Temperature, 20.0));
        let mut app = app_with(&store);
        app.tick();
        assert_eq!(app.chart.datasets.len(), 3);
        app.toggle_metric(Metric::Pressure);
        assert_eq!(app.chart.datasets.len(), 2);
    }

    #[test]
    fn test_export_visible_columns() {
        let store = MemoryStore::new("test");
        store.insert(
            Reading::new(minutes_ago(1))
                .with(Metric::Temperature, 21.0)
                .with(Metric::Pressure, 1001.0),
        );
        let mut app = app_with(&store);
        app.tick();
        app.toggle_metric(Metric::Moisture);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(app.export_csv(&path).unwrap(), 1);

        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Timestamp,Temperature,Pressure"));
        assert!(lines.next().unwrap().ends_with(",21,1001"));
    }

    #[test]
    fn test_store_closed_is_reported() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        app.tick();
        assert!(app.connection_error().is_none());

        store.close();
        app.tick();
        assert_eq!(app.connection(), ConnectionState::Lost);
        assert!(app.connection_error().is_some());
    }

    #[test]
    fn test_refresh_after_store_closed_keeps_last_data() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        store.insert(Reading::new(minutes_ago(5)).with(Metric::Temperature, 22.0));
        app.tick();

        store.close();
        app.tick();
        app.refresh();
        app.tick();

        assert_eq!(app.connection(), ConnectionState::Lost);
        assert!(app.connection_error().is_some());
        assert_eq!(app.rows().len(), 1);
        assert_eq!(app.current().unwrap().value(Metric::Temperature), Some(22.0));
    }

    #[test]
    fn test_feed_error_is_reported() {
        let store = MemoryStore::new("test");
        let feed = NullFeed {
            error: Some("Connection closed".to_string()),
        };
        let app = App::new(Box::new(store), Box::new(feed), &settings()).unwrap();
        assert_eq!(app.connection_error().as_deref(), Some("Connection closed"));
    }

    #[test]
    fn test_quit_releases_subscriptions() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        app.quit();
        assert!(!app.running);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_date_input_validation() {
        let mut input = DateInput::default();
        assert_eq!(input.parse(), Ok(None));

        input.start = "2024-06-01 10:00".to_string();
        assert!(input.parse().unwrap_err().contains("both"));

        input.end = "yesterday".to_string();
        assert!(input.parse().unwrap_err().contains("Invalid end"));

        input.end = "2024-05-01 10:00".to_string();
        assert_eq!(input.parse().unwrap_err(), "Start is after end");

        input.end = "2024-06-02 10:00".to_string();
        let (start, end) = input.parse().unwrap().unwrap();
        assert!(start < end);
    }

    #[test]
    fn test_date_input_editing() {
        let mut input = DateInput::default();
        input.push('2');
        input.switch_field();
        input.push('3');
        input.push('4');
        input.pop();
        assert_eq!(input.start, "2");
        assert_eq!(input.end, "3");
    }

    #[test]
    fn test_submit_invalid_date_keeps_overlay() {
        let store = MemoryStore::new("test");
        let mut app = app_with(&store);
        app.open_date_input();
        if let Some(input) = app.date_input.as_mut() {
            input.start = "nope".to_string();
            input.end = "2024-06-02 10:00".to_string();
        }
        app.submit_date_input();
        assert!(app.date_input.as_ref().and_then(|i| i.error.as_ref()).is_some());
        assert!(app.filter.rolling_enabled);
    }
}

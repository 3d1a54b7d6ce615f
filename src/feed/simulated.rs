//! Simulated sensor feed.
//!
//! Generates plausible plant readings for demos and local development, so
//! the dashboard can run without the ingestion pipeline.
//!
//! The model:
//! - temperature follows a slow day cycle around 22°C with sensor noise
//! - soil moisture dries out steadily and jumps back up when "watered"
//! - pressure wanders slowly around 1013 hPa

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Feed;
use crate::data::{Metric, Reading};
use crate::store::MemoryStore;

/// Upper bound on readings generated for the backfill.
const MAX_BACKFILL_READINGS: u32 = 2_000;

/// Timing for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Time between live readings.
    pub interval: Duration,
    /// History generated at startup, ending now.
    pub backfill: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            backfill: Duration::from_secs(6 * 3600),
        }
    }
}

/// Stateful generator behind the simulated feed.
#[derive(Debug)]
struct SensorModel {
    rng: StdRng,
    phase: f64,
    moisture: f64,
    pressure: f64,
}

impl SensorModel {
    fn new(rng: StdRng) -> Self {
        Self {
            rng,
            phase: 0.0,
            moisture: 60.0,
            pressure: 1013.0,
        }
    }

    fn noise(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * sigma
    }

    /// Advance the model by `step` and produce a reading stamped `timestamp`.
    fn next(&mut self, timestamp: DateTime<Utc>, step: Duration) -> Reading {
        let hours = step.as_secs_f64() / 3600.0;

        self.phase = (self.phase + hours * std::f64::consts::TAU / 24.0) % std::f64::consts::TAU;
        let temperature = (22.0 + self.phase.sin() * 4.0 + self.noise(0.3)).clamp(-10.0, 50.0);

        // Soil loses about 2% moisture per hour, watering restores it
        self.moisture -= hours * 2.0 + self.noise(0.05).abs();
        if self.moisture < 22.0 && self.rng.gen::<f64>() < 0.2 {
            self.moisture = self.rng.gen_range(65.0..80.0);
            debug!(moisture = self.moisture, "Simulated watering");
        }
        self.moisture = self.moisture.clamp(0.0, 100.0);

        self.pressure = (self.pressure + self.noise(0.2)).clamp(960.0, 1060.0);

        Reading::new(timestamp)
            .with(Metric::Temperature, round1(temperature))
            .with(Metric::Moisture, round1(self.moisture))
            .with(Metric::Pressure, round1(self.pressure))
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// A feed that writes simulated readings into the store.
#[derive(Debug)]
pub struct SimulatedFeed {
    description: String,
    task: JoinHandle<()>,
}

impl SimulatedFeed {
    /// Backfill history, then spawn a task producing one reading per interval.
    pub fn spawn(store: MemoryStore, settings: SimulationSettings) -> Self {
        Self::spawn_with_rng(store, settings, StdRng::from_entropy())
    }

    /// As [`spawn`](Self::spawn) with a seeded generator, for reproducible runs.
    pub fn spawn_seeded(store: MemoryStore, settings: SimulationSettings, seed: u64) -> Self {
        Self::spawn_with_rng(store, settings, StdRng::seed_from_u64(seed))
    }

    fn spawn_with_rng(store: MemoryStore, settings: SimulationSettings, rng: StdRng) -> Self {
        let interval = settings.interval.max(Duration::from_millis(10));
        let mut model = SensorModel::new(rng);

        let backfill = backfill(&mut model, Utc::now(), settings.backfill, interval);
        info!(
            count = backfill.len(),
            interval_ms = interval.as_millis() as u64,
            "Starting simulated sensor feed"
        );
        store.extend(backfill);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the backfill already covers now
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.insert(model.next(Utc::now(), interval));
            }
        });

        Self {
            description: format!("simulated: every {}ms", interval.as_millis()),
            task,
        }
    }
}

/// Generate readings covering `span` up to `now`, oldest first.
fn backfill(
    model: &mut SensorModel,
    now: DateTime<Utc>,
    span: Duration,
    interval: Duration,
) -> Vec<Reading> {
    if span.is_zero() {
        return Vec::new();
    }
    let step = interval.max(span / MAX_BACKFILL_READINGS);
    let count = (span.as_secs_f64() / step.as_secs_f64()).floor() as u32;
    let Ok(step_signed) = chrono::Duration::from_std(step) else {
        return Vec::new();
    };

    (0..=count)
        .rev()
        .filter_map(|i| {
            let ts = now.checked_sub_signed(step_signed * i as i32)?;
            Some(model.next(ts, step))
        })
        .collect()
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Feed for SimulatedFeed {
    fn poll(&mut self) -> bool {
        false
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn model() -> SensorModel {
        SensorModel::new(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_readings_stay_in_range() {
        let mut model = model();
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        for i in 0..5_000 {
            let r = model.next(t0 + chrono::Duration::minutes(i), Duration::from_secs(60));
            let moisture = r.value(Metric::Moisture).unwrap();
            let pressure = r.value(Metric::Pressure).unwrap();
            assert!((0.0..=100.0).contains(&moisture));
            assert!((960.0..=1060.0).contains(&pressure));
            assert!(r.value(Metric::Temperature).is_some());
        }
    }

    #[test]
    fn test_backfill_is_chronological_and_bounded() {
        let mut model = model();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let rows = backfill(&mut model, now, Duration::from_secs(3600), Duration::from_secs(60));
        assert_eq!(rows.len(), 61);
        assert_eq!(rows.last().unwrap().timestamp, now);
        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        let long = backfill(&mut model, now, Duration::from_secs(30 * 86_400), Duration::from_secs(1));
        assert!(long.len() <= MAX_BACKFILL_READINGS as usize + 1);
    }

    #[test]
    fn test_no_backfill() {
        let mut model = model();
        assert!(backfill(&mut model, Utc::now(), Duration::ZERO, Duration::from_secs(1)).is_empty());
    }

    #[tokio::test]
    async fn test_feed_backfills_store() {
        let store = MemoryStore::new("test");
        let settings = SimulationSettings {
            interval: Duration::from_secs(60),
            backfill: Duration::from_secs(600),
        };
        let feed = SimulatedFeed::spawn_seeded(store.clone(), settings, 1);
        assert_eq!(store.len(), 11);
        assert!(feed.description().starts_with("simulated"));
        assert!(feed.error().is_none());
    }
}

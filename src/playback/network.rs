//! Network throughput estimation.
//!
//! Keeps the last K transfer measurements inside a trailing window and
//! reports their mean throughput. Older measurements simply stop counting,
//! so the estimate decays toward the configured initial value when the
//! network goes quiet.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::PlaybackConfig;

/// Snapshot of the estimator state.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStats {
    /// Mean throughput over the window (kbps)
    pub throughput_kbps: f64,
    /// Mean latency over the window (ms), if any latency was recorded
    pub latency_ms: Option<f64>,
    /// Wall-clock time of the most recent measurement
    pub last_measurement: Option<DateTime<Utc>>,
    /// Measurements currently counted
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    value: f64,
}

/// Sliding-window throughput estimator.
#[derive(Debug, Clone)]
pub struct NetworkEstimator {
    throughput: VecDeque<Sample>,
    latency: VecDeque<Sample>,
    max_samples: usize,
    window: Duration,
    initial_kbps: f64,
    last_measurement: Option<DateTime<Utc>>,
}

impl Default for NetworkEstimator {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl NetworkEstimator {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            throughput: VecDeque::with_capacity(config.estimator_max_samples),
            latency: VecDeque::with_capacity(config.estimator_max_samples),
            max_samples: config.estimator_max_samples.max(1),
            window: Duration::from_secs(config.estimator_window_secs),
            initial_kbps: config.initial_estimate_kbps,
            last_measurement: None,
        }
    }

    /// Record a completed transfer.
    pub fn record_transfer(&mut self, bytes: u64, duration_ms: u64) {
        self.record_transfer_at(bytes, duration_ms, Instant::now());
    }

    /// Record a completed transfer observed at `at`.
    ///
    /// Zero-duration transfers carry no rate information and are ignored.
    pub fn record_transfer_at(&mut self, bytes: u64, duration_ms: u64, at: Instant) {
        if duration_ms == 0 {
            return;
        }
        let kbps = bytes as f64 * 8.0 / duration_ms as f64;
        push_sample(&mut self.throughput, Sample { at, value: kbps }, self.max_samples, self.window);
        self.last_measurement = Some(Utc::now());

        tracing::trace!(target: "network", "Transfer {} bytes in {}ms = {:.0} kbps", bytes, duration_ms, kbps);
    }

    /// Record a request round-trip latency.
    pub fn record_latency(&mut self, latency_ms: f64) {
        self.record_latency_at(latency_ms, Instant::now());
    }

    pub fn record_latency_at(&mut self, latency_ms: f64, at: Instant) {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return;
        }
        push_sample(&mut self.latency, Sample { at, value: latency_ms }, self.max_samples, self.window);
        self.last_measurement = Some(Utc::now());
    }

    /// Current throughput estimate in kbps.
    pub fn estimate_kbps(&self) -> f64 {
        self.estimate_kbps_at(Instant::now())
    }

    pub fn estimate_kbps_at(&self, now: Instant) -> f64 {
        window_mean(&self.throughput, now, self.window).unwrap_or(self.initial_kbps)
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> NetworkStats {
        NetworkStats {
            throughput_kbps: self.estimate_kbps_at(now),
            latency_ms: window_mean(&self.latency, now, self.window),
            last_measurement: self.last_measurement,
            sample_count: self
                .throughput
                .iter()
                .filter(|s| in_window(s, now, self.window))
                .count(),
        }
    }
}

fn in_window(sample: &Sample, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(sample.at) <= window
}

fn push_sample(samples: &mut VecDeque<Sample>, sample: Sample, max: usize, window: Duration) {
    samples.push_back(sample);
    while samples.len() > max {
        samples.pop_front();
    }
    while samples.front().is_some_and(|s| !in_window(s, sample.at, window)) {
        samples.pop_front();
    }
}

fn window_mean(samples: &VecDeque<Sample>, now: Instant, window: Duration) -> Option<f64> {
    let (sum, count) = samples
        .iter()
        .filter(|s| in_window(s, now, window))
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.value, n + 1));
    (count > 0).then(|| sum / count as f64)
}

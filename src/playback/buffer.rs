//! Buffer health classification.

use serde::Serialize;

use crate::config::PlaybackConfig;

/// A buffered time range reported by the player, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedRange {
    pub start: f64,
    pub end: f64,
}

impl BufferedRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    fn contains(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferStatus {
    Healthy,
    Warning,
    Emergency,
}

/// What the playback surface should do about the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferAction {
    None,
    /// Drop one quality tier for the next fetch
    Downgrade,
    /// Prefetch immediately at the lowest tier
    EmergencyPrefetch,
}

/// Buffer state at a point in time. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BufferHealth {
    pub ahead_secs: f64,
    pub target_secs: f64,
    pub status: BufferStatus,
    /// 0-100
    pub fill_percent: f64,
}

impl BufferHealth {
    pub fn recommended_action(&self) -> BufferAction {
        match self.status {
            BufferStatus::Healthy => BufferAction::None,
            BufferStatus::Warning => BufferAction::Downgrade,
            BufferStatus::Emergency => BufferAction::EmergencyPrefetch,
        }
    }
}

/// Classifies buffered-ahead time into a health state.
#[derive(Debug, Clone)]
pub struct BufferMonitor {
    emergency_secs: f64,
    warning_secs: f64,
}

impl Default for BufferMonitor {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl BufferMonitor {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            emergency_secs: config.emergency_buffer_secs,
            warning_secs: config.warning_buffer_secs,
        }
    }

    pub fn health(&self, ranges: &[BufferedRange], position: f64, target_secs: f64) -> BufferHealth {
        let ahead_secs = ranges
            .iter()
            .find(|r| r.contains(position))
            .map(|r| (r.end - position).max(0.0))
            .unwrap_or(0.0);

        let status = if ahead_secs < self.emergency_secs {
            BufferStatus::Emergency
        } else if ahead_secs < self.warning_secs {
            BufferStatus::Warning
        } else {
            BufferStatus::Healthy
        };

        let fill_percent = if target_secs > 0.0 {
            (ahead_secs / target_secs * 100.0).min(100.0)
        } else {
            100.0
        };

        BufferHealth {
            ahead_secs,
            target_secs,
            status,
            fill_percent,
        }
    }
}

//! Quality tier selection from a throughput estimate.

use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;

/// Stream quality tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps throughput to a tier, optionally with a hysteresis band.
///
/// With `hysteresis_kbps == 0` the tier follows the thresholds exactly and
/// can flip on every call when throughput sits near a boundary.
#[derive(Debug, Clone)]
pub struct BitrateSelector {
    high_kbps: f64,
    medium_kbps: f64,
    hysteresis_kbps: f64,
    current: Option<QualityTier>,
}

impl Default for BitrateSelector {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl BitrateSelector {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            high_kbps: config.high_tier_kbps,
            medium_kbps: config.medium_tier_kbps,
            hysteresis_kbps: config.hysteresis_kbps.max(0.0),
            current: None,
        }
    }

    /// Tier for a throughput, ignoring history.
    pub fn tier_for(&self, kbps: f64) -> QualityTier {
        if kbps >= self.high_kbps {
            QualityTier::High
        } else if kbps >= self.medium_kbps {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    /// Select a tier and remember it.
    pub fn select(&mut self, kbps: f64) -> QualityTier {
        let tier = match self.current {
            Some(current) if self.hysteresis_kbps > 0.0 => {
                // Upgrades must clear the threshold by the band, downgrades
                // must fall below it by the band.
                let up = self.tier_for(kbps - self.hysteresis_kbps);
                let down = self.tier_for(kbps + self.hysteresis_kbps);
                if up > current {
                    up
                } else if down < current {
                    down
                } else {
                    current
                }
            }
            _ => self.tier_for(kbps),
        };

        if self.current != Some(tier) {
            tracing::debug!(target: "network", "Quality tier -> {} at {:.0} kbps", tier, kbps);
        }
        self.current = Some(tier);
        tier
    }

    pub fn current(&self) -> Option<QualityTier> {
        self.current
    }
}

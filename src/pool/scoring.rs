//! Pool scoring.
//!
//! ```text
//! score = clamp(0, 100, 40·intent + recency + engagement)
//!
//! recency     played:     30·(1 − days_since_play/15)       ∈ [0, 30]
//!             never:      15·(1 − days_since_admission/3)   ∈ [0, 15]
//! engagement  2·plays + 0.2·completion + 5·reactions + 3·queued − 2·skips  ∈ [0, 30]
//! ```
//!
//! Deterministic. Selection-time jitter lives in the pool manager.

use chrono::{DateTime, Utc};

use super::category::IntentWeights;
use super::track::PooledTrack;

const INTENT_MAX: f64 = 40.0;
const RECENCY_MAX: f64 = 30.0;
const RECENCY_DECAY_DAYS: f64 = 15.0;
const FRESH_MAX: f64 = 15.0;
const FRESH_DECAY_DAYS: f64 = 3.0;
const ENGAGEMENT_MAX: f64 = 30.0;

fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - earlier).num_seconds() as f64 / 86_400.0).max(0.0)
}

pub fn intent_term(track: &PooledTrack, weights: &IntentWeights) -> f64 {
    (INTENT_MAX * weights.weight(track.category)).clamp(0.0, INTENT_MAX)
}

pub fn recency_term(track: &PooledTrack, now: DateTime<Utc>) -> f64 {
    match track.last_played_at {
        Some(played) => {
            let days = days_between(played, now);
            (RECENCY_MAX * (1.0 - days / RECENCY_DECAY_DAYS)).clamp(0.0, RECENCY_MAX)
        }
        None => {
            let days = days_between(track.admitted_at, now);
            (FRESH_MAX * (1.0 - days / FRESH_DECAY_DAYS)).clamp(0.0, FRESH_MAX)
        }
    }
}

pub fn engagement_term(track: &PooledTrack) -> f64 {
    let raw = 2.0 * track.play_count as f64
        + 0.2 * track.completion_rate
        + 5.0 * track.reaction_count as f64
        + 3.0 * track.queued_count as f64
        - 2.0 * track.skipped_count as f64;
    raw.clamp(0.0, ENGAGEMENT_MAX)
}

/// Compute a track's pool score.
pub fn score(track: &PooledTrack, weights: &IntentWeights, now: DateTime<Utc>) -> f64 {
    let total = intent_term(track, weights) + recency_term(track, now) + engagement_term(track);
    if total.is_nan() {
        return 0.0;
    }
    total.clamp(0.0, 100.0)
}

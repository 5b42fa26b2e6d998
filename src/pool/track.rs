//! Pooled track model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::{self, Category};

/// Where a track entered the pool from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackSource {
    Seed,
    #[default]
    UserSearch,
    RelatedExpansion,
    ExternalCurator,
    AlbumExpansion,
}

impl TrackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::UserSearch => "user-search",
            Self::RelatedExpansion => "related-expansion",
            Self::ExternalCurator => "external-curator",
            Self::AlbumExpansion => "album-expansion",
        }
    }
}

/// A track plus pool metadata.
///
/// `track_id` is stable for the life of the track; `external_id` is the
/// media reference and changes when the track is repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledTrack {
    pub track_id: String,
    pub external_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
    pub duration_secs: u32,
    pub admitted_at: DateTime<Utc>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub play_count: u32,
    /// Running mean, 0-100
    pub completion_rate: f64,
    /// Completions folded into `completion_rate`
    #[serde(default)]
    pub completion_samples: u32,
    pub reaction_count: u32,
    pub queued_count: u32,
    pub skipped_count: u32,
    pub category: Category,
    /// 0.0 - 1.0
    pub category_confidence: f64,
    /// Recomputed by rescoring; never persisted
    #[serde(skip)]
    pub score: f64,
    pub is_hot: bool,
    pub source: TrackSource,
    /// Monotonic admission counter, newer wins score ties
    #[serde(default)]
    pub admission_order: u64,
}

impl PooledTrack {
    /// Create a fresh track with a detected category.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        track_id: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        thumbnail_url: impl Into<String>,
        duration_secs: u32,
        source: TrackSource,
        admitted_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let artist = artist.into();
        let detection = category::detect(&title, &artist);
        Self {
            track_id: track_id.into(),
            external_id: external_id.into(),
            title,
            artist,
            thumbnail_url: thumbnail_url.into(),
            duration_secs,
            admitted_at,
            last_played_at: None,
            play_count: 0,
            completion_rate: 0.0,
            completion_samples: 0,
            reaction_count: 0,
            queued_count: 0,
            skipped_count: 0,
            category: detection.category,
            category_confidence: detection.confidence,
            score: 0.0,
            is_hot: true,
            source,
            admission_order: 0,
        }
    }

    /// Last play, or admission if never played.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_played_at.unwrap_or(self.admitted_at)
    }

    /// True if either identifier matches.
    pub fn matches_id(&self, id: &str) -> bool {
        self.track_id == id || self.external_id == id
    }

    /// Case-insensitive artist key used for per-artist caps.
    pub fn artist_key(&self) -> String {
        self.artist.trim().to_lowercase()
    }

    /// Fold a completion into the running mean. Non-finite rates are ignored.
    pub fn add_completion(&mut self, rate: f64) {
        if !rate.is_finite() {
            return;
        }
        let rate = rate.clamp(0.0, 100.0);
        let n = self.completion_samples as f64;
        self.completion_rate = (self.completion_rate * n + rate) / (n + 1.0);
        self.completion_samples += 1;
    }
}

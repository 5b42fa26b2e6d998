//! Engine-level inputs and reports.

use serde::Serialize;

use crate::catalog::{CatalogTrack, Suggestion};
use crate::health::VerifyRequest;
use crate::playback::{NetworkStats, QualityTier};
use crate::pool::{PoolStats, TrackSource};

/// A track offered for admission, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub media_id: Option<String>,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub source: TrackSource,
}

impl Candidate {
    /// A search hit or expansion result.
    pub fn from_catalog(track: &CatalogTrack, source: TrackSource) -> Self {
        Self {
            media_id: Some(track.id.clone()),
            title: track.title.clone(),
            artist: track.artist.clone(),
            thumbnail_url: Some(track.thumbnail_url.clone()),
            duration_secs: Some(track.duration_secs),
            source,
        }
    }

    /// A curator suggestion; carries no media reference.
    pub fn from_suggestion(suggestion: &Suggestion) -> Self {
        Self {
            media_id: None,
            title: suggestion.title.clone(),
            artist: suggestion.artist.clone(),
            thumbnail_url: None,
            duration_secs: None,
            source: TrackSource::ExternalCurator,
        }
    }

    pub(crate) fn to_request(&self) -> VerifyRequest {
        VerifyRequest {
            media_id: self.media_id.clone(),
            artist: self.artist.clone(),
            title: self.title.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// Engagement signals from the playback surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngagementEvent {
    Play,
    /// Percent of the track played, 0-100
    Completion(f64),
    Reaction,
    Queue,
    Skip,
    Like,
    Dislike,
}

impl EngagementEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Completion(_) => "completion",
            Self::Reaction => "reaction",
            Self::Queue => "queue",
            Self::Skip => "skip",
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

/// Result of feeding curator suggestions through admission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub suggested: usize,
    pub admitted: usize,
    pub rejected: usize,
}

/// One maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub rescored: usize,
    pub aged_out: usize,
    pub hot: usize,
    pub cold: usize,
    pub expired_records: usize,
}

/// Whole-engine summary for status displays.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub pool: PoolStats,
    pub prefetch_cached: usize,
    pub prefetch_in_flight: usize,
    pub network: NetworkStats,
    pub tier: QualityTier,
    pub permanent_failures: usize,
}

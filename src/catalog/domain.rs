//! Internal domain models for the media catalog.
//!
//! These types are OUR types - they don't change when the backend API changes.
//! All backend responses get converted into these types via the adapter.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::playback::QualityTier;

/// A track as returned by catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTrack {
    /// Backend media identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    pub thumbnail_url: String,
    /// View/play count reported by the backend
    pub popularity: u64,
}

/// A fetchable stream location for a media id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLocation {
    pub url: String,
    pub tier: QualityTier,
}

/// An in-progress media download.
pub struct MediaDownload {
    /// Content length if the server reported one
    pub total_bytes: Option<u64>,
    /// Body chunks in arrival order
    pub chunks: BoxStream<'static, Result<Vec<u8>, ServiceError>>,
}

impl std::fmt::Debug for MediaDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDownload")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// An unverified suggestion from the curator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub artist: String,
}

/// Reason a media reference is known to be unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotFound,
    AccessRestricted,
    EmbeddingDisabled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccessRestricted => "access_restricted",
            Self::EmbeddingDisabled => "embedding_disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "not_found" | "notfound" | "404" => Some(Self::NotFound),
            "access_restricted" | "restricted" | "403" => Some(Self::AccessRestricted),
            "embedding_disabled" | "embed_disabled" => Some(Self::EmbeddingDisabled),
            _ => None,
        }
    }
}

/// Errors returned by catalog collaborators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Access restricted: {0}")]
    AccessRestricted(String),

    #[error("Embedding disabled: {0}")]
    EmbeddingDisabled(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("API request failed: {0}")]
    Api(String),
}

impl ServiceError {
    /// The permanent failure class of this error, if it has one.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::NotFound(_) => Some(FailureReason::NotFound),
            Self::AccessRestricted(_) => Some(FailureReason::AccessRestricted),
            Self::EmbeddingDisabled(_) => Some(FailureReason::EmbeddingDisabled),
            _ => None,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.failure_reason().is_some()
    }

    /// Retryable after a short backoff. Parse errors count here since a
    /// garbled response says nothing about the media itself.
    pub fn is_transient(&self) -> bool {
        !self.is_permanent()
    }
}

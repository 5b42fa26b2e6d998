//! Trait definitions for external catalog collaborators.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses [`CatalogClient`](super::CatalogClient), while tests
//! substitute the mocks below.
//!
//! # Example
//!
//! ```ignore
//! use track_continuity::catalog::traits::SearchApi;
//!
//! async fn top_hit<S: SearchApi>(search: &S, query: &str) -> Option<CatalogTrack> {
//!     search.search(query, 1).await.ok()?.into_iter().next()
//! }
//! ```

use async_trait::async_trait;

use super::domain::{CatalogTrack, MediaDownload, ServiceError, StreamLocation, Suggestion};
use crate::playback::QualityTier;

/// Catalog search.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Search the catalog, best match first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, ServiceError>;
}

/// Media existence / stream endpoint.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Resolve a fetchable URL for a media id at the given tier.
    async fn resolve_stream(
        &self,
        media_id: &str,
        tier: QualityTier,
    ) -> Result<StreamLocation, ServiceError>;
}

/// Streaming download of a resolved media URL.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<MediaDownload, ServiceError>;
}

/// Load/fail probe for thumbnail URLs.
///
/// Callers apply their own timeout.
#[async_trait]
pub trait ThumbnailProbe: Send + Sync {
    /// Returns `true` if the URL loads as an image.
    async fn probe(&self, url: &str) -> bool;
}

/// Returns the true display title of a media id.
#[async_trait]
pub trait ContentOracle: Send + Sync {
    async fn display_title(&self, media_id: &str) -> Result<String, ServiceError>;
}

/// Untrusted source of `{title, artist}` suggestions.
#[async_trait]
pub trait Curator: Send + Sync {
    async fn suggest(&self, limit: usize) -> Result<Vec<Suggestion>, ServiceError>;
}

/// Everything the engine needs from the backend, in one bound.
pub trait Catalog: SearchApi + MediaApi + MediaDownloader + ThumbnailProbe + ContentOracle {}

impl<T> Catalog for T where T: SearchApi + MediaApi + MediaDownloader + ThumbnailProbe + ContentOracle
{}

// Implement traits for the real client

#[async_trait]
impl SearchApi for super::CatalogClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, ServiceError> {
        self.search(query, limit).await
    }
}

#[async_trait]
impl MediaApi for super::CatalogClient {
    async fn resolve_stream(
        &self,
        media_id: &str,
        tier: QualityTier,
    ) -> Result<StreamLocation, ServiceError> {
        self.resolve_stream(media_id, tier).await
    }
}

#[async_trait]
impl MediaDownloader for super::CatalogClient {
    async fn download(&self, url: &str) -> Result<MediaDownload, ServiceError> {
        self.download(url).await
    }
}

#[async_trait]
impl ThumbnailProbe for super::CatalogClient {
    async fn probe(&self, url: &str) -> bool {
        self.probe_thumbnail(url).await
    }
}

#[async_trait]
impl ContentOracle for super::CatalogClient {
    async fn display_title(&self, media_id: &str) -> Result<String, ServiceError> {
        self.display_title(media_id).await
    }
}

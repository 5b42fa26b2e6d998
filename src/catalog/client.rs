//! Catalog backend HTTP client
//!
//! Talks to the music backend for search, stream resolution and title
//! lookups, and probes thumbnail URLs directly.
//!
//! API: https://voyo-music-api.fly.dev

use std::time::Duration;

use futures::StreamExt;

use super::adapter;
use super::domain::{CatalogTrack, MediaDownload, ServiceError, StreamLocation};
use super::dto;
use crate::playback::QualityTier;

const DEFAULT_BASE_URL: &str = "https://voyo-music-api.fly.dev";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog backend client
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient {
    /// Create a new client against the production backend
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search the catalog
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, ServiceError> {
        let url = format!(
            "{}/api/search?q={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit
        );

        let response: dto::SearchResponse = self.get_json(&url, query).await?;
        let mut tracks = adapter::to_tracks(response);
        tracks.truncate(limit);

        tracing::debug!(target: "catalog", "Search '{}' returned {} results", query, tracks.len());
        Ok(tracks)
    }

    /// Resolve a stream URL for a media id at a quality tier
    pub async fn resolve_stream(
        &self,
        media_id: &str,
        tier: QualityTier,
    ) -> Result<StreamLocation, ServiceError> {
        let url = format!(
            "{}/api/stream?v={}&quality={}",
            self.base_url,
            urlencoding::encode(media_id),
            tier.as_str()
        );

        let response: dto::StreamResponse = self.get_json(&url, media_id).await?;
        Ok(StreamLocation {
            url: response.url,
            tier,
        })
    }

    /// Look up the true display title of a media id
    pub async fn display_title(&self, media_id: &str) -> Result<String, ServiceError> {
        let url = format!(
            "{}/api/info?v={}",
            self.base_url,
            urlencoding::encode(media_id)
        );

        let response: dto::InfoResponse = self.get_json(&url, media_id).await?;
        Ok(response.title)
    }

    /// Start a streaming download of a resolved media URL
    pub async fn download(&self, url: &str) -> Result<MediaDownload, ServiceError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(adapter::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(adapter::status_to_error(status, None, url));
        }

        let total_bytes = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(adapter::transport_error))
            .boxed();

        Ok(MediaDownload { total_bytes, chunks })
    }

    /// Check whether a thumbnail URL loads as an image
    pub async fn probe_thumbnail(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            return false;
        }

        let response = match self.http_client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(target: "catalog", "Thumbnail probe failed for {}: {}", url, e);
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        // Some CDNs omit content-type; treat a 2xx without one as loadable
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.starts_with("image/"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
    ) -> Result<T, ServiceError> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(adapter::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<dto::ErrorResponse>().await.ok();
            return Err(adapter::status_to_error(status, body, subject));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }
}

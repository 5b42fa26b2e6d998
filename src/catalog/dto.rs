//! Catalog backend Data Transfer Objects
//!
//! These types match EXACTLY what the backend API returns.
//! DO NOT use these types outside the catalog module - convert to domain types.
//!
//! Example search response:
//! ```json
//! {
//!   "results": [{
//!     "voyoId": "vyo_abc123",
//!     "title": "Calm Down",
//!     "artist": "Rema",
//!     "duration": 239,
//!     "thumbnail": "https://cdn.example/art/vyo_abc123.jpg",
//!     "views": 1200000
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Response from `GET /api/search`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A single search hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(rename = "voyoId")]
    pub voyo_id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    /// Uploader name, used when `artist` is missing
    #[serde(default)]
    pub channel: Option<String>,
    /// Seconds; some results report fractional durations
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
}

/// Response from `GET /api/stream`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamResponse {
    pub url: String,
}

/// Response from `GET /api/info`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfoResponse {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}

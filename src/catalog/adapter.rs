//! Adapter layer: Convert backend DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use reqwest::StatusCode;

use super::domain::{CatalogTrack, FailureReason, ServiceError};
use super::dto;

/// Convert a search response to domain tracks, dropping unusable hits.
pub fn to_tracks(response: dto::SearchResponse) -> Vec<CatalogTrack> {
    response
        .results
        .into_iter()
        .filter(|r| !r.voyo_id.trim().is_empty())
        .map(to_track)
        .collect()
}

fn to_track(result: dto::SearchResult) -> CatalogTrack {
    let artist = result
        .artist
        .filter(|a| !a.trim().is_empty())
        .or(result.channel)
        .unwrap_or_default();

    CatalogTrack {
        id: result.voyo_id,
        title: result.title,
        artist,
        duration_secs: result.duration.map(|d| d.max(0.0).round() as u32).unwrap_or(0),
        thumbnail_url: result.thumbnail.unwrap_or_default(),
        popularity: result.views.unwrap_or(0),
    }
}

/// Map a non-success status (and optional error body) to a service error.
pub fn status_to_error(status: StatusCode, body: Option<dto::ErrorResponse>, subject: &str) -> ServiceError {
    // An explicit reason in the body wins over the status code
    if let Some(reason) = body.as_ref().and_then(|b| FailureReason::parse(&b.error)) {
        let subject = subject.to_string();
        return match reason {
            FailureReason::NotFound => ServiceError::NotFound(subject),
            FailureReason::AccessRestricted => ServiceError::AccessRestricted(subject),
            FailureReason::EmbeddingDisabled => ServiceError::EmbeddingDisabled(subject),
        };
    }

    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => ServiceError::NotFound(subject.to_string()),
        StatusCode::FORBIDDEN | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
            ServiceError::AccessRestricted(subject.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::Timeout,
        _ => {
            let detail = body
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            ServiceError::Api(format!("HTTP {}: {}", status.as_u16(), detail))
        }
    }
}

/// Map a transport-level reqwest error.
pub fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else if e.is_decode() {
        ServiceError::Parse(e.to_string())
    } else {
        ServiceError::Network(e.to_string())
    }
}

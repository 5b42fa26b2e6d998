//! Test utilities and fixtures for track-continuity tests.
//!
//! Mock factories use sensible defaults; customize with struct update
//! syntax:
//!
//! ```ignore
//! let track = PooledTrack {
//!     category: Category::Gospel,
//!     ..mock_pooled_track("a")
//! };
//! ```

use chrono::Utc;

use crate::catalog::CatalogTrack;
use crate::pool::{PooledTrack, TrackSource};

/// A fresh hot track with id `id`, external id `ext-{id}`.
pub fn mock_pooled_track(id: &str) -> PooledTrack {
    PooledTrack::new(
        id,
        format!("ext-{}", id),
        format!("Track {}", id),
        "Test Artist",
        format!("https://img.test/{}.jpg", id),
        200,
        TrackSource::UserSearch,
        Utc::now(),
    )
}

/// A fresh hot track by a specific artist.
pub fn mock_track_by(id: &str, artist: &str) -> PooledTrack {
    PooledTrack {
        artist: artist.to_string(),
        ..mock_pooled_track(id)
    }
}

/// A catalog search hit.
pub fn mock_catalog_track(id: &str, title: &str, artist: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        duration_secs: 210,
        thumbnail_url: format!("https://img.test/{}.jpg", id),
        popularity: 1000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Category;

    #[test]
    fn test_mock_pooled_track_defaults() {
        let track = mock_pooled_track("a");
        assert_eq!(track.track_id, "a");
        assert_eq!(track.external_id, "ext-a");
        assert_eq!(track.category, Category::Other);
        assert!(track.is_hot);
        assert_eq!(track.play_count, 0);
    }

    #[test]
    fn test_mock_track_by() {
        let track = mock_track_by("w", "Wizkid");
        assert_eq!(track.artist, "Wizkid");
        assert_eq!(track.track_id, "w");
    }
}

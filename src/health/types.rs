//! Verification records and results.
//!
//! This module defines the core types of the verification pipeline:
//! - [`VerifyRequest`]: a candidate to verify
//! - [`VerifiedRef`]: a usable media reference
//! - [`VerificationRecord`], [`PermanentFailureRecord`], [`RetryCounter`]:
//!   pipeline bookkeeping
//! - [`HealSummary`]: batch heal results

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::FailureReason;

/// A candidate reference to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    /// Media id, absent for curator suggestions
    pub media_id: Option<String>,
    pub artist: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

impl VerifyRequest {
    /// A request with no media reference, e.g. from the curator.
    pub fn by_name(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            media_id: None,
            artist: artist.into(),
            title: title.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_media(
        media_id: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        Self {
            media_id: Some(media_id.into()),
            artist: artist.into(),
            title: title.into(),
            thumbnail_url: Some(thumbnail_url.into()),
        }
    }
}

/// A media reference that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRef {
    pub media_id: String,
    pub thumbnail_url: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: Option<u32>,
    /// True if this replaced the candidate's own reference
    pub repaired: bool,
}

/// Cached outcome for a normalized `artist|title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Resolved(VerifiedRef),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub outcome: RecordOutcome,
    pub expires_at: DateTime<Utc>,
}

/// A media id known to be unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentFailureRecord {
    pub media_id: String,
    pub reason: FailureReason,
    pub recorded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PermanentFailureRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Repair attempts for one normalized query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
}

bitflags! {
    /// What a single check observed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CheckFlags: u16 {
        /// Candidate had no media id
        const NO_MEDIA_ID = 1 << 0;
        /// Thumbnail loaded
        const THUMBNAIL_OK = 1 << 1;
        /// Thumbnail missing, broken or timed out
        const THUMBNAIL_BROKEN = 1 << 2;
        /// Oracle title matched artist or title
        const CONTENT_OK = 1 << 3;
        /// Oracle title did not match
        const CONTENT_MISMATCH = 1 << 4;
        /// Oracle failed transiently
        const ORACLE_UNAVAILABLE = 1 << 5;
        /// Media id is permanently unusable
        const PERMANENT_FAILURE = 1 << 6;
        /// Search supplied a replacement
        const REPAIRED = 1 << 7;
        /// Repair was suppressed by retry governance
        const RETRY_SUPPRESSED = 1 << 8;
    }
}

impl CheckFlags {
    /// Flags that send a candidate to repair.
    pub fn needs_repair(&self) -> bool {
        self.intersects(
            Self::NO_MEDIA_ID
                | Self::THUMBNAIL_BROKEN
                | Self::CONTENT_MISMATCH
                | Self::PERMANENT_FAILURE,
        )
    }

    /// Short human-readable reason for logs and heal reports.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.contains(Self::NO_MEDIA_ID) {
            parts.push("no media id");
        }
        if self.contains(Self::THUMBNAIL_BROKEN) {
            parts.push("thumbnail broken");
        }
        if self.contains(Self::CONTENT_MISMATCH) {
            parts.push("content mismatch");
        }
        if self.contains(Self::PERMANENT_FAILURE) {
            parts.push("permanently unavailable");
        }
        if self.contains(Self::RETRY_SUPPRESSED) {
            parts.push("retries exhausted");
        }
        if parts.is_empty() {
            "no replacement found".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Result of one check-and-repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub verified: Option<VerifiedRef>,
    pub flags: CheckFlags,
}

/// A pooled track the healer could not fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealFailure {
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub reason: String,
}

/// A replacement reference produced by the healer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRepair {
    pub track_id: String,
    pub media_id: String,
    pub thumbnail_url: String,
}

/// Batch heal results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealSummary {
    pub healed: usize,
    pub skipped_valid: usize,
    pub failed: Vec<HealFailure>,
    pub repairs: Vec<TrackRepair>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_repair() {
        assert!(!CheckFlags::THUMBNAIL_OK.union(CheckFlags::CONTENT_OK).needs_repair());
        assert!(CheckFlags::THUMBNAIL_BROKEN.needs_repair());
        assert!((CheckFlags::THUMBNAIL_OK | CheckFlags::CONTENT_MISMATCH).needs_repair());
        assert!(!CheckFlags::ORACLE_UNAVAILABLE.needs_repair());
    }

    #[test]
    fn test_describe() {
        let flags = CheckFlags::THUMBNAIL_BROKEN | CheckFlags::RETRY_SUPPRESSED;
        assert_eq!(flags.describe(), "thumbnail broken, retries exhausted");
        assert_eq!(CheckFlags::empty().describe(), "no replacement found");
    }

    #[test]
    fn test_permanent_record_expiry() {
        let now = Utc::now();
        let record = PermanentFailureRecord {
            media_id: "x".to_string(),
            reason: FailureReason::NotFound,
            recorded_at: now,
            expires_at: now + chrono::Duration::days(7),
        };
        assert!(record.is_active(now));
        assert!(!record.is_active(now + chrono::Duration::days(8)));
    }
}

//! Self-healing verification pipeline.
//!
//! Checks that a candidate's media reference is real and matches its
//! claimed artist/title, and repairs it through search when it isn't.
//!
//! # Overview
//!
//! This module provides:
//! - [`Verifier`]: verify-or-repair with result caching, permanent-failure
//!   blocking, retry governance and in-flight deduplication
//! - [`batch_heal`]: sweep pooled tracks, collecting repairs
//! - [`matching`]: normalization and content-match heuristics
//! - [`CheckFlags`]: what a single check observed
//!
//! # Example
//!
//! ```ignore
//! use track_continuity::health::{Verifier, VerifyRequest};
//!
//! let verifier = Verifier::from_catalog(config.verification.clone(), catalog);
//! if let Some(verified) = verifier.verify(VerifyRequest::by_name("Rema", "Calm Down")).await {
//!     println!("{} -> {}", verified.title, verified.media_id);
//! }
//! ```

mod cache;
mod healer;
pub mod matching;
mod types;
mod verifier;

pub use cache::{PurgeStats, VerificationCache};
pub use healer::batch_heal;
pub use types::{
    CheckFlags, CheckOutcome, HealFailure, HealSummary, PermanentFailureRecord, RecordOutcome,
    RetryCounter, TrackRepair, VerificationRecord, VerifiedRef, VerifyRequest,
};
pub use verifier::Verifier;

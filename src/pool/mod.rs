//! Scored, aging track pool.
//!
//! This module provides:
//! - [`PooledTrack`]: a track plus engagement counters and pool metadata
//! - [`PoolManager`]: hot/cold pools with admission, aging and selection
//! - [`scoring`]: the pure 0-100 relevance score
//! - [`Preferences`]: like/dislike and per-category signals feeding
//!   [`IntentWeights`]
//! - [`category`]: keyword category detection
//!
//! # Example
//!
//! ```ignore
//! let mut pool = PoolManager::new(PoolConfig::default());
//! pool.admit(track, TrackSource::UserSearch);
//! pool.record_play(&track_id);
//! pool.rescore_all(&prefs.intent_weights());
//! pool.age_out(14);
//! let next = pool.select_discovery(&current, 10);
//! ```

pub mod category;
mod manager;
mod preferences;
pub mod scoring;
mod track;

pub use category::{Category, Detection, IntentWeights};
pub use manager::{PoolManager, PoolStats};
pub use preferences::{CategorySignals, Preferences};
pub use track::{PooledTrack, TrackSource};

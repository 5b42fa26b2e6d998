//! Adaptive buffering for smooth playback.
//!
//! # Architecture
//!
//! ```text
//! transfers ──► NetworkEstimator ──► BitrateSelector ──► tier
//!                     ▲                                   │
//!                     └────────── PrefetchCache ◄─────────┘
//!
//! player ranges ──► BufferMonitor ──► BufferHealth / action
//! ```
//!
//! Every completed prefetch feeds the estimator, so tier selection tracks
//! the throughput the cache actually sees.

pub mod bitrate;
pub mod buffer;
pub mod network;
pub mod prefetch;

pub use bitrate::{BitrateSelector, QualityTier};
pub use buffer::{BufferAction, BufferHealth, BufferMonitor, BufferStatus, BufferedRange};
pub use network::{NetworkEstimator, NetworkStats};
pub use prefetch::{MediaHandle, PrefetchCache, PrefetchOutcome, PrefetchPriority, ProgressFn};

//! Batch heal: sweep pooled tracks through check-and-repair.
//!
//! Runs sequentially with a delay between tracks to stay gentle on the
//! backend. Returns repairs for the caller to apply; the pool itself is
//! never touched here.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::types::{HealFailure, HealSummary, TrackRepair, VerifyRequest};
use super::verifier::Verifier;
use crate::pool::PooledTrack;

/// Check every track, collecting repairs and failures.
///
/// Stops early if `cancel` fires; the summary covers the tracks processed
/// so far.
pub async fn batch_heal(
    verifier: &Verifier,
    tracks: &[PooledTrack],
    delay: Duration,
    cancel: &CancellationToken,
) -> HealSummary {
    let mut summary = HealSummary::default();
    info!(target: "heal", tracks = tracks.len(), "Starting batch heal");

    for (i, track) in tracks.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            break;
        }

        let request = VerifyRequest {
            media_id: Some(track.external_id.clone()),
            artist: track.artist.clone(),
            title: track.title.clone(),
            thumbnail_url: Some(track.thumbnail_url.clone()),
        };
        let outcome = verifier.heal_track(request).await;

        match outcome.verified {
            Some(verified) if verified.repaired => {
                debug!(
                    target: "heal",
                    track_id = %track.track_id,
                    old = %track.external_id,
                    new = %verified.media_id,
                    "Healed"
                );
                summary.healed += 1;
                summary.repairs.push(TrackRepair {
                    track_id: track.track_id.clone(),
                    media_id: verified.media_id,
                    thumbnail_url: verified.thumbnail_url,
                });
            }
            Some(_) => summary.skipped_valid += 1,
            None => {
                debug!(
                    target: "heal",
                    track_id = %track.track_id,
                    reason = %outcome.flags.describe(),
                    "Could not heal"
                );
                summary.failed.push(HealFailure {
                    track_id: track.track_id.clone(),
                    artist: track.artist.clone(),
                    title: track.title.clone(),
                    reason: outcome.flags.describe(),
                });
            }
        }
    }

    info!(
        target: "heal",
        healed = summary.healed,
        valid = summary.skipped_valid,
        failed = summary.failed.len(),
        "Batch heal finished"
    );
    summary
}

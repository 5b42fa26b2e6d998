//! Hot/cold track pool.
//!
//! The hot pool is the active rotation served to selection queries. The cold
//! pool holds aged-out tracks that can be recovered later; it is bounded and
//! drops its oldest entries first.
//!
//! # Invariants
//!
//! - A track id appears at most once across hot and cold combined
//! - Mutations on unknown ids are no-ops
//! - Queries on an empty pool return empty vectors

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use super::category::{Category, IntentWeights};
use super::scoring;
use super::track::{PooledTrack, TrackSource};
use crate::config::PoolConfig;

const SAME_CATEGORY_BOOST: f64 = 20.0;
const SAME_ARTIST_BOOST: f64 = 10.0;

/// Pool summary counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub hot: usize,
    pub cold: usize,
    pub mean_hot_score: f64,
    pub hot_by_category: BTreeMap<Category, usize>,
}

/// Owner of the hot and cold pools.
#[derive(Debug, Clone)]
pub struct PoolManager {
    config: PoolConfig,
    hot: Vec<PooledTrack>,
    cold: VecDeque<PooledTrack>,
    next_order: u64,
}

impl PoolManager {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            hot: Vec::new(),
            cold: VecDeque::new(),
            next_order: 0,
        }
    }

    /// Rebuild a pool from persisted tracks, dropping duplicate ids.
    pub fn from_parts(config: PoolConfig, hot: Vec<PooledTrack>, cold: Vec<PooledTrack>) -> Self {
        let mut pool = Self::new(config);
        pool.next_order = hot
            .iter()
            .chain(cold.iter())
            .map(|t| t.admission_order + 1)
            .max()
            .unwrap_or(0);

        for mut track in hot {
            if pool.contains(&track.track_id) {
                tracing::warn!(target: "pool", "Dropping duplicate hot track {}", track.track_id);
                continue;
            }
            track.is_hot = true;
            track.score = pool.config.default_score;
            pool.hot.push(track);
        }
        for track in cold {
            if pool.contains(&track.track_id) {
                tracing::warn!(target: "pool", "Dropping duplicate cold track {}", track.track_id);
                continue;
            }
            pool.push_cold(track);
        }
        pool.enforce_hot_capacity();
        pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Admit a verified track into the hot pool.
    ///
    /// Returns `false` (and changes nothing) if either of the track's ids is
    /// already pooled.
    pub fn admit(&mut self, mut track: PooledTrack, source: TrackSource) -> bool {
        if self.contains(&track.track_id) || self.contains(&track.external_id) {
            tracing::debug!(target: "pool", "Already pooled: {}", track.track_id);
            return false;
        }

        track.source = source;
        track.score = self.config.default_score;
        track.is_hot = true;
        track.admission_order = self.next_order;
        self.next_order += 1;

        tracing::debug!(
            target: "pool",
            "Admitted {} ({} - {}) as {} via {}",
            track.track_id,
            track.artist,
            track.title,
            track.category,
            source.as_str()
        );
        self.hot.push(track);
        self.enforce_hot_capacity();
        true
    }

    /// Move the lowest-ranked overflow from hot to cold.
    fn enforce_hot_capacity(&mut self) {
        if self.hot.len() <= self.config.hot_capacity {
            return;
        }
        sort_ranked(&mut self.hot);
        let overflow = self.hot.split_off(self.config.hot_capacity);
        for track in overflow {
            tracing::debug!(target: "pool", "Hot pool full, cooling {} (score {:.1})", track.track_id, track.score);
            self.push_cold(track);
        }
    }

    fn push_cold(&mut self, mut track: PooledTrack) {
        track.is_hot = false;
        self.cold.push_back(track);
        while self.cold.len() > self.config.cold_capacity {
            if let Some(dropped) = self.cold.pop_front() {
                tracing::debug!(target: "pool", "Cold pool full, dropping {}", dropped.track_id);
            }
        }
    }

    // ========================================================================
    // Engagement
    // ========================================================================

    fn find_mut(&mut self, id: &str) -> Option<&mut PooledTrack> {
        self.hot
            .iter_mut()
            .chain(self.cold.iter_mut())
            .find(|t| t.matches_id(id))
    }

    pub fn record_play(&mut self, id: &str) -> bool {
        self.record_play_at(id, Utc::now())
    }

    pub fn record_play_at(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        self.find_mut(id)
            .map(|t| {
                t.play_count += 1;
                t.last_played_at = Some(now);
            })
            .is_some()
    }

    /// Fold a completion rate (0-100) into the track's running mean.
    pub fn record_completion(&mut self, id: &str, rate: f64) -> bool {
        self.find_mut(id).map(|t| t.add_completion(rate)).is_some()
    }

    pub fn record_reaction(&mut self, id: &str) -> bool {
        self.find_mut(id).map(|t| t.reaction_count += 1).is_some()
    }

    pub fn record_queue(&mut self, id: &str) -> bool {
        self.find_mut(id).map(|t| t.queued_count += 1).is_some()
    }

    pub fn record_skip(&mut self, id: &str) -> bool {
        self.find_mut(id).map(|t| t.skipped_count += 1).is_some()
    }

    /// Point a track at a repaired media reference.
    pub fn repair_reference(&mut self, id: &str, external_id: &str, thumbnail_url: &str) -> bool {
        // The new reference must not collide with a different pooled track
        let collides = self
            .hot
            .iter()
            .chain(self.cold.iter())
            .any(|t| t.matches_id(external_id) && !t.matches_id(id));
        if collides {
            tracing::debug!(target: "pool", "Repair of {} would duplicate {}", id, external_id);
            return false;
        }

        self.find_mut(id)
            .map(|t| {
                t.external_id = external_id.to_string();
                t.thumbnail_url = thumbnail_url.to_string();
            })
            .is_some()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Recompute every hot track's score.
    pub fn rescore_all(&mut self, weights: &IntentWeights) -> usize {
        self.rescore_all_at(weights, Utc::now())
    }

    pub fn rescore_all_at(&mut self, weights: &IntentWeights, now: DateTime<Utc>) -> usize {
        for track in &mut self.hot {
            track.score = scoring::score(track, weights, now);
        }
        self.hot.len()
    }

    /// Move stale, low-scoring hot tracks to cold. Returns the number moved.
    pub fn age_out(&mut self, threshold_days: u32) -> usize {
        self.age_out_at(threshold_days, Utc::now())
    }

    pub fn age_out_at(&mut self, threshold_days: u32, now: DateTime<Utc>) -> usize {
        let cutoff_time = now - Duration::days(threshold_days as i64);
        let cutoff_score = self.config.low_score_cutoff;

        let (stale, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.hot)
            .into_iter()
            .partition(|t| t.last_activity() < cutoff_time && t.score < cutoff_score);
        self.hot = keep;

        let moved = stale.len();
        for track in stale {
            tracing::debug!(target: "pool", "Aging out {} (score {:.1})", track.track_id, track.score);
            self.push_cold(track);
        }
        moved
    }

    /// Bring up to `count` cold tracks of `category` back into rotation.
    ///
    /// Most recently cooled tracks come back first with a neutral score.
    /// Tracks `is_disliked` flags stay cold and don't count toward `count`.
    /// Returns the ids that stayed hot.
    pub fn recover_from_cold(
        &mut self,
        category: Category,
        count: usize,
        is_disliked: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        let picked: Vec<usize> = self
            .cold
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, t)| t.category == category)
            .filter(|(_, t)| {
                let disliked = is_disliked(&t.track_id) || is_disliked(&t.external_id);
                if disliked {
                    tracing::debug!(target: "pool", "Skipping disliked {} in cold recovery", t.track_id);
                }
                !disliked
            })
            .take(count)
            .map(|(i, _)| i)
            .collect();

        // Indices are descending, so earlier removals don't shift later ones
        let mut recovered: Vec<PooledTrack> =
            picked.into_iter().filter_map(|i| self.cold.remove(i)).collect();
        for track in &mut recovered {
            track.is_hot = true;
            track.score = self.config.default_score;
        }

        let ids: Vec<String> = recovered.iter().map(|t| t.track_id.clone()).collect();
        tracing::debug!(target: "pool", "Recovered {} {} tracks from cold", ids.len(), category);
        self.hot.extend(recovered);
        self.enforce_hot_capacity();
        ids.into_iter().filter(|id| self.is_hot(id)).collect()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Top hot tracks by score.
    pub fn select_hot(&self, limit: usize) -> Vec<PooledTrack> {
        ranked(self.hot.iter()).into_iter().take(limit).cloned().collect()
    }

    /// Top hot tracks of one category.
    pub fn select_for_category(&self, category: Category, limit: usize) -> Vec<PooledTrack> {
        ranked(self.hot.iter().filter(|t| t.category == category))
            .into_iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Related-but-varied picks for after `current`.
    pub fn select_discovery(&self, current: &PooledTrack, limit: usize) -> Vec<PooledTrack> {
        self.select_discovery_with_rng(current, limit, &mut rand::rng())
    }

    pub fn select_discovery_with_rng<R: Rng + ?Sized>(
        &self,
        current: &PooledTrack,
        limit: usize,
        rng: &mut R,
    ) -> Vec<PooledTrack> {
        if limit == 0 {
            return Vec::new();
        }

        let current_artist = current.artist_key();
        let jitter = self.config.discovery_jitter.max(0.0);

        let mut candidates: Vec<(f64, &PooledTrack)> = self
            .hot
            .iter()
            .filter(|t| !t.matches_id(&current.track_id) && !t.matches_id(&current.external_id))
            .map(|t| {
                let mut rank = t.score;
                if t.category == current.category {
                    rank += SAME_CATEGORY_BOOST;
                }
                if t.artist_key() == current_artist {
                    rank += SAME_ARTIST_BOOST;
                }
                if jitter > 0.0 {
                    rank += rng.random_range(0.0..jitter);
                }
                (rank, t)
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut per_artist: HashMap<String, usize> = HashMap::new();
        let mut picked = Vec::with_capacity(limit);
        let mut capped = Vec::new();
        for (_, track) in candidates {
            if picked.len() == limit {
                break;
            }
            let n = per_artist.entry(track.artist_key()).or_insert(0);
            if *n < self.config.artist_cap {
                *n += 1;
                picked.push(track);
            } else {
                capped.push(track);
            }
        }

        // Backfill only when the cap left us short
        let short = limit - picked.len();
        picked.extend(capped.into_iter().take(short));

        picked.into_iter().cloned().collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: &str) -> Option<&PooledTrack> {
        self.hot
            .iter()
            .chain(self.cold.iter())
            .find(|t| t.matches_id(id))
    }

    /// Lookup by media reference only.
    pub fn find_by_external_id(&self, external_id: &str) -> Option<&PooledTrack> {
        self.hot
            .iter()
            .chain(self.cold.iter())
            .find(|t| t.external_id == external_id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn is_hot(&self, id: &str) -> bool {
        self.hot.iter().any(|t| t.matches_id(id))
    }

    pub fn is_cold(&self, id: &str) -> bool {
        self.cold.iter().any(|t| t.matches_id(id))
    }

    pub fn hot_tracks(&self) -> &[PooledTrack] {
        &self.hot
    }

    pub fn cold_tracks(&self) -> impl Iterator<Item = &PooledTrack> {
        self.cold.iter()
    }

    pub fn hot_len(&self) -> usize {
        self.hot.len()
    }

    pub fn cold_len(&self) -> usize {
        self.cold.len()
    }

    /// Every pooled track, hot first.
    pub fn all_tracks(&self) -> Vec<PooledTrack> {
        self.hot.iter().chain(self.cold.iter()).cloned().collect()
    }

    pub fn stats(&self) -> PoolStats {
        let mut hot_by_category = BTreeMap::new();
        for t in &self.hot {
            *hot_by_category.entry(t.category).or_insert(0) += 1;
        }
        let mean_hot_score = if self.hot.is_empty() {
            0.0
        } else {
            self.hot.iter().map(|t| t.score).sum::<f64>() / self.hot.len() as f64
        };
        PoolStats {
            hot: self.hot.len(),
            cold: self.cold.len(),
            mean_hot_score,
            hot_by_category,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_score(&mut self, id: &str, score: f64) {
        if let Some(t) = self.find_mut(id) {
            t.score = score;
        }
    }
}

/// Score descending, newer admission first among equals.
fn sort_ranked(tracks: &mut [PooledTrack]) {
    tracks.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.admission_order.cmp(&a.admission_order))
    });
}

fn ranked<'a>(tracks: impl Iterator<Item = &'a PooledTrack>) -> Vec<&'a PooledTrack> {
    let mut v: Vec<&PooledTrack> = tracks.collect();
    v.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.admission_order.cmp(&a.admission_order))
    });
    v
}

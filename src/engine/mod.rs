//! The track continuity engine.
//!
//! [`Engine`] owns the pool, preferences, verifier and playback components
//! and is the API the playback/UI layer calls. It is built explicitly and
//! shared behind an `Arc`; every method takes `&self`.
//!
//! # Architecture
//!
//! ```text
//! candidates ──► Verifier ──► PoolManager ──► selection
//!                   ▲              │
//!     batch_heal ───┘              └──► PrefetchCache ◄── BitrateSelector ◄── NetworkEstimator
//! ```
//!
//! Locks are `parking_lot` mutexes and are never held across an `.await`.

mod maintenance;
mod snapshot;
mod types;

pub use maintenance::{MaintenanceCommand, MaintenanceEvent, MaintenanceWorker};
pub use snapshot::{EngineSnapshot, SNAPSHOT_VERSION};
pub use types::{Candidate, EngagementEvent, EngineStats, IngestSummary, MaintenanceReport};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Curator, FailureReason};
use crate::config::Config;
use crate::error::Result;
use crate::health::{self, HealSummary, VerifiedRef, Verifier, VerifyRequest};
use crate::playback::{
    BitrateSelector, BufferHealth, BufferMonitor, BufferedRange, NetworkEstimator, NetworkStats,
    PrefetchCache, PrefetchOutcome, PrefetchPriority, ProgressFn, QualityTier,
};
use crate::pool::{Category, PoolManager, PooledTrack, Preferences};

/// Suggestions verified concurrently during ingest.
const INGEST_CONCURRENCY: usize = 4;

pub struct Engine {
    config: Config,
    pool: Mutex<PoolManager>,
    preferences: Mutex<Preferences>,
    verifier: Verifier,
    prefetch: PrefetchCache,
    estimator: Arc<Mutex<NetworkEstimator>>,
    selector: Mutex<BitrateSelector>,
    buffer: BufferMonitor,
    maintenance_running: AtomicBool,
}

/// Clears the maintenance flag when a pass ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Engine {
    pub fn new<C: Catalog + 'static>(config: Config, catalog: Arc<C>) -> Self {
        let estimator = Arc::new(Mutex::new(NetworkEstimator::new(&config.playback)));
        let prefetch = PrefetchCache::new(
            config.playback.prefetch_capacity,
            catalog.clone(),
            catalog.clone(),
            Arc::clone(&estimator),
        );
        let verifier = Verifier::from_catalog(config.verification.clone(), catalog);

        Self {
            pool: Mutex::new(PoolManager::new(config.pool.clone())),
            preferences: Mutex::new(Preferences::default()),
            verifier,
            prefetch,
            selector: Mutex::new(BitrateSelector::new(&config.playback)),
            buffer: BufferMonitor::new(&config.playback),
            estimator,
            maintenance_running: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn prefetch_cache(&self) -> &PrefetchCache {
        &self.prefetch
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Verify a candidate and admit it to the hot pool.
    ///
    /// Returns the new track id, or `None` if the candidate was rejected or
    /// is already pooled.
    pub async fn admit_candidate(&self, candidate: Candidate) -> Option<String> {
        if let Some(id) = candidate.media_id.as_deref()
            && self.pool.lock().contains(id)
        {
            debug!(target: "pool", "Candidate {} already pooled", id);
            return None;
        }

        let verified = self.verifier.verify(candidate.to_request()).await?;
        let track = self.pooled_from(&candidate, &verified);
        let track_id = track.track_id.clone();

        if self.pool.lock().admit(track, candidate.source) {
            info!(
                target: "pool",
                "Admitted {} - {} as {}{}",
                candidate.artist,
                candidate.title,
                track_id,
                if verified.repaired { " (repaired)" } else { "" }
            );
            Some(track_id)
        } else {
            None
        }
    }

    fn pooled_from(&self, candidate: &Candidate, verified: &VerifiedRef) -> PooledTrack {
        // The original id stays the stable track id; repairs only move external_id
        let track_id = candidate
            .media_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| verified.media_id.clone());
        PooledTrack::new(
            track_id,
            verified.media_id.clone(),
            candidate.title.clone(),
            candidate.artist.clone(),
            verified.thumbnail_url.clone(),
            candidate.duration_secs.or(verified.duration_secs).unwrap_or(0),
            candidate.source,
            Utc::now(),
        )
    }

    /// Pull suggestions from the curator and admit what verifies.
    ///
    /// A failing or empty curator yields an empty summary.
    pub async fn ingest_suggestions(&self, curator: &dyn Curator, limit: usize) -> IngestSummary {
        let suggestions = match curator.suggest(limit).await {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "verify", "Curator failed: {}", e);
                return IngestSummary::default();
            }
        };

        let suggested = suggestions.len();
        let admitted = futures::stream::iter(suggestions.iter().map(Candidate::from_suggestion))
            .map(|candidate| self.admit_candidate(candidate))
            .buffer_unordered(INGEST_CONCURRENCY)
            .filter(|admitted| futures::future::ready(admitted.is_some()))
            .count()
            .await;

        info!(target: "pool", "Ingested {}/{} curator suggestions", admitted, suggested);
        IngestSummary {
            suggested,
            admitted,
            rejected: suggested - admitted,
        }
    }

    // ========================================================================
    // Engagement
    // ========================================================================

    /// Record an engagement event. Returns `false` for unknown tracks.
    pub fn record_engagement_event(&self, event: EngagementEvent, id: &str) -> bool {
        let (track_id, category) = {
            let mut pool = self.pool.lock();
            let Some(track) = pool.get(id) else {
                debug!(target: "pool", "Ignoring {} for unknown track {}", event.as_str(), id);
                return false;
            };
            let found = (track.track_id.clone(), track.category);
            match event {
                EngagementEvent::Play => pool.record_play(id),
                EngagementEvent::Completion(rate) => pool.record_completion(id, rate),
                EngagementEvent::Reaction => pool.record_reaction(id),
                EngagementEvent::Queue => pool.record_queue(id),
                EngagementEvent::Skip => pool.record_skip(id),
                EngagementEvent::Like | EngagementEvent::Dislike => true,
            };
            found
        };

        let mut prefs = self.preferences.lock();
        match event {
            EngagementEvent::Play => {}
            EngagementEvent::Completion(rate) => prefs.record_completion(category, rate),
            EngagementEvent::Reaction | EngagementEvent::Queue => prefs.record_positive(category),
            EngagementEvent::Skip => prefs.record_skip(category),
            EngagementEvent::Like => prefs.like(&track_id, category),
            EngagementEvent::Dislike => prefs.dislike(&track_id, category),
        }
        true
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.lock().clone()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_hot(&self, limit: usize) -> Vec<PooledTrack> {
        self.pool.lock().select_hot(limit)
    }

    pub fn select_for_category(&self, category: Category, limit: usize) -> Vec<PooledTrack> {
        self.pool.lock().select_for_category(category, limit)
    }

    /// Discovery picks after `current_id`; empty if the track is unknown.
    pub fn select_discovery(&self, current_id: &str, limit: usize) -> Vec<PooledTrack> {
        let pool = self.pool.lock();
        match pool.get(current_id) {
            Some(current) => {
                let current = current.clone();
                pool.select_discovery(&current, limit)
            }
            None => Vec::new(),
        }
    }

    /// Bring cold tracks of `category` back, minus disliked ones.
    pub fn recover_from_cold(&self, category: Category, count: usize) -> Vec<String> {
        let prefs = self.preferences.lock().clone();
        self.pool
            .lock()
            .recover_from_cold(category, count, |id| prefs.is_disliked(id))
    }

    pub fn track(&self, id: &str) -> Option<PooledTrack> {
        self.pool.lock().get(id).cloned()
    }

    pub fn all_tracks(&self) -> Vec<PooledTrack> {
        self.pool.lock().all_tracks()
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Record a transfer made outside the prefetch cache.
    pub fn record_transfer(&self, bytes: u64, duration_ms: u64) {
        self.estimator.lock().record_transfer(bytes, duration_ms);
    }

    pub fn record_latency(&self, latency_ms: f64) {
        self.estimator.lock().record_latency(latency_ms);
    }

    pub fn network_stats(&self) -> NetworkStats {
        self.estimator.lock().stats()
    }

    /// Tier for the next fetch, from the current throughput estimate.
    pub fn select_bitrate(&self) -> QualityTier {
        let kbps = self.estimator.lock().estimate_kbps();
        self.selector.lock().select(kbps)
    }

    pub fn buffer_health(&self, ranges: &[BufferedRange], position: f64, target_secs: f64) -> BufferHealth {
        self.buffer.health(ranges, position, target_secs)
    }

    /// Buffer health against the configured target.
    pub fn buffer_health_default(&self, ranges: &[BufferedRange], position: f64) -> BufferHealth {
        self.buffer
            .health(ranges, position, self.config.playback.target_buffer_secs)
    }

    /// Prefetch a pooled track at the currently selected tier.
    ///
    /// Returns `None` if the track isn't pooled.
    pub async fn prefetch(
        &self,
        track_id: &str,
        priority: PrefetchPriority,
        progress: Option<ProgressFn>,
    ) -> Option<PrefetchOutcome> {
        let tier = self.select_bitrate();
        self.prefetch_at(track_id, tier, priority, progress).await
    }

    /// Prefetch immediately at the lowest tier.
    pub async fn emergency_prefetch(&self, track_id: &str) -> Option<PrefetchOutcome> {
        self.prefetch_at(track_id, QualityTier::Low, PrefetchPriority::Next, None)
            .await
    }

    async fn prefetch_at(
        &self,
        track_id: &str,
        tier: QualityTier,
        priority: PrefetchPriority,
        progress: Option<ProgressFn>,
    ) -> Option<PrefetchOutcome> {
        let (track_id, media_id) = {
            let pool = self.pool.lock();
            let track = pool.get(track_id)?;
            (track.track_id.clone(), track.external_id.clone())
        };

        let outcome = self
            .prefetch
            .prefetch(&track_id, &media_id, tier, priority, progress)
            .await;
        if let PrefetchOutcome::Failed(ref e) = outcome
            && let Some(reason) = e.failure_reason()
        {
            self.verifier.mark_permanent_failure(&media_id, reason);
        }
        Some(outcome)
    }

    // ========================================================================
    // Verification
    // ========================================================================

    pub async fn verify(&self, request: VerifyRequest) -> Option<VerifiedRef> {
        self.verifier.verify(request).await
    }

    pub fn mark_permanent_failure(&self, media_id: &str, reason: FailureReason) {
        self.verifier.mark_permanent_failure(media_id, reason);
    }

    /// Sweep the whole pool through check-and-repair and apply repairs.
    pub async fn batch_heal(&self, cancel: &CancellationToken) -> HealSummary {
        let tracks = self.pool.lock().all_tracks();
        let summary = health::batch_heal(
            &self.verifier,
            &tracks,
            self.config.verification.heal_delay(),
            cancel,
        )
        .await;

        for repair in &summary.repairs {
            let applied = self.pool.lock().repair_reference(
                &repair.track_id,
                &repair.media_id,
                &repair.thumbnail_url,
            );
            if applied {
                // Cached media belongs to the old reference
                self.prefetch.remove(&repair.track_id);
            } else {
                warn!(
                    target: "heal",
                    "Could not apply repair {} -> {}",
                    repair.track_id,
                    repair.media_id
                );
            }
        }
        summary
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Rescore with current intent weights, then age out stale tracks.
    ///
    /// Returns `None` if another pass is already running.
    pub fn run_maintenance(&self) -> Option<MaintenanceReport> {
        if self
            .maintenance_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(target: "maintenance", "Pass already running, skipping");
            return None;
        }
        let _guard = PassGuard(&self.maintenance_running);

        let weights = self.preferences.lock().intent_weights();
        let (rescored, aged_out, hot, cold) = {
            let mut pool = self.pool.lock();
            let rescored = pool.rescore_all(&weights);
            let aged_out = pool.age_out(self.config.pool.age_out_days);
            (rescored, aged_out, pool.hot_len(), pool.cold_len())
        };
        let purged = self.verifier.purge_expired();

        let report = MaintenanceReport {
            rescored,
            aged_out,
            hot,
            cold,
            expired_records: purged.records + purged.permanent + purged.retries,
        };
        info!(
            target: "maintenance",
            rescored = report.rescored,
            aged_out = report.aged_out,
            hot = report.hot,
            cold = report.cold,
            "Maintenance pass complete"
        );
        Some(report)
    }

    pub fn stats(&self) -> EngineStats {
        let pool = self.pool.lock().stats();
        let network = self.network_stats();
        let tier = self
            .selector
            .lock()
            .current()
            .unwrap_or_else(|| BitrateSelector::new(&self.config.playback).tier_for(network.throughput_kbps));
        EngineStats {
            pool,
            prefetch_cached: self.prefetch.len(),
            prefetch_in_flight: self.prefetch.in_flight_count(),
            network,
            tier,
            permanent_failures: self.verifier.permanent_failures().len(),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn snapshot(&self) -> EngineSnapshot {
        let (hot, cold) = {
            let pool = self.pool.lock();
            (pool.hot_tracks().to_vec(), pool.cold_tracks().cloned().collect())
        };
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            hot,
            cold,
            preferences: self.preferences.lock().clone(),
            permanent_failures: self.verifier.permanent_failures(),
        }
    }

    /// Replace pool and preference state, then rescore.
    pub fn restore(&self, snapshot: EngineSnapshot) {
        let weights = snapshot.preferences.intent_weights();
        let mut pool = PoolManager::from_parts(self.config.pool.clone(), snapshot.hot, snapshot.cold);
        pool.rescore_all(&weights);

        let restored = self
            .verifier
            .restore_permanent_failures(snapshot.permanent_failures);
        info!(
            target: "pool",
            "Restored {} hot, {} cold, {} permanent failures",
            pool.hot_len(),
            pool.cold_len(),
            restored
        );

        *self.pool.lock() = pool;
        *self.preferences.lock() = snapshot.preferences;
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.snapshot().write_to(path)?;
        debug!(target: "pool", "Saved snapshot to {}", path.display());
        Ok(())
    }

    /// Load a snapshot. Returns `false` if there was nothing to load.
    pub fn load(&self, path: &Path) -> Result<bool> {
        match EngineSnapshot::read_from(path)? {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceError;
    use crate::catalog::traits::mocks::{MockCatalog, MockCurator};
    use crate::pool::TrackSource;
    use crate::test_utils::{mock_catalog_track, mock_pooled_track};

    fn new_engine(mock: MockCatalog) -> (Engine, Arc<MockCatalog>) {
        let mock = Arc::new(mock);
        (Engine::new(Config::default(), mock.clone()), mock)
    }

    fn essence() -> Candidate {
        Candidate::from_catalog(
            &mock_catalog_track("m1", "Essence", "Wizkid"),
            TrackSource::UserSearch,
        )
    }

    #[tokio::test]
    async fn test_admit_candidate_is_idempotent() {
        let (engine, mock) = new_engine(MockCatalog::new().with_title("m1", "Wizkid - Essence"));

        assert_eq!(engine.admit_candidate(essence()).await.as_deref(), Some("m1"));
        let calls = mock.total_calls();
        assert_eq!(engine.admit_candidate(essence()).await, None);
        assert_eq!(mock.total_calls(), calls);
        assert_eq!(engine.stats().pool.hot, 1);
    }

    #[tokio::test]
    async fn test_admit_repaired_candidate_keeps_original_track_id() {
        let (engine, _mock) = new_engine(
            MockCatalog::new()
                .with_broken_thumbnail("https://img.test/m1.jpg")
                .with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]),
        );

        let id = engine.admit_candidate(essence()).await.unwrap();
        let track = engine.track(&id).unwrap();
        assert_eq!(track.track_id, "m1");
        assert_eq!(track.external_id, "m2");
        assert_eq!(track.thumbnail_url, "https://img.test/m2.jpg");
    }

    #[tokio::test]
    async fn test_ingest_suggestions() {
        let (engine, _mock) = new_engine(
            MockCatalog::new().with_results(vec![mock_catalog_track("m9", "Calm Down", "Rema")]),
        );
        let curator = MockCurator::new(&[("Calm Down", "Rema")]);

        let summary = engine.ingest_suggestions(&curator, 10).await;
        assert_eq!(
            summary,
            IngestSummary {
                suggested: 1,
                admitted: 1,
                rejected: 0
            }
        );
        let track = engine.track("m9").unwrap();
        assert_eq!(track.source, TrackSource::ExternalCurator);
        assert_eq!(track.duration_secs, 210);
    }

    #[tokio::test]
    async fn test_ingest_with_empty_search_admits_nothing() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        let curator = MockCurator::new(&[("Calm Down", "Rema"), ("Essence", "Wizkid")]);

        let summary = engine.ingest_suggestions(&curator, 10).await;
        assert_eq!(summary.admitted, 0);
        assert_eq!(summary.rejected, 2);
        assert!(engine.select_hot(10).is_empty());
    }

    #[test]
    fn test_engagement_feeds_pool_and_preferences() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        let track = PooledTrack {
            category: Category::Gospel,
            ..mock_pooled_track("a")
        };
        engine.pool.lock().admit(track, TrackSource::Seed);

        assert!(engine.record_engagement_event(EngagementEvent::Completion(100.0), "a"));
        assert!(engine.record_engagement_event(EngagementEvent::Completion(60.0), "ext-a"));
        assert!(engine.record_engagement_event(EngagementEvent::Skip, "a"));
        assert!(engine.record_engagement_event(EngagementEvent::Like, "a"));

        let track = engine.track("a").unwrap();
        assert!((track.completion_rate - 80.0).abs() < 1e-9);
        assert_eq!(track.skipped_count, 1);

        let prefs = engine.preferences();
        assert!(prefs.is_liked("a"));
        assert!(prefs.category_signals(Category::Gospel).positive > 0);
        assert!(!engine.record_engagement_event(EngagementEvent::Play, "missing"));
    }

    #[test]
    fn test_recover_from_cold_skips_disliked() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        {
            let mut pool = engine.pool.lock();
            for id in ["a", "b"] {
                let track = PooledTrack {
                    category: Category::Amapiano,
                    ..mock_pooled_track(id)
                };
                pool.admit(track, TrackSource::Seed);
            }
        }
        engine.record_engagement_event(EngagementEvent::Dislike, "b");
        // Move both to cold
        {
            let mut pool = engine.pool.lock();
            let hot = pool.hot_tracks().to_vec();
            *pool = PoolManager::from_parts(engine.config.pool.clone(), Vec::new(), hot);
        }

        let recovered = engine.recover_from_cold(Category::Amapiano, 5);
        assert_eq!(recovered, vec!["a".to_string()]);
        assert!(engine.pool.lock().is_cold("b"));
    }

    #[test]
    fn test_select_discovery_unknown_current() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        engine.pool.lock().admit(mock_pooled_track("a"), TrackSource::Seed);
        assert!(engine.select_discovery("missing", 5).is_empty());
        assert!(engine.select_discovery("a", 5).is_empty());
    }

    #[test]
    fn test_select_bitrate_follows_estimate() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        assert_eq!(engine.select_bitrate(), QualityTier::Medium);
        engine.record_transfer(125_000, 1000);
        assert_eq!(engine.select_bitrate(), QualityTier::High);
    }

    #[test]
    fn test_buffer_health_default_target() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        let health = engine.buffer_health_default(&[BufferedRange::new(0.0, 15.0)], 0.0);
        assert_eq!(health.ahead_secs, 15.0);
        assert_eq!(health.fill_percent, 50.0);
    }

    #[tokio::test]
    async fn test_prefetch_pooled_track() {
        let (engine, mock) = new_engine(MockCatalog::new());
        engine.pool.lock().admit(mock_pooled_track("a"), TrackSource::Seed);

        let outcome = engine.prefetch("a", PrefetchPriority::Next, None).await;
        assert!(matches!(outcome, Some(PrefetchOutcome::Cached)));
        assert!(engine.prefetch_cache().contains("a"));
        assert_eq!(engine.network_stats().sample_count, 1);
        assert_eq!(mock.download_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        assert!(engine.prefetch("missing", PrefetchPriority::Next, None).await.is_none());
    }

    #[tokio::test]
    async fn test_prefetch_permanent_error_marks_media() {
        let mut mock = MockCatalog::new();
        mock.stream_errors
            .insert("ext-a".to_string(), ServiceError::NotFound("ext-a".to_string()));
        let (engine, _mock) = new_engine(mock);
        engine.pool.lock().admit(mock_pooled_track("a"), TrackSource::Seed);

        let outcome = engine.emergency_prefetch("a").await;
        assert!(matches!(outcome, Some(PrefetchOutcome::Failed(_))));
        assert!(engine.verifier().is_permanently_failed("ext-a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_heal_applies_repairs() {
        let (engine, _mock) = new_engine(
            MockCatalog::new()
                .with_broken_thumbnail("https://img.test/a.jpg")
                .with_title("ext-b", "Test Artist - Track b")
                .with_results(vec![mock_catalog_track("fixed", "Track a", "Test Artist")]),
        );
        engine.pool.lock().admit(mock_pooled_track("a"), TrackSource::Seed);
        engine.pool.lock().admit(mock_pooled_track("b"), TrackSource::Seed);
        engine.prefetch("a", PrefetchPriority::Upcoming, None).await;
        assert!(engine.prefetch_cache().contains("a"));

        let summary = engine.batch_heal(&CancellationToken::new()).await;
        assert_eq!(summary.healed, 1);
        assert_eq!(summary.skipped_valid, 1);

        let track = engine.track("a").unwrap();
        assert_eq!(track.external_id, "fixed");
        assert_eq!(track.thumbnail_url, "https://img.test/fixed.jpg");
        assert!(!engine.prefetch_cache().contains("a"));
    }

    #[test]
    fn test_run_maintenance_ages_stale_tracks() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        let stale = PooledTrack {
            admitted_at: Utc::now() - chrono::Duration::days(30),
            ..mock_pooled_track("old")
        };
        engine.pool.lock().admit(stale, TrackSource::Seed);
        engine.pool.lock().admit(mock_pooled_track("new"), TrackSource::Seed);

        let report = engine.run_maintenance().unwrap();
        assert_eq!(report.rescored, 2);
        assert_eq!(report.aged_out, 1);
        assert_eq!(report.hot, 1);
        assert!(engine.pool.lock().is_cold("old"));
    }

    #[test]
    fn test_run_maintenance_skips_overlapping_pass() {
        let (engine, _mock) = new_engine(MockCatalog::new());
        engine.maintenance_running.store(true, Ordering::SeqCst);
        assert!(engine.run_maintenance().is_none());

        engine.maintenance_running.store(false, Ordering::SeqCst);
        assert!(engine.run_maintenance().is_some());
        assert!(!engine.maintenance_running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");

        let (engine, _mock) = new_engine(MockCatalog::new());
        engine.pool.lock().admit(mock_pooled_track("a"), TrackSource::Seed);
        engine.pool.lock().admit(mock_pooled_track("b"), TrackSource::Seed);
        engine.record_engagement_event(EngagementEvent::Like, "a");
        engine.mark_permanent_failure("dead", FailureReason::NotFound);
        engine.save(&path).unwrap();

        let (restored, mock) = new_engine(MockCatalog::new());
        assert!(restored.load(&path).unwrap());
        assert_eq!(restored.stats().pool.hot, 2);
        assert!(restored.preferences().is_liked("a"));
        assert!(restored.verifier().is_permanently_failed("dead"));
        for track in restored.select_hot(10) {
            assert!((0.0..=100.0).contains(&track.score));
        }
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_load_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _mock) = new_engine(MockCatalog::new());
        assert!(!engine.load(&dir.path().join("missing.json")).unwrap());
    }
}

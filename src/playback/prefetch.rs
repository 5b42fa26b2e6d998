//! Prefetch cache for upcoming tracks.
//!
//! Holds fully downloaded media for the next few tracks so playback can start
//! without waiting on the network.
//!
//! # Invariants
//!
//! - At most one in-flight transfer per track id
//! - `len() <= capacity`; eviction drops the oldest-inserted entry first
//! - A cancelled transfer never creates an entry
//!
//! Insertion order lives in a `VecDeque` next to the `HashMap` index, so the
//! oldest entry is always at the front.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::QualityTier;
use super::network::NetworkEstimator;
use crate::catalog::{MediaApi, MediaDownloader, ServiceError};

/// Fractional progress callback (0.0 - 1.0).
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// How urgently a track is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchPriority {
    /// The track that plays next; may cancel other transfers for room
    Next,
    /// Further down the queue
    Upcoming,
}

/// Downloaded media ready for playback.
#[derive(Debug, Clone)]
pub struct MediaHandle {
    pub track_id: String,
    pub media_id: String,
    pub tier: QualityTier,
    pub url: String,
    pub data: Arc<Vec<u8>>,
}

impl MediaHandle {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Result of a prefetch request.
#[derive(Debug, Clone)]
pub enum PrefetchOutcome {
    Cached,
    AlreadyCached,
    AlreadyInFlight,
    Cancelled,
    Failed(ServiceError),
}

struct InFlight {
    token: CancellationToken,
    priority: PrefetchPriority,
    generation: u64,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, MediaHandle>,
    order: VecDeque<String>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
}

impl State {
    fn insert(&mut self, handle: MediaHandle, capacity: usize) -> Vec<String> {
        let id = handle.track_id.clone();
        if self.entries.insert(id.clone(), handle).is_none() {
            self.order.push_back(id);
        }

        let mut evicted = Vec::new();
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Cancel other transfers until `id` fits, preferring a superseded `Next`.
    ///
    /// Finished entries never count against the new transfer: `insert`
    /// evicts them once it lands. Only concurrent transfers compete for slots.
    fn make_room(&mut self, id: &str, capacity: usize) -> Vec<String> {
        let mut cancelled = Vec::new();
        while self.in_flight.len() >= capacity {
            let victim = self
                .in_flight
                .iter()
                .filter(|(k, _)| k.as_str() != id)
                .min_by_key(|(_, f)| (f.priority != PrefetchPriority::Next, f.generation))
                .map(|(k, _)| k.clone());
            let Some(victim) = victim else {
                break;
            };
            if let Some(f) = self.in_flight.remove(&victim) {
                f.token.cancel();
                cancelled.push(victim);
            }
        }
        cancelled
    }
}

/// Removes the in-flight marker when a transfer ends, however it ends.
struct InFlightGuard {
    state: Arc<Mutex<State>>,
    track_id: String,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .get(&self.track_id)
            .is_some_and(|f| f.generation == self.generation)
        {
            state.in_flight.remove(&self.track_id);
        }
    }
}

/// Bounded cache of prefetched media.
pub struct PrefetchCache {
    capacity: usize,
    state: Arc<Mutex<State>>,
    media: Arc<dyn MediaApi>,
    downloader: Arc<dyn MediaDownloader>,
    estimator: Arc<Mutex<NetworkEstimator>>,
}

impl PrefetchCache {
    pub fn new(
        capacity: usize,
        media: Arc<dyn MediaApi>,
        downloader: Arc<dyn MediaDownloader>,
        estimator: Arc<Mutex<NetworkEstimator>>,
    ) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Arc::new(Mutex::new(State::default())),
            media,
            downloader,
            estimator,
        }
    }

    /// Download a track's media and cache it.
    ///
    /// No-op if the track is already cached or being fetched.
    pub async fn prefetch(
        &self,
        track_id: &str,
        media_id: &str,
        tier: QualityTier,
        priority: PrefetchPriority,
        progress: Option<ProgressFn>,
    ) -> PrefetchOutcome {
        let (token, _guard) = {
            let mut state = self.state.lock();
            if state.entries.contains_key(track_id) {
                return PrefetchOutcome::AlreadyCached;
            }
            if state.in_flight.contains_key(track_id) {
                return PrefetchOutcome::AlreadyInFlight;
            }

            if priority == PrefetchPriority::Next {
                for victim in state.make_room(track_id, self.capacity) {
                    tracing::debug!(target: "prefetch", "Superseded in-flight prefetch for {}", victim);
                }
            }

            let generation = state.next_generation;
            state.next_generation += 1;
            let token = CancellationToken::new();
            state.in_flight.insert(
                track_id.to_string(),
                InFlight {
                    token: token.clone(),
                    priority,
                    generation,
                },
            );

            let guard = InFlightGuard {
                state: Arc::clone(&self.state),
                track_id: track_id.to_string(),
                generation,
            };
            (token, guard)
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return self.cancelled(track_id),
            r = self.transfer(media_id, tier, &token, progress.as_ref()) => r,
        };

        let (url, data, elapsed) = match result {
            Ok(Some(done)) => done,
            Ok(None) => return self.cancelled(track_id),
            Err(e) => {
                tracing::warn!(target: "prefetch", "Prefetch failed for {}: {}", track_id, e);
                return PrefetchOutcome::Failed(e);
            }
        };

        let elapsed_ms = (elapsed.as_millis() as u64).max(1);
        self.estimator.lock().record_transfer(data.len() as u64, elapsed_ms);

        let handle = MediaHandle {
            track_id: track_id.to_string(),
            media_id: media_id.to_string(),
            tier,
            url,
            data: Arc::new(data),
        };

        let evicted = {
            let mut state = self.state.lock();
            // A cancel may have landed between the last chunk and here
            if token.is_cancelled() {
                return self.cancelled(track_id);
            }
            state.insert(handle, self.capacity)
        };

        for id in evicted {
            tracing::debug!(target: "prefetch", "Evicted {}", id);
        }
        if let Some(cb) = progress.as_ref() {
            cb(1.0);
        }
        tracing::debug!(target: "prefetch", "Cached {} at {} tier", track_id, tier);
        PrefetchOutcome::Cached
    }

    async fn transfer(
        &self,
        media_id: &str,
        tier: QualityTier,
        token: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<Option<(String, Vec<u8>, Duration)>, ServiceError> {
        let location = self.media.resolve_stream(media_id, tier).await?;
        let mut download = self.downloader.download(&location.url).await?;
        // Throughput covers the body only, not the resolve round-trip
        let started = Instant::now();

        let mut data = Vec::with_capacity(download.total_bytes.unwrap_or(0) as usize);
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(None),
                chunk = download.chunks.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    data.extend_from_slice(&bytes);
                    if let (Some(cb), Some(total)) = (progress, download.total_bytes)
                        && total > 0
                    {
                        cb((data.len() as f64 / total as f64).min(1.0) as f32);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        Ok(Some((location.url, data, started.elapsed())))
    }

    fn cancelled(&self, track_id: &str) -> PrefetchOutcome {
        tracing::debug!(target: "prefetch", "Prefetch cancelled for {}", track_id);
        PrefetchOutcome::Cancelled
    }

    /// Cancel an in-flight prefetch. Returns `true` if one was running.
    pub fn cancel(&self, track_id: &str) -> bool {
        let mut state = self.state.lock();
        match state.in_flight.remove(track_id) {
            Some(f) => {
                f.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight prefetch.
    pub fn cancel_all(&self) {
        let mut state = self.state.lock();
        for (_, f) in state.in_flight.drain() {
            f.token.cancel();
        }
    }

    pub fn get(&self, track_id: &str) -> Option<MediaHandle> {
        self.state.lock().entries.get(track_id).cloned()
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.state.lock().entries.contains_key(track_id)
    }

    pub fn is_in_flight(&self, track_id: &str) -> bool {
        self.state.lock().in_flight.contains_key(track_id)
    }

    /// Drop a cached entry, e.g. after its reference was repaired.
    pub fn remove(&self, track_id: &str) -> Option<MediaHandle> {
        let mut state = self.state.lock();
        let handle = state.entries.remove(track_id)?;
        state.order.retain(|id| id != track_id);
        Some(handle)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Cached ids, oldest first.
    pub fn cached_ids(&self) -> Vec<String> {
        self.state.lock().order.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::traits::mocks::MockCatalog;

    fn cache_with(capacity: usize, catalog: MockCatalog) -> (Arc<PrefetchCache>, Arc<Mutex<NetworkEstimator>>) {
        let catalog = Arc::new(catalog);
        let estimator = Arc::new(Mutex::new(NetworkEstimator::default()));
        let cache = PrefetchCache::new(capacity, catalog.clone(), catalog, estimator.clone());
        (Arc::new(cache), estimator)
    }

    async fn fetch(cache: &PrefetchCache, id: &str) -> PrefetchOutcome {
        cache
            .prefetch(id, &format!("m-{id}"), QualityTier::High, PrefetchPriority::Upcoming, None)
            .await
    }

    #[tokio::test]
    async fn test_eviction_oldest_first() {
        let (cache, _) = cache_with(2, MockCatalog::new());

        assert!(matches!(fetch(&cache, "a").await, PrefetchOutcome::Cached));
        assert!(matches!(fetch(&cache, "b").await, PrefetchOutcome::Cached));
        assert!(matches!(fetch(&cache, "c").await, PrefetchOutcome::Cached));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert_eq!(cache.cached_ids(), vec!["b".to_string(), "c".to_string()]);

        fetch(&cache, "d").await;
        assert_eq!(cache.cached_ids(), vec!["c".to_string(), "d".to_string()]);
    }

    #[tokio::test]
    async fn test_already_cached_is_noop() {
        let catalog = MockCatalog::new();
        let (cache, _) = cache_with(3, catalog);
        fetch(&cache, "a").await;
        assert!(matches!(fetch(&cache, "a").await, PrefetchOutcome::AlreadyCached));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_transfer_feeds_estimator() {
        let (cache, estimator) = cache_with(3, MockCatalog::new());
        fetch(&cache, "a").await;
        assert_eq!(estimator.lock().stats().sample_count, 1);

        let handle = cache.get("a").unwrap();
        assert_eq!(handle.size_bytes(), 4096);
        assert_eq!(handle.tier, QualityTier::High);
    }

    #[tokio::test]
    async fn test_progress_reaches_one() {
        let (cache, _) = cache_with(3, MockCatalog::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p| sink.lock().push(p));

        cache
            .prefetch("a", "m-a", QualityTier::Low, PrefetchPriority::Upcoming, Some(progress))
            .await;

        let seen = seen.lock();
        assert_eq!(seen.first().copied(), Some(0.25));
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_dedup_and_cancel() {
        let catalog = MockCatalog {
            chunk_delay: Duration::from_millis(100),
            ..MockCatalog::new()
        };
        let (cache, _) = cache_with(3, catalog);

        let c = cache.clone();
        let task = tokio::spawn(async move { fetch(&c, "a").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.is_in_flight("a"));
        assert!(matches!(fetch(&cache, "a").await, PrefetchOutcome::AlreadyInFlight));

        assert!(cache.cancel("a"));
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, PrefetchOutcome::Cancelled));
        assert!(!cache.contains("a"));
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_priority_supersedes_under_pressure() {
        let catalog = MockCatalog {
            chunk_delay: Duration::from_millis(100),
            ..MockCatalog::new()
        };
        let (cache, _) = cache_with(1, catalog);

        let c = cache.clone();
        let first = tokio::spawn(async move {
            c.prefetch("a", "m-a", QualityTier::High, PrefetchPriority::Next, None)
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = cache
            .prefetch("b", "m-b", QualityTier::High, PrefetchPriority::Next, None)
            .await;

        assert!(matches!(second, PrefetchOutcome::Cached));
        assert!(matches!(first.await.unwrap(), PrefetchOutcome::Cancelled));
        assert_eq!(cache.cached_ids(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_permanent_failure_surfaces() {
        let mut catalog = MockCatalog::new();
        catalog
            .stream_errors
            .insert("m-a".to_string(), ServiceError::NotFound("m-a".to_string()));
        let (cache, _) = cache_with(3, catalog);

        match fetch(&cache, "a").await {
            PrefetchOutcome::Failed(e) => assert!(e.is_permanent()),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_then_refetch() {
        let (cache, _) = cache_with(2, MockCatalog::new());
        fetch(&cache, "a").await;
        fetch(&cache, "b").await;
        assert!(cache.remove("a").is_some());
        fetch(&cache, "c").await;
        assert_eq!(cache.cached_ids(), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_keeps_upcoming_when_only_cache_is_full() {
        let catalog = MockCatalog {
            chunk_delay: Duration::from_millis(100),
            ..MockCatalog::new()
        };
        let (cache, _) = cache_with(3, catalog);
        for id in ["a", "b", "c"] {
            assert!(matches!(fetch(&cache, id).await, PrefetchOutcome::Cached));
        }

        let c1 = cache.clone();
        let u1 = tokio::spawn(async move { fetch(&c1, "u1").await });
        let c2 = cache.clone();
        let u2 = tokio::spawn(async move { fetch(&c2, "u2").await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.in_flight_count(), 2);

        let next = cache
            .prefetch("n", "m-n", QualityTier::High, PrefetchPriority::Next, None)
            .await;
        assert!(matches!(next, PrefetchOutcome::Cached));

        assert!(matches!(u1.await.unwrap(), PrefetchOutcome::Cached));
        assert!(matches!(u2.await.unwrap(), PrefetchOutcome::Cached));
        assert_eq!(cache.len(), 3);
        assert!(cache.contains("n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throughput_excludes_stream_resolution() {
        let catalog = MockCatalog {
            resolve_delay: Duration::from_millis(1000),
            chunk_delay: Duration::from_millis(100),
            ..MockCatalog::new()
        };
        let (cache, estimator) = cache_with(3, catalog);
        fetch(&cache, "a").await;

        // 4 x 1024 bytes over 4 x 100ms
        let kbps = estimator.lock().stats().throughput_kbps;
        assert!((kbps - 4096.0 * 8.0 / 400.0).abs() < 0.01, "kbps = {kbps}");
    }
}

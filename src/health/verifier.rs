//! Verify-or-repair for candidate media references.
//!
//! A candidate passes when its thumbnail loads within the probe timeout and
//! the content oracle's display title matches its artist or title. Anything
//! else goes to repair: a search on the cleaned `artist title` query whose
//! top usable result replaces the reference.
//!
//! Concurrent verifications of the same normalized artist/title share one
//! in-flight future, so a burst of identical candidates costs one search.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::cache::{PurgeStats, VerificationCache};
use super::matching::{clean_query, content_matches, query_key, record_key};
use super::types::{
    CheckFlags, CheckOutcome, PermanentFailureRecord, RecordOutcome, VerifiedRef, VerifyRequest,
};
use crate::catalog::{Catalog, ContentOracle, FailureReason, SearchApi, ThumbnailProbe};
use crate::config::VerificationConfig;

type VerifyFuture = Shared<BoxFuture<'static, Option<VerifiedRef>>>;

struct Inner {
    config: VerificationConfig,
    search: Arc<dyn SearchApi>,
    probe: Arc<dyn ThumbnailProbe>,
    oracle: Arc<dyn ContentOracle>,
    cache: Mutex<VerificationCache>,
    in_flight: Mutex<HashMap<String, VerifyFuture>>,
}

/// Cheap to clone; clones share caches and in-flight work.
#[derive(Clone)]
pub struct Verifier {
    inner: Arc<Inner>,
}

impl Verifier {
    pub fn new(
        config: VerificationConfig,
        search: Arc<dyn SearchApi>,
        probe: Arc<dyn ThumbnailProbe>,
        oracle: Arc<dyn ContentOracle>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: Mutex::new(VerificationCache::new(config.clone())),
                config,
                search,
                probe,
                oracle,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build from a single backend implementing every collaborator.
    pub fn from_catalog<C: Catalog + 'static>(config: VerificationConfig, catalog: Arc<C>) -> Self {
        Self::new(config, catalog.clone(), catalog.clone(), catalog)
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.inner.config
    }

    /// Verify a candidate, repairing it if needed.
    ///
    /// Returns `None` when the candidate should be rejected: its id is
    /// permanently failed, repair found nothing, or repair is suppressed.
    pub async fn verify(&self, request: VerifyRequest) -> Option<VerifiedRef> {
        let now = Utc::now();

        let blocked = request
            .media_id
            .as_deref()
            .and_then(|id| self.inner.cache.lock().permanent_failure(id, now));
        if let Some(reason) = blocked {
            debug!(
                target: "verify",
                media_id = request.media_id.as_deref().unwrap_or(""),
                reason = reason.as_str(),
                "Rejected permanently failed id"
            );
            return None;
        }

        let key = record_key(&request.artist, &request.title);
        let cached = self.inner.cache.lock().record(&key, now);
        match cached {
            Some(RecordOutcome::Resolved(verified)) => {
                if !self.is_permanently_failed(&verified.media_id) {
                    debug!(target: "verify", key = %key, "Cache hit");
                    return Some(verified);
                }
                self.inner.cache.lock().forget(&key);
            }
            Some(RecordOutcome::Failed) => {
                debug!(target: "verify", key = %key, "Cached failure");
                return None;
            }
            None => {}
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(target: "verify", key = %key, "Joining in-flight verification");
                    existing.clone()
                }
                None => {
                    let this = self.clone();
                    let settle_key = key.clone();
                    let fut = async move {
                        let outcome = this.check(&request).await;
                        this.inner.in_flight.lock().remove(&settle_key);
                        outcome.verified
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// Check and repair one pooled reference, ignoring cached records.
    ///
    /// Used by batch heal. A permanently failed id goes straight to repair
    /// instead of being rejected.
    pub async fn heal_track(&self, request: VerifyRequest) -> CheckOutcome {
        self.check(&request).await
    }

    /// Block a media id for the permanent-failure TTL.
    pub fn mark_permanent_failure(&self, media_id: &str, reason: FailureReason) {
        info!(
            target: "verify",
            media_id = media_id,
            reason = reason.as_str(),
            "Marked permanent failure"
        );
        self.inner
            .cache
            .lock()
            .mark_permanent(media_id, reason, Utc::now());
    }

    pub fn is_permanently_failed(&self, media_id: &str) -> bool {
        self.inner.cache.lock().is_blocked(media_id, Utc::now())
    }

    pub fn permanent_failures(&self) -> Vec<PermanentFailureRecord> {
        self.inner.cache.lock().permanent_records(Utc::now())
    }

    pub fn restore_permanent_failures(&self, records: Vec<PermanentFailureRecord>) -> usize {
        self.inner
            .cache
            .lock()
            .restore_permanent(records, Utc::now())
    }

    pub fn purge_expired(&self) -> PurgeStats {
        self.inner.cache.lock().purge_expired(Utc::now())
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Thumbnail, then content, then repair on any failure.
    async fn check(&self, request: &VerifyRequest) -> CheckOutcome {
        let config = &self.inner.config;

        let Some(media_id) = request
            .media_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            return self.repair(request, None, CheckFlags::NO_MEDIA_ID).await;
        };

        if self.is_permanently_failed(media_id) {
            return self
                .repair(request, Some(media_id), CheckFlags::PERMANENT_FAILURE)
                .await;
        }

        let thumbnail = request.thumbnail_url.as_deref().unwrap_or("").trim();
        let thumbnail_ok = !thumbnail.is_empty()
            && match tokio::time::timeout(
                config.thumbnail_timeout(),
                self.inner.probe.probe(thumbnail),
            )
            .await
            {
                Ok(loaded) => loaded,
                Err(_) => {
                    debug!(target: "verify", media_id = media_id, "Thumbnail probe timed out");
                    false
                }
            };
        if !thumbnail_ok {
            return self
                .repair(request, None, CheckFlags::THUMBNAIL_BROKEN)
                .await;
        }

        let flags = CheckFlags::THUMBNAIL_OK;
        match self.inner.oracle.display_title(media_id).await {
            Ok(shown_title) => {
                if content_matches(
                    &shown_title,
                    &request.artist,
                    &request.title,
                    config.min_similarity,
                ) {
                    let verified = self.accept(request, media_id, thumbnail);
                    self.inner.cache.lock().store_success(
                        &record_key(&request.artist, &request.title),
                        verified.clone(),
                        Utc::now(),
                    );
                    CheckOutcome {
                        verified: Some(verified),
                        flags: flags | CheckFlags::CONTENT_OK,
                    }
                } else {
                    debug!(
                        target: "verify",
                        media_id = media_id,
                        display = %shown_title,
                        expected = %format!("{} - {}", request.artist, request.title),
                        "Content mismatch"
                    );
                    self.repair(request, Some(media_id), flags | CheckFlags::CONTENT_MISMATCH)
                        .await
                }
            }
            Err(e) => match e.failure_reason() {
                Some(reason) => {
                    self.mark_permanent_failure(media_id, reason);
                    self.repair(request, Some(media_id), flags | CheckFlags::PERMANENT_FAILURE)
                        .await
                }
                None => {
                    // Thumbnail loaded, so keep it; don't cache an unchecked result.
                    debug!(target: "verify", media_id = media_id, error = %e, "Oracle unavailable");
                    CheckOutcome {
                        verified: Some(self.accept(request, media_id, thumbnail)),
                        flags: flags | CheckFlags::ORACLE_UNAVAILABLE,
                    }
                }
            },
        }
    }

    fn accept(&self, request: &VerifyRequest, media_id: &str, thumbnail: &str) -> VerifiedRef {
        VerifiedRef {
            media_id: media_id.to_string(),
            thumbnail_url: thumbnail.to_string(),
            title: request.title.clone(),
            artist: request.artist.clone(),
            duration_secs: None,
            repaired: false,
        }
    }

    /// Search for a replacement, skipping `exclude` and blocked ids.
    async fn repair(
        &self,
        request: &VerifyRequest,
        exclude: Option<&str>,
        mut flags: CheckFlags,
    ) -> CheckOutcome {
        let key = record_key(&request.artist, &request.title);
        let query = clean_query(&request.artist, &request.title);
        let retry_key = query_key(&query);

        if retry_key.is_empty() {
            self.inner.cache.lock().store_failure(&key, Utc::now());
            return CheckOutcome { verified: None, flags };
        }

        let allowed = self.inner.cache.lock().retry_allowed(&retry_key, Utc::now());
        if !allowed {
            debug!(target: "verify", query = %query, "Repair suppressed, retries exhausted");
            flags |= CheckFlags::RETRY_SUPPRESSED;
            return CheckOutcome { verified: None, flags };
        }

        let results = match self
            .inner
            .search
            .search(&query, self.inner.config.search_limit)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(target: "verify", query = %query, error = %e, "Repair search failed");
                self.inner
                    .cache
                    .lock()
                    .note_failed_attempt(&retry_key, Utc::now());
                return CheckOutcome { verified: None, flags };
            }
        };

        let now = Utc::now();
        let mut cache = self.inner.cache.lock();
        let replacement = results.into_iter().find(|t| {
            !t.id.trim().is_empty() && Some(t.id.as_str()) != exclude && !cache.is_blocked(&t.id, now)
        });

        match replacement {
            Some(track) => {
                info!(
                    target: "verify",
                    query = %query,
                    old = exclude.or(request.media_id.as_deref()).unwrap_or("-"),
                    new = %track.id,
                    "Repaired reference"
                );
                let verified = VerifiedRef {
                    media_id: track.id,
                    thumbnail_url: track.thumbnail_url,
                    title: request.title.clone(),
                    artist: request.artist.clone(),
                    duration_secs: Some(track.duration_secs),
                    repaired: true,
                };
                cache.store_success(&key, verified.clone(), now);
                cache.note_success(&retry_key);
                CheckOutcome {
                    verified: Some(verified),
                    flags: flags | CheckFlags::REPAIRED,
                }
            }
            None => {
                let attempts = cache.note_failed_attempt(&retry_key, now);
                cache.store_failure(&key, now);
                debug!(
                    target: "verify",
                    query = %query,
                    attempts = attempts,
                    "No usable replacement"
                );
                CheckOutcome { verified: None, flags }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceError;
    use crate::catalog::traits::mocks::MockCatalog;
    use crate::test_utils::mock_catalog_track;
    use std::time::Duration;

    fn verifier(mock: &Arc<MockCatalog>) -> Verifier {
        Verifier::from_catalog(VerificationConfig::default(), mock.clone())
    }

    fn essence(media_id: &str) -> VerifyRequest {
        VerifyRequest::with_media(
            media_id,
            "Wizkid",
            "Essence",
            format!("https://img.test/{}.jpg", media_id),
        )
    }

    #[tokio::test]
    async fn test_valid_candidate_passes_and_is_cached() {
        let mock = Arc::new(MockCatalog::new().with_title("m1", "Wizkid - Essence ft. Tems"));
        let v = verifier(&mock);

        let verified = v.verify(essence("m1")).await.unwrap();
        assert_eq!(verified.media_id, "m1");
        assert!(!verified.repaired);
        assert_eq!(mock.searches(), 0);

        // Served from the record cache
        v.verify(essence("m1")).await.unwrap();
        assert_eq!(mock.probes(), 1);
        assert_eq!(mock.oracle_lookups(), 1);
    }

    #[tokio::test]
    async fn test_content_mismatch_repairs() {
        let mock = Arc::new(
            MockCatalog::new()
                .with_title("m1", "Completely Unrelated Upload")
                .with_results(vec![
                    mock_catalog_track("m1", "Essence", "Wizkid"),
                    mock_catalog_track("m2", "Essence", "Wizkid"),
                ]),
        );
        let v = verifier(&mock);

        let verified = v.verify(essence("m1")).await.unwrap();
        // The mismatched id is never offered back as its own repair
        assert_eq!(verified.media_id, "m2");
        assert!(verified.repaired);
        assert_eq!(verified.thumbnail_url, "https://img.test/m2.jpg");
        assert_eq!(mock.searches(), 1);
    }

    #[tokio::test]
    async fn test_broken_thumbnail_repairs() {
        let mock = Arc::new(
            MockCatalog::new()
                .with_broken_thumbnail("https://img.test/m1.jpg")
                .with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]),
        );
        let v = verifier(&mock);

        let verified = v.verify(essence("m1")).await.unwrap();
        assert_eq!(verified.media_id, "m2");
        assert_eq!(mock.oracle_lookups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thumbnail_timeout_counts_as_broken() {
        let mut mock = MockCatalog::new()
            .with_title("m1", "Wizkid - Essence")
            .with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]);
        mock.thumbnail_delay = Duration::from_secs(60);
        let mock = Arc::new(mock);
        let v = verifier(&mock);

        let start = tokio::time::Instant::now();
        let verified = v.verify(essence("m1")).await.unwrap();
        assert_eq!(verified.media_id, "m2");
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(mock.oracle_lookups(), 0);
    }

    #[tokio::test]
    async fn test_permanent_oracle_error_blocks_id() {
        let mock = Arc::new(
            MockCatalog::new()
                .with_oracle_error("m1", ServiceError::NotFound("m1".to_string()))
                .with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]),
        );
        let v = verifier(&mock);

        let verified = v.verify(essence("m1")).await.unwrap();
        assert_eq!(verified.media_id, "m2");
        assert!(v.is_permanently_failed("m1"));

        let calls = mock.total_calls();
        assert_eq!(v.verify(essence("m1")).await, None);
        assert_eq!(mock.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_blocked_id_makes_no_network_calls() {
        let mock = Arc::new(MockCatalog::new().with_title("m1", "Wizkid - Essence"));
        let v = verifier(&mock);
        v.mark_permanent_failure("m1", FailureReason::AccessRestricted);

        assert_eq!(v.verify(essence("m1")).await, None);
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_permanent_failure_is_checked_again() {
        let mock = Arc::new(MockCatalog::new().with_title("m1", "Wizkid - Essence"));
        let config = VerificationConfig {
            permanent_failure_ttl_days: 0,
            ..Default::default()
        };
        let v = Verifier::from_catalog(config, mock.clone());
        v.mark_permanent_failure("m1", FailureReason::NotFound);

        assert!(v.verify(essence("m1")).await.is_some());
        assert_eq!(mock.probes(), 1);
    }

    #[tokio::test]
    async fn test_transient_oracle_error_accepts_without_caching() {
        // No title registered: the mock oracle fails transiently
        let mock = Arc::new(MockCatalog::new());
        let v = verifier(&mock);

        let verified = v.verify(essence("m1")).await.unwrap();
        assert_eq!(verified.media_id, "m1");
        assert!(!verified.repaired);

        v.verify(essence("m1")).await.unwrap();
        assert_eq!(mock.oracle_lookups(), 2);
        assert_eq!(mock.searches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_requests_share_one_search() {
        let mut mock =
            MockCatalog::new().with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]);
        mock.search_delay = Duration::from_millis(100);
        let mock = Arc::new(mock);
        let v = verifier(&mock);

        let (a, b) = tokio::join!(
            v.verify(VerifyRequest::by_name("Wizkid", "Essence")),
            v.verify(VerifyRequest::by_name("wizkid", "ESSENCE!"))
        );

        assert_eq!(mock.searches(), 1);
        assert_eq!(a.unwrap().media_id, "m2");
        assert_eq!(b.unwrap().media_id, "m2");
        assert_eq!(v.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_governance_caps_searches() {
        let mock = Arc::new(MockCatalog::new());
        let config = VerificationConfig {
            failure_ttl_hours: 0,
            ..Default::default()
        };
        let v = Verifier::from_catalog(config, mock.clone());

        for _ in 0..5 {
            assert_eq!(v.verify(VerifyRequest::by_name("Nobody", "Nothing")).await, None);
        }
        assert_eq!(mock.searches(), 3);
    }

    #[tokio::test]
    async fn test_failed_repair_is_cached() {
        let mock = Arc::new(MockCatalog::new());
        let v = verifier(&mock);

        assert_eq!(v.verify(VerifyRequest::by_name("Nobody", "Nothing")).await, None);
        assert_eq!(v.verify(VerifyRequest::by_name("Nobody", "Nothing")).await, None);
        assert_eq!(mock.searches(), 1);
    }

    #[tokio::test]
    async fn test_search_error_is_not_cached_as_failure() {
        let mut mock = MockCatalog::new();
        mock.search_error = Some(ServiceError::RateLimited);
        let mock = Arc::new(mock);
        let v = verifier(&mock);

        assert_eq!(v.verify(VerifyRequest::by_name("Rema", "Calm Down")).await, None);
        assert_eq!(v.verify(VerifyRequest::by_name("Rema", "Calm Down")).await, None);
        assert_eq!(mock.searches(), 2);
    }

    #[tokio::test]
    async fn test_heal_track_repairs_blocked_id() {
        let mock = Arc::new(
            MockCatalog::new().with_results(vec![mock_catalog_track("m2", "Essence", "Wizkid")]),
        );
        let v = verifier(&mock);
        v.mark_permanent_failure("m1", FailureReason::NotFound);

        let outcome = v.heal_track(essence("m1")).await;
        assert_eq!(outcome.verified.unwrap().media_id, "m2");
        assert!(outcome.flags.contains(CheckFlags::PERMANENT_FAILURE | CheckFlags::REPAIRED));
        assert_eq!(mock.probes(), 0);
    }

    #[tokio::test]
    async fn test_repair_skips_blocked_results() {
        let mock = Arc::new(MockCatalog::new().with_results(vec![
            mock_catalog_track("dead", "Essence", "Wizkid"),
            mock_catalog_track("m3", "Essence", "Wizkid"),
        ]));
        let v = verifier(&mock);
        v.mark_permanent_failure("dead", FailureReason::EmbeddingDisabled);

        let verified = v.verify(VerifyRequest::by_name("Wizkid", "Essence")).await.unwrap();
        assert_eq!(verified.media_id, "m3");
    }
}

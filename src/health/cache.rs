//! Verification bookkeeping: result records, permanent failures and retry
//! counters.
//!
//! Every method takes `now` explicitly so expiry can be tested without
//! waiting. The [`Verifier`](super::Verifier) wraps this in a mutex and
//! passes `Utc::now()`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{
    PermanentFailureRecord, RecordOutcome, RetryCounter, VerificationRecord, VerifiedRef,
};
use crate::catalog::FailureReason;
use crate::config::VerificationConfig;

/// Counts of entries dropped by [`VerificationCache::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub records: usize,
    pub permanent: usize,
    pub retries: usize,
}

#[derive(Debug)]
pub struct VerificationCache {
    config: VerificationConfig,
    records: HashMap<String, VerificationRecord>,
    permanent: HashMap<String, PermanentFailureRecord>,
    retries: HashMap<String, RetryCounter>,
}

impl VerificationCache {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            permanent: HashMap::new(),
            retries: HashMap::new(),
        }
    }

    // ========== Records ==========

    /// Unexpired outcome for a record key.
    pub fn record(&mut self, key: &str, now: DateTime<Utc>) -> Option<RecordOutcome> {
        let record = self.records.get(key)?;
        if now < record.expires_at {
            return Some(record.outcome.clone());
        }
        self.records.remove(key);
        None
    }

    pub fn store_success(&mut self, key: &str, verified: VerifiedRef, now: DateTime<Utc>) {
        self.records.insert(
            key.to_string(),
            VerificationRecord {
                outcome: RecordOutcome::Resolved(verified),
                expires_at: now + self.config.success_ttl(),
            },
        );
    }

    pub fn store_failure(&mut self, key: &str, now: DateTime<Utc>) {
        self.records.insert(
            key.to_string(),
            VerificationRecord {
                outcome: RecordOutcome::Failed,
                expires_at: now + self.config.failure_ttl(),
            },
        );
    }

    pub fn forget(&mut self, key: &str) {
        self.records.remove(key);
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ========== Permanent failures ==========

    /// Block `media_id` until the permanent-failure TTL elapses.
    pub fn mark_permanent(&mut self, media_id: &str, reason: FailureReason, now: DateTime<Utc>) {
        self.permanent.insert(
            media_id.to_string(),
            PermanentFailureRecord {
                media_id: media_id.to_string(),
                reason,
                recorded_at: now,
                expires_at: now + self.config.permanent_failure_ttl(),
            },
        );
    }

    /// The active failure reason for `media_id`, if blocked.
    pub fn permanent_failure(&mut self, media_id: &str, now: DateTime<Utc>) -> Option<FailureReason> {
        let record = self.permanent.get(media_id)?;
        if record.is_active(now) {
            return Some(record.reason);
        }
        self.permanent.remove(media_id);
        None
    }

    pub fn is_blocked(&mut self, media_id: &str, now: DateTime<Utc>) -> bool {
        self.permanent_failure(media_id, now).is_some()
    }

    /// Active permanent failures, for persistence.
    pub fn permanent_records(&self, now: DateTime<Utc>) -> Vec<PermanentFailureRecord> {
        let mut records: Vec<_> = self
            .permanent
            .values()
            .filter(|r| r.is_active(now))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        records
    }

    /// Load persisted permanent failures, skipping expired ones.
    pub fn restore_permanent(&mut self, records: Vec<PermanentFailureRecord>, now: DateTime<Utc>) -> usize {
        let mut restored = 0;
        for record in records.into_iter().filter(|r| r.is_active(now)) {
            self.permanent.insert(record.media_id.clone(), record);
            restored += 1;
        }
        restored
    }

    // ========== Retry governance ==========

    /// May another repair search run for this query key?
    pub fn retry_allowed(&mut self, query_key: &str, now: DateTime<Utc>) -> bool {
        let Some(counter) = self.retries.get(query_key) else {
            return true;
        };
        if now - counter.last_attempt >= self.config.retry_cooldown() {
            self.retries.remove(query_key);
            return true;
        }
        counter.attempts < self.config.max_repair_attempts
    }

    /// Count a repair attempt that produced nothing usable.
    pub fn note_failed_attempt(&mut self, query_key: &str, now: DateTime<Utc>) -> u32 {
        let cooldown = self.config.retry_cooldown();
        let counter = self
            .retries
            .entry(query_key.to_string())
            .or_insert(RetryCounter {
                attempts: 0,
                last_attempt: now,
            });
        if now - counter.last_attempt >= cooldown {
            counter.attempts = 0;
        }
        counter.attempts += 1;
        counter.last_attempt = now;
        counter.attempts
    }

    pub fn note_success(&mut self, query_key: &str) {
        self.retries.remove(query_key);
    }

    pub fn attempts(&self, query_key: &str) -> u32 {
        self.retries.get(query_key).map(|c| c.attempts).unwrap_or(0)
    }

    // ========== Housekeeping ==========

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> PurgeStats {
        let before = (self.records.len(), self.permanent.len(), self.retries.len());
        let cooldown = self.config.retry_cooldown();

        self.records.retain(|_, r| now < r.expires_at);
        self.permanent.retain(|_, r| r.is_active(now));
        self.retries.retain(|_, c| now - c.last_attempt < cooldown);

        PurgeStats {
            records: before.0 - self.records.len(),
            permanent: before.1 - self.permanent.len(),
            retries: before.2 - self.retries.len(),
        }
    }
}

//! sync::jobs
//!
//! Dedup cache of admitted synchronization jobs.
//!
//! # Design
//!
//! One reader/writer lock guards a two-level map,
//! deployment → job → admitted-at. Membership checks share the lock;
//! admission and purging take it exclusively. An entry is inserted complete,
//! so a reader never observes a job without its timestamp.
//!
//! The cache keeps no history beyond `max_age`: a periodic purge (see
//! [`spawn_purger`]) drops old entries and the deployment buckets they leave
//! empty.
//!
//! # Example
//!
//! ```
//! use modsync::sync::JobCache;
//! use std::time::Duration;
//!
//! let cache = JobCache::new();
//! assert!(cache.admit("deploy-1", "job-1"));
//! assert!(!cache.admit("deploy-1", "job-1"));
//! assert!(cache.is_known("deploy-1", "job-1"));
//!
//! // Nothing is older than an hour yet
//! assert_eq!(cache.purge(Duration::from_secs(3600)), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shortest interval [`spawn_purger`] ticks at; shorter requests are raised
/// to it.
pub const MIN_PURGE_INTERVAL: Duration = Duration::from_millis(1);

type Buckets = HashMap<String, HashMap<String, DateTime<Utc>>>;

/// Concurrent set of admitted (deployment, job) pairs.
#[derive(Debug, Default)]
pub struct JobCache {
    entries: RwLock<Buckets>,
}

impl JobCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Buckets> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buckets> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Record that `job_id` started for `deployment_id`.
    ///
    /// Returns `true` if the pair was new. A repeated admission keeps the
    /// original timestamp and returns `false`.
    pub fn admit(&self, deployment_id: &str, job_id: &str) -> bool {
        self.admit_at(deployment_id, job_id, Utc::now())
    }

    /// [`admit`](Self::admit) with an explicit clock.
    pub fn admit_at(&self, deployment_id: &str, job_id: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.write();
        let bucket = entries.entry(deployment_id.to_string()).or_default();
        if bucket.contains_key(job_id) {
            return false;
        }
        bucket.insert(job_id.to_string(), now);
        true
    }

    pub fn is_known(&self, deployment_id: &str, job_id: &str) -> bool {
        self.read()
            .get(deployment_id)
            .is_some_and(|bucket| bucket.contains_key(job_id))
    }

    /// When the pair was admitted, if it is known.
    pub fn admitted_at(&self, deployment_id: &str, job_id: &str) -> Option<DateTime<Utc>> {
        self.read()
            .get(deployment_id)
            .and_then(|bucket| bucket.get(job_id).copied())
    }

    /// Drop every entry older than `max_age`; returns how many were removed.
    pub fn purge(&self, max_age: Duration) -> usize {
        self.purge_at(max_age, Utc::now())
    }

    /// [`purge`](Self::purge) with an explicit clock.
    pub fn purge_at(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut entries = self.write();
        let mut removed = 0;

        for bucket in entries.values_mut() {
            let before = bucket.len();
            bucket.retain(|_, admitted| now.signed_duration_since(*admitted) <= max_age);
            removed += before - bucket.len();
        }
        entries.retain(|_, bucket| !bucket.is_empty());

        removed
    }

    /// Total admitted jobs.
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of deployments with at least one admitted job.
    pub fn deployment_count(&self) -> usize {
        self.read().len()
    }
}

/// Purge `cache` every `interval` until `cancel` fires.
///
/// `interval` is clamped to at least [`MIN_PURGE_INTERVAL`].
pub fn spawn_purger(
    cache: Arc<JobCache>,
    interval: Duration,
    max_age: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_PURGE_INTERVAL));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.purge(max_age);
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "purged sync jobs");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    mod admission {
        use super::*;

        #[test]
        fn first_admission_is_new() {
            let cache = JobCache::new();
            assert!(cache.admit_at("d1", "j1", t(0)));
            assert!(cache.is_known("d1", "j1"));
            assert!(!cache.is_known("d1", "j2"));
            assert!(!cache.is_known("d2", "j1"));
        }

        #[test]
        fn repeat_keeps_first_timestamp() {
            let cache = JobCache::new();
            assert!(cache.admit_at("d1", "j1", t(0)));
            assert!(!cache.admit_at("d1", "j1", t(50)));
            assert_eq!(cache.admitted_at("d1", "j1"), Some(t(0)));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn jobs_are_scoped_per_deployment() {
            let cache = JobCache::new();
            assert!(cache.admit_at("d1", "j1", t(0)));
            assert!(cache.admit_at("d2", "j1", t(0)));
            assert_eq!(cache.deployment_count(), 2);
        }
    }

    mod purging {
        use super::*;

        #[test]
        fn removes_old_entries_and_empty_buckets() {
            let cache = JobCache::new();
            cache.admit_at("d1", "j1", t(0));
            cache.admit_at("d2", "old", t(0));
            cache.admit_at("d2", "new", t(100));

            let removed = cache.purge_at(Duration::from_secs(60), t(120));

            assert_eq!(removed, 2);
            assert!(!cache.is_known("d1", "j1"));
            assert!(cache.is_known("d2", "new"));
            assert_eq!(cache.deployment_count(), 1);
        }

        #[test]
        fn entry_at_exact_age_survives() {
            let cache = JobCache::new();
            cache.admit_at("d", "j", t(0));
            assert_eq!(cache.purge_at(Duration::from_secs(60), t(60)), 0);
            assert_eq!(cache.purge_at(Duration::from_secs(60), t(61)), 1);
            assert!(cache.is_empty());
        }

        #[test]
        fn purged_pair_can_be_admitted_again() {
            let cache = JobCache::new();
            cache.admit_at("d", "j", t(0));
            cache.purge_at(Duration::from_secs(1), t(10));
            assert!(cache.admit_at("d", "j", t(10)));
        }
    }

    mod concurrency {
        use super::*;

        #[test]
        fn exactly_one_concurrent_admission_wins() {
            let cache = Arc::new(JobCache::new());
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    std::thread::spawn(move || cache.admit("d", "j"))
                })
                .collect();
            let wins = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(wins, 1);
        }

        #[tokio::test(start_paused = true)]
        async fn purger_runs_until_canceled() {
            let cache = Arc::new(JobCache::new());
            cache.admit_at("d", "j", Utc::now() - chrono::Duration::hours(2));
            let cancel = CancellationToken::new();

            let handle = spawn_purger(
                Arc::clone(&cache),
                Duration::from_secs(10),
                Duration::from_secs(3600),
                cancel.clone(),
            );
            tokio::time::sleep(Duration::from_secs(11)).await;
            assert!(cache.is_empty());

            cancel.cancel();
            handle.await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn zero_interval_is_clamped() {
            let cache = Arc::new(JobCache::new());
            cache.admit_at("d", "j", Utc::now() - chrono::Duration::hours(2));
            let cancel = CancellationToken::new();

            let handle = spawn_purger(
                Arc::clone(&cache),
                Duration::ZERO,
                Duration::from_secs(3600),
                cancel.clone(),
            );
            tokio::time::sleep(MIN_PURGE_INTERVAL * 2).await;
            assert!(cache.is_empty());

            cancel.cancel();
            handle.await.unwrap();
        }
    }
}

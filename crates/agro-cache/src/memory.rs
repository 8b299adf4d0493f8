//! In-memory cache implementation.

use agro_core::{Clock, SystemClock};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with the instant it was fetched.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Time-windowed memoization keyed by a composite string.
///
/// Values are cloned out on every hit. The map lock is only held for the
/// lookup and the store, never across the fetch, so two concurrent misses for
/// the same key both run their fetch and the last one to finish wins.
#[derive(Debug)]
pub struct InMemoryCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> InMemoryCache<T> {
    /// Create a new empty cache reading time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the value stored under `key` if it is younger than `ttl`,
    /// otherwise runs `fetch`, stores its output and returns it.
    ///
    /// Errors from `fetch` are returned as-is and nothing is stored, so the
    /// next call retries immediately.
    ///
    /// # Errors
    /// Returns whatever error `fetch` produced on a miss.
    #[instrument(skip(self, fetch), fields(key = %key, ttl_secs = ttl.as_secs()))]
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.is_fresh(self.clock.now(), ttl) {
                    debug!("Cache hit");
                    return Ok(entry.value.clone());
                }
                debug!("Cache entry stale");
            } else {
                debug!("Cache miss");
            }
        }

        let value = fetch().await?;

        let entry = CacheEntry {
            value: value.clone(),
            fetched_at: self.clock.now(),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        debug!("Cached fresh value");

        Ok(value)
    }

    /// Number of stored entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every entry.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
    }
}

impl<T: Clone> Default for InMemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    fn cache() -> (InMemoryCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (InMemoryCache::with_clock(clock.clone()), clock)
    }

    async fn counted(cache: &InMemoryCache<u32>, key: &str, calls: &AtomicUsize) -> u32 {
        cache
            .get_or_fetch(key, TTL, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(u32::try_from(n).unwrap() + 100)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_a_hit() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&cache, "onion|maharashtra", &calls).await, 100);
        clock.advance(TimeDelta::seconds(299));
        assert_eq!(counted(&cache, "onion|maharashtra", &calls).await, 100);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_at_ttl_refetches() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls).await;
        clock.advance(TimeDelta::seconds(300));
        assert_eq!(counted(&cache, "k", &calls).await, 101);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Refresh overwrites in place.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, _clock) = cache();
        let calls = AtomicUsize::new(0);

        let first: Result<u32, String> = cache
            .get_or_fetch("k", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("upstream down".to_string())
            })
            .await;
        assert_eq!(first, Err("upstream down".to_string()));
        assert!(cache.is_empty().await);

        let second = cache
            .get_or_fetch("k", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(7)
            })
            .await;
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (cache, _clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "current|Pune", &calls).await;
        counted(&cache, "forecast|Pune", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_ttl_is_per_call() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls).await;
        clock.advance(TimeDelta::minutes(6));

        // Still fresh under a longer window.
        let value = cache
            .get_or_fetch("k", Duration::from_secs(3600), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(0)
            })
            .await
            .unwrap();
        assert_eq!(value, 100);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_fetch() {
        let (cache, _clock) = cache();
        let calls = AtomicUsize::new(0);

        let fetch = |n: u32| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, String>(n)
            }
        };

        let (a, b) = futures::join!(
            cache.get_or_fetch("k", TTL, fetch(1)),
            cache.get_or_fetch("k", TTL, fetch(2))
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(cache.len().await, 1);
        // Last writer wins.
        assert_eq!(counted(&cache, "k", &calls).await, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let (cache, _clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls).await;
        cache.clear().await;
        assert!(cache.is_empty().await);

        counted(&cache, "k", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

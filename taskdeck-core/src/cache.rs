//! Keyed read cache with request coalescing and stale-while-revalidate.
//!
//! Each key maps to the last successful value, when it was fetched and the
//! last error. At most one fetch per key is outstanding; concurrent readers
//! share its outcome. Invalidation forces the next read to wait for a new
//! fetch and detaches outstanding ones, so a response that raced a mutation
//! is never written back. Entries nobody has read for
//! [`CacheOptions::gc_time`] are dropped unless a fetch for them is running.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::types::ApiError;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY: u32 = 1;
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a fetched value is served without refetching.
    pub stale_time: Duration,
    /// Automatic retries of a failed read before it surfaces.
    pub retry: u32,
    /// How long an unread entry is kept.
    pub gc_time: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            retry: DEFAULT_RETRY,
            gc_time: DEFAULT_GC_TIME,
        }
    }
}

/// Outcome of a read that may be disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<V> {
    /// The read was never issued.
    Idle,
    Success(V),
    Error(ApiError),
}

impl<V> QueryState<V> {
    pub fn from_result(result: Result<V, ApiError>) -> Self {
        match result {
            Ok(v) => QueryState::Success(v),
            Err(e) => QueryState::Error(e),
        }
    }
}

type InFlight<V> = Shared<BoxFuture<'static, Result<V, ApiError>>>;

struct Entry<V> {
    value: Option<V>,
    fetched_at: Option<Instant>,
    error: Option<ApiError>,
    invalidated: bool,
    read_at: Instant,
}

impl<V> Entry<V> {
    fn empty() -> Self {
        Self {
            value: None,
            fetched_at: None,
            error: None,
            invalidated: false,
            read_at: Instant::now(),
        }
    }
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    in_flight: HashMap<K, (u64, InFlight<V>)>,
    next_ticket: u64,
}

pub struct QueryCache<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    options: CacheOptions,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                next_ticket: 0,
            })),
            options,
        }
    }

    /// Read `key`, calling `fetcher` only when no fresh value is cached and no
    /// fetch for the key is already running.
    ///
    /// A stale value is returned immediately while a refetch runs in the
    /// background; this requires a Tokio runtime.
    pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let (in_flight, stale) = {
            let mut inner = self.inner.lock().unwrap();

            // Invalidated values are never served; expired ones are served
            // while they refresh.
            let cached = inner
                .entries
                .get_mut(&key)
                .map(|entry| {
                    entry.read_at = Instant::now();
                    entry
                })
                .filter(|entry| !entry.invalidated)
                .and_then(|entry| {
                    let value = entry.value.as_ref()?;
                    let fresh = entry
                        .fetched_at
                        .is_some_and(|at| at.elapsed() < self.options.stale_time);
                    Some((value.clone(), fresh))
                });

            match cached {
                Some((value, true)) => return Ok(value),
                Some((value, false)) => {
                    let in_flight = self.join_or_start(&mut inner, key, fetcher);
                    (in_flight, Some(value))
                }
                None => (self.join_or_start(&mut inner, key, fetcher), None),
            }
        };

        match stale {
            Some(value) => {
                tokio::spawn(in_flight);
                Ok(value)
            }
            None => in_flight.await,
        }
    }

    /// Drop the cached value for `key` and fetch it again.
    pub async fn refetch<F, Fut>(&self, key: K, fetcher: F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.entries.remove(&key);
            inner.in_flight.remove(&key);
        }
        self.fetch(key, fetcher).await
    }

    fn join_or_start<F, Fut>(&self, inner: &mut Inner<K, V>, key: K, fetcher: F) -> InFlight<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        if let Some((_, in_flight)) = inner.in_flight.get(&key) {
            tracing::trace!(?key, "joining in-flight fetch");
            return in_flight.clone();
        }

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;

        let retry = self.options.retry;
        let state = Arc::clone(&self.inner);
        let task_key = key.clone();

        let fut = async move {
            let mut attempt = 0;
            let result = loop {
                match fetcher().await {
                    Ok(value) => break Ok(value),
                    Err(err) if attempt < retry => {
                        attempt += 1;
                        tracing::debug!(key = ?task_key, attempt, error = %err, "retrying failed read");
                    }
                    Err(err) => break Err(err),
                }
            };

            let mut inner = state.lock().unwrap();
            let current = matches!(inner.in_flight.get(&task_key), Some((t, _)) if *t == ticket);
            if current {
                inner.in_flight.remove(&task_key);
                let entry = inner.entries.entry(task_key).or_insert_with(Entry::empty);
                match &result {
                    Ok(value) => {
                        entry.value = Some(value.clone());
                        entry.fetched_at = Some(Instant::now());
                        entry.error = None;
                        entry.invalidated = false;
                    }
                    Err(err) => entry.error = Some(err.clone()),
                }
            } else {
                tracing::debug!(key = ?task_key, "discarding result of detached fetch");
            }
            result
        }
        .boxed()
        .shared();

        inner.in_flight.insert(key, (ticket, fut.clone()));
        self.collect_garbage(inner);
        fut
    }

    /// Drop entries that have not been read within `gc_time` and have no
    /// fetch running.
    fn collect_garbage(&self, inner: &mut Inner<K, V>) {
        let gc_time = self.options.gc_time;
        let Inner {
            entries, in_flight, ..
        } = inner;
        let before = entries.len();
        entries.retain(|key, entry| {
            in_flight.contains_key(key) || entry.read_at.elapsed() < gc_time
        });
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::trace!(dropped, "collected unused cache entries");
        }
    }

    /// Mark every entry stale and detach every outstanding fetch.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        for entry in inner.entries.values_mut() {
            entry.invalidated = true;
        }
        inner.in_flight.clear();
        self.collect_garbage(&mut inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    impl<K: Eq + Hash, V: Clone> QueryCache<K, V> {
        /// Cached value for `key`, fresh, stale or invalidated.
        fn peek(&self, key: &K) -> Option<V> {
            let inner = self.inner.lock().unwrap();
            inner.entries.get(key).and_then(|e| e.value.clone())
        }

        fn last_error(&self, key: &K) -> Option<ApiError> {
            let inner = self.inner.lock().unwrap();
            inner.entries.get(key).and_then(|e| e.error.clone())
        }

        fn is_fetching(&self, key: &K) -> bool {
            self.inner.lock().unwrap().in_flight.contains_key(key)
        }
    }

    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, Result<String, ApiError>> + Send + Sync + 'static {
        move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    fn cache(stale_time: Duration, retry: u32) -> QueryCache<String, String> {
        QueryCache::new(CacheOptions {
            stale_time,
            retry,
            ..Default::default()
        })
    }

    fn short_lived(gc_time: Duration) -> QueryCache<String, String> {
        QueryCache::new(CacheOptions {
            gc_time,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fresh_value_is_served_from_cache() {
        let cache = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));

        let a = cache.fetch("k".into(), counting_fetcher(calls.clone(), "v")).await;
        let b = cache.fetch("k".into(), counting_fetcher(calls.clone(), "v")).await;

        assert_eq!(a.unwrap(), "v");
        assert_eq!(b.unwrap(), "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&"k".to_string()).as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_request() {
        let cache = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.fetch("k".into(), counting_fetcher(calls.clone(), "v")),
            cache.fetch("k".into(), counting_fetcher(calls.clone(), "v")),
            cache.fetch("k".into(), counting_fetcher(calls.clone(), "v")),
        );

        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), ("v".into(), "v".into(), "v".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_separately() {
        let cache = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));

        let (_, _) = tokio::join!(
            cache.fetch("a".into(), counting_fetcher(calls.clone(), "v")),
            cache.fetch("b".into(), counting_fetcher(calls.clone(), "v")),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_value_is_served_while_refetching() {
        let cache = cache(Duration::from_millis(0), 0);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k".into(), counting_fetcher(calls.clone(), "old")).await.unwrap();
        let served = cache
            .fetch("k".into(), counting_fetcher(calls.clone(), "new"))
            .await
            .unwrap();
        assert_eq!(served, "old");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.peek(&"k".to_string()).as_deref(), Some("new"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_read_is_retried_once() {
        let cache: QueryCache<String, String> = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = cache
            .fetch("k".into(), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::new(500, "flaky"))
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_after_retry() {
        let cache: QueryCache<String, String> = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = cache
            .fetch("k".into(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<String, _>(ApiError::network()) }
            })
            .await;

        assert_eq!(result.unwrap_err().status, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.last_error(&"k".to_string()).map(|e| e.status), Some(0));
        assert_eq!(cache.peek(&"k".to_string()), None);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let cache = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k".into(), counting_fetcher(calls.clone(), "v1")).await.unwrap();
        cache.invalidate_all();
        // kept, but no longer served
        assert_eq!(cache.peek(&"k".to_string()).as_deref(), Some("v1"));

        let refetched = cache.fetch("k".into(), counting_fetcher(calls.clone(), "v2")).await.unwrap();
        assert_eq!(refetched, "v2");

        let cached = cache.fetch("k".into(), counting_fetcher(calls.clone(), "v3")).await.unwrap();
        assert_eq!(cached, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn detached_fetch_does_not_overwrite() {
        let cache = Arc::new(cache(Duration::from_secs(30), 0));
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = {
            let cache = Arc::clone(&cache);
            let calls = calls.clone();
            tokio::spawn(async move { cache.fetch("k".into(), counting_fetcher(calls, "before")).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.invalidate_all();

        assert_eq!(slow.await.unwrap().unwrap(), "before");
        assert_eq!(cache.peek(&"k".to_string()), None);

        let after = cache.fetch("k".into(), counting_fetcher(calls.clone(), "after")).await.unwrap();
        assert_eq!(after, "after");
    }

    #[tokio::test]
    async fn refetch_bypasses_fresh_value() {
        let cache = cache(Duration::from_secs(30), 1);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k".into(), counting_fetcher(calls.clone(), "v1")).await.unwrap();
        let again = cache.refetch("k".into(), counting_fetcher(calls.clone(), "v2")).await.unwrap();
        assert_eq!(again, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unread_entries_are_dropped_when_a_fetch_starts() {
        let cache = short_lived(Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("a".into(), counting_fetcher(calls.clone(), "v")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.fetch("b".into(), counting_fetcher(calls.clone(), "v")).await.unwrap();

        assert_eq!(cache.peek(&"a".to_string()), None);
        assert_eq!(cache.peek(&"b".to_string()).as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn recently_read_entries_survive_collection() {
        let cache = short_lived(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["a", "b", "c"] {
            cache.fetch(key.into(), counting_fetcher(calls.clone(), "v")).await.unwrap();
        }
        cache.invalidate_all();
        for key in ["a", "b", "c"] {
            assert_eq!(cache.peek(&key.to_string()).as_deref(), Some("v"));
        }
    }

    #[tokio::test]
    async fn invalidate_all_sweeps_unread_entries() {
        let cache = short_lived(Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("a".into(), counting_fetcher(calls.clone(), "v")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.invalidate_all();

        assert_eq!(cache.peek(&"a".to_string()), None);
    }

    #[tokio::test]
    async fn entry_with_running_fetch_is_kept() {
        let cache = QueryCache::new(CacheOptions {
            stale_time: Duration::ZERO,
            retry: 0,
            gc_time: Duration::ZERO,
        });
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("a".to_string(), counting_fetcher(calls.clone(), "old")).await.unwrap();
        let served = cache
            .fetch("a".to_string(), counting_fetcher(calls.clone(), "new"))
            .await
            .unwrap();
        assert_eq!(served, "old");

        // the background refresh is still running, so the sweep it triggered
        // left the entry alone
        assert!(cache.is_fetching(&"a".to_string()));
        assert_eq!(cache.peek(&"a".to_string()).as_deref(), Some("old"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.peek(&"a".to_string()).as_deref(), Some("new"));
    }

    #[test]
    fn unknown_key_has_nothing_cached() {
        let cache: QueryCache<String, String> = QueryCache::new(CacheOptions::default());
        assert_eq!(cache.peek(&"nope".to_string()), None);
        assert!(!cache.is_fetching(&"nope".to_string()));
    }
}

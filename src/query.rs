//! Query orchestration on top of the result cache.
//!
//! [`QueryClient`] is the single entry point feature code uses to read
//! data: it serves cached results, refreshes stale ones in the background,
//! shares one in-flight fetch per key and retries transport failures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::{FetchStatus, ResultCache, DEFAULT_GC_TIME};
use crate::client::Fetched;
use crate::error::FetchError;
use crate::key::QueryKey;
use crate::merge::MergeArgs;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Exponential backoff for retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub stale_time: Duration,
    pub retry: RetryPolicy,
    /// Shown while no real data exists; never written to the cache.
    pub placeholder: Option<Value>,
    /// Arguments handed to merge policies when the response is stored.
    pub merge_args: MergeArgs,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            retry: RetryPolicy::default(),
            placeholder: None,
            merge_args: MergeArgs::default(),
        }
    }
}

impl QueryOptions {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Option<Value>) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_merge_args(mut self, merge_args: MergeArgs) -> Self {
        self.merge_args = merge_args;
        self
    }
}

/// What a caller gets back for a key at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub status: FetchStatus,
    /// No real data yet and a fetch is running.
    pub is_loading: bool,
    /// A fetch for this key is in flight.
    pub is_fetching: bool,
    /// `data` is the caller-supplied placeholder.
    pub is_placeholder: bool,
    pub error: Option<FetchError>,
}

impl QueryState {
    /// Decode the payload into a typed response.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, FetchError> {
        self.data
            .as_ref()
            .map(|data| T::deserialize(data).map_err(FetchError::from))
            .transpose()
    }
}

type SharedFetch = Shared<BoxFuture<'static, ()>>;

struct Inner {
    cache: ResultCache,
    in_flight: Mutex<HashMap<QueryKey, SharedFetch>>,
    gc_time: Duration,
}

/// Cloneable handle to the cache and its in-flight fetches.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(cache: ResultCache) -> Self {
        Self::with_gc_time(cache, DEFAULT_GC_TIME)
    }

    pub fn with_gc_time(cache: ResultCache, gc_time: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                in_flight: Mutex::new(HashMap::new()),
                gc_time,
            }),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Serve `key` from cache, starting a fetch when data is missing, stale
    /// or invalidated. Never waits for the network.
    pub fn query<F, Fut>(&self, key: &QueryKey, fetch: F, options: &QueryOptions) -> QueryState
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, FetchError>> + Send + 'static,
    {
        self.collect_garbage();

        let now = Instant::now();
        match self.inner.cache.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                tracing::debug!(%key, "cache hit");
                self.inner.cache.touch(key);
            }
            Some(entry) if entry.data.is_some() => {
                tracing::debug!(%key, "serving stale data, refreshing in background");
                self.start_fetch(key, fetch, options);
            }
            _ => {
                tracing::debug!(%key, "cache miss");
                self.start_fetch(key, fetch, options);
            }
        }

        self.state(key, options)
    }

    /// Like [`QueryClient::query`] but waits for any fetch it started or
    /// joined to settle.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetch: F, options: &QueryOptions) -> QueryState
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, FetchError>> + Send + 'static,
    {
        self.query(key, fetch, options);
        self.settle(key, options).await
    }

    /// Fetch regardless of freshness. Joins a fetch already in flight for
    /// `key` instead of issuing a second request.
    pub async fn refetch<F, Fut>(&self, key: &QueryKey, fetch: F, options: &QueryOptions) -> QueryState
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, FetchError>> + Send + 'static,
    {
        tracing::debug!(%key, "refetch requested");
        self.start_fetch(key, fetch, options);
        self.settle(key, options).await
    }

    /// Wait for the in-flight fetch of `key`, if any, then snapshot it.
    pub async fn settle(&self, key: &QueryKey, options: &QueryOptions) -> QueryState {
        let pending = self.inner.in_flight.lock().get(key).cloned();
        if let Some(pending) = pending {
            pending.await;
        }
        self.state(key, options)
    }

    /// Snapshot of `key` without triggering any fetch.
    pub fn state(&self, key: &QueryKey, options: &QueryOptions) -> QueryState {
        let is_fetching = self.is_fetching(key);
        let entry = self.inner.cache.get(key);

        let (data, status, error) = match entry {
            Some(entry) => (entry.data, entry.status, entry.error),
            None => (None, FetchStatus::Idle, None),
        };

        let is_loading = data.is_none() && is_fetching;
        let (data, is_placeholder) = match data {
            Some(data) => (Some(data), false),
            None => match &options.placeholder {
                Some(placeholder) if status != FetchStatus::Error => {
                    (Some(placeholder.clone()), true)
                }
                _ => (None, false),
            },
        };

        QueryState {
            data,
            status,
            is_loading,
            is_fetching,
            is_placeholder,
            error,
        }
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner.in_flight.lock().contains_key(key)
    }

    /// Mark cached entries under `prefix` stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let count = self.inner.cache.invalidate(prefix);
        tracing::debug!(%prefix, count, "invalidated cache entries");
        count
    }

    fn collect_garbage(&self) {
        let in_flight = self.inner.in_flight.lock();
        let removed = self.inner.cache.collect_garbage(
            Instant::now(),
            self.inner.gc_time,
            |key| in_flight.contains_key(key),
        );
        if removed > 0 {
            let remaining = self.inner.cache.len();
            tracing::debug!(removed, remaining, "collected unused cache entries");
        }
    }

    /// Start a fetch for `key` or return the one already running.
    fn start_fetch<F, Fut>(&self, key: &QueryKey, fetch: F, options: &QueryOptions) -> SharedFetch
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Fetched, FetchError>> + Send + 'static,
    {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(existing) = in_flight.get(key) {
            tracing::debug!(%key, "joining in-flight fetch");
            return existing.clone();
        }

        let generation = self.inner.cache.mark_fetching(key);

        let inner = Arc::clone(&self.inner);
        let key_owned = key.clone();
        let retry = options.retry;
        let stale_time = options.stale_time;
        let merge_args = options.merge_args.clone();

        let task = async move {
            match fetch_with_retry(&key_owned, &fetch, &retry).await {
                Ok(fetched) => {
                    let partial = fetched.partial_error();
                    if let Some(err) = &partial {
                        tracing::warn!(key = %key_owned, error = %err, "response carried field errors");
                    }
                    inner.cache.record_success(
                        &key_owned,
                        fetched.data,
                        &merge_args,
                        stale_time,
                        partial,
                        generation,
                    );
                }
                Err(err) => {
                    tracing::warn!(key = %key_owned, error = %err, "fetch failed");
                    inner.cache.record_failure(&key_owned, err);
                }
            }
            inner.in_flight.lock().remove(&key_owned);
        }
        .boxed()
        .shared();

        in_flight.insert(key.clone(), task.clone());
        drop(in_flight);

        tokio::spawn(task.clone());
        task
    }
}

async fn fetch_with_retry<F, Fut>(
    key: &QueryKey,
    fetch: &F,
    retry: &RetryPolicy,
) -> Result<Fetched, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Fetched, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match fetch().await {
            Ok(fetched) => return Ok(fetched),
            Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                let delay = retry.delay(attempt - 1);
                tracing::debug!(%key, attempt, ?delay, error = %err, "retrying fetch");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

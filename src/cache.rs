//! In-memory result cache.
//!
//! Holds one [`CacheEntry`] per [`QueryKey`]. Writes go through the
//! [`MergeRegistry`]; only the query orchestrator writes, everything else
//! reads.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::FetchError;
use crate::key::QueryKey;
use crate::merge::{MergeArgs, MergeRegistry};

/// How long an unused entry is retained before garbage collection.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    /// Last successfully fetched payload, kept across failed refetches.
    pub data: Option<Value>,
    pub status: FetchStatus,
    pub fetched_at: Option<Instant>,
    pub stale_at: Option<Instant>,
    /// Most recent error for this key, including partial-data errors.
    pub error: Option<FetchError>,
    pub invalidated: bool,
    /// Bumped by every invalidation. A fetch started under an older
    /// generation lands invalidated.
    pub generation: u64,
    pub last_used: Instant,
}

impl CacheEntry {
    fn new(key: QueryKey, now: Instant) -> Self {
        Self {
            key,
            data: None,
            status: FetchStatus::Idle,
            fetched_at: None,
            stale_at: None,
            error: None,
            invalidated: false,
            generation: 0,
            last_used: now,
        }
    }

    /// Fresh data that needs no refetch. With data present, a missing
    /// `stale_at` means it never goes stale.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.data.is_some()
            && !self.invalidated
            && self.stale_at.map_or(true, |stale_at| now < stale_at)
    }
}

pub struct ResultCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    registry: MergeRegistry,
}

impl ResultCache {
    pub fn new(registry: MergeRegistry) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            registry,
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn data(&self, key: &QueryKey) -> Option<Value> {
        self.entries.lock().get(key).and_then(|e| e.data.clone())
    }

    /// Store a response, merging it with any cached data per field policy.
    pub fn put(&self, key: &QueryKey, response: Value, args: &MergeArgs) {
        self.write(key, response, args, Duration::ZERO, None, None);
    }

    /// Record a successful fetch started under `generation`.
    pub(crate) fn record_success(
        &self,
        key: &QueryKey,
        response: Value,
        args: &MergeArgs,
        stale_time: Duration,
        partial: Option<FetchError>,
        generation: u64,
    ) {
        self.write(key, response, args, stale_time, partial, Some(generation));
    }

    fn write(
        &self,
        key: &QueryKey,
        response: Value,
        args: &MergeArgs,
        stale_time: Duration,
        partial: Option<FetchError>,
        generation: Option<u64>,
    ) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), now));

        let merged = self.registry.apply(entry.data.as_ref(), response, args);
        entry.data = Some(merged);
        entry.status = FetchStatus::Success;
        entry.fetched_at = Some(now);
        entry.stale_at = now.checked_add(stale_time);
        entry.error = partial;
        entry.invalidated = generation.is_some_and(|g| g != entry.generation);
        entry.last_used = now;
    }

    /// Returns the generation the new fetch runs under.
    pub(crate) fn mark_fetching(&self, key: &QueryKey) -> u64 {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), now));
        entry.status = FetchStatus::Fetching;
        entry.last_used = now;
        entry.generation
    }

    /// Record a terminal failure. Previously cached data is left intact.
    pub(crate) fn record_failure(&self, key: &QueryKey, error: FetchError) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone(), now));
        entry.status = FetchStatus::Error;
        entry.error = Some(error);
        entry.last_used = now;
    }

    pub(crate) fn touch(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.last_used = Instant::now();
        }
    }

    /// Mark every entry under `prefix` for refetch on next access.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for entry in self.entries.lock().values_mut() {
            if entry.key.starts_with(prefix) {
                entry.invalidated = true;
                entry.generation += 1;
                count += 1;
            }
        }
        count
    }

    /// Return the first `Some` produced by `f` over entries holding data.
    /// Iteration order is unspecified.
    pub fn find_map<T>(&self, mut f: impl FnMut(&QueryKey, &Value) -> Option<T>) -> Option<T> {
        self.entries
            .lock()
            .values()
            .find_map(|entry| entry.data.as_ref().and_then(|data| f(&entry.key, data)))
    }

    /// Drop entries unused for longer than `retention`, skipping keys that
    /// still have a fetch in flight.
    pub fn collect_garbage(
        &self,
        now: Instant,
        retention: Duration,
        is_in_flight: impl Fn(&QueryKey) -> bool,
    ) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, entry| {
            now.saturating_duration_since(entry.last_used) < retention || is_in_flight(key)
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(MergeRegistry::github())
    }
}

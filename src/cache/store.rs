//! Fetch Cache Module
//!
//! Memoized, deduplicated, time-bounded access to backend-fetched resources.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, Clock, LruTracker, WatchedInputs};
use crate::error::{BackendError, FetchError};

type Outcome<V> = Result<Arc<V>, FetchError>;
type InFlight<V> = Shared<BoxFuture<'static, Outcome<V>>>;

// == Fetch Policy ==
/// Whether a fresh entry may answer a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Serve a fresh entry, fetch otherwise
    IfStale,
    /// Always fetch (still attaches to a fetch already in flight)
    Force,
}

// == Cache Options ==
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Upper bound on a single loader call
    pub loader_timeout: Option<Duration>,
    /// LRU bound on stored entries
    pub max_entries: Option<usize>,
}

// == Resource State ==
/// What a subscriber can observe about one key.
#[derive(Debug)]
pub struct ResourceState<V> {
    /// Latest known-good snapshot
    pub value: Option<Arc<V>>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// A backend call is in progress
    pub pending: bool,
    /// Most recent failure, cleared by the next success
    pub error: Option<FetchError>,
}

struct State<V> {
    entries: HashMap<String, CacheEntry<V>>,
    in_flight: HashMap<String, InFlight<V>>,
    errors: HashMap<String, FetchError>,
    lru: LruTracker,
    stats: CacheStats,
}

impl<V> State<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            errors: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
        }
    }

    // == Store ==
    /// Replaces the entry for `key` and clears its error slot.
    fn store(&mut self, key: &str, entry: CacheEntry<V>, max_entries: Option<usize>) {
        self.entries.insert(key.to_string(), entry);
        self.errors.remove(key);
        self.lru.touch(key);
        self.enforce_bound(key, max_entries);
    }

    /// Records a failure for `key`. A previous entry stays as the last good value.
    fn record_error(&mut self, key: &str, err: FetchError, max_entries: Option<usize>) {
        self.errors.insert(key.to_string(), err);
        self.lru.touch(key);
        self.enforce_bound(key, max_entries);
    }

    // == Bound ==
    /// Evicts least recently used keys until at most `max_entries` keys hold
    /// an entry or an error slot. `keep` and keys with a fetch in flight are
    /// never evicted.
    fn enforce_bound(&mut self, keep: &str, max_entries: Option<usize>) {
        if let Some(limit) = max_entries {
            while self.lru.len() > limit {
                let in_flight = &self.in_flight;
                let Some(evicted) = self
                    .lru
                    .evict_where(|k| k != keep && !in_flight.contains_key(k))
                else {
                    break;
                };
                self.entries.remove(&evicted);
                self.errors.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "Evicted least recently used key");
            }
        }
        self.stats.total_entries = self.entries.len();
    }
}

struct Inner<V> {
    state: Mutex<State<V>>,
    clock: Arc<dyn Clock>,
    options: CacheOptions,
}

impl<V> Inner<V> {
    // == Complete ==
    /// Publishes the outcome of a loader call and retires its in-flight slot.
    ///
    /// Runs under the same lock as lookups, so an attached caller can never
    /// see a cached value that predates this outcome.
    fn complete(&self, key: &str, result: Result<V, BackendError>) -> Outcome<V> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state.in_flight.remove(key);
        state.stats.in_flight = state.in_flight.len();

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                state.store(
                    key,
                    CacheEntry::new(Arc::clone(&value), now),
                    self.options.max_entries,
                );
                state.stats.record_fetch();
                debug!(key, "Fetch completed");
                Ok(value)
            }
            Err(source) => {
                // previous entry, if any, stays for the next attempt
                warn!(key, error = %source, "Fetch failed");
                let err = FetchError::loader_failure(key, source);
                state.record_error(key, err.clone(), self.options.max_entries);
                state.stats.record_failure();
                Err(err)
            }
        }
    }
}

// == Fetch Cache ==
/// Per-key memoization of backend calls with a freshness window and
/// at-most-one concurrent call per key.
///
/// Cloning is cheap and clones share state. Loaders run on spawned tokio
/// tasks, so a caller that stops waiting never cancels a fetch; the result
/// still lands in the cache.
pub struct FetchCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for FetchCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Send + Sync + 'static> FetchCache<V> {
    // == Constructor ==
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_options(clock, CacheOptions::default())
    }

    pub fn with_options(clock: Arc<dyn Clock>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::new()),
                clock,
                options,
            }),
        }
    }

    // == Get Or Fetch ==
    /// Returns the entry for `key` if it is younger than `ttl`, otherwise
    /// fetches it with `loader`.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Outcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>> + Send + 'static,
    {
        self.fetch(key, ttl, FetchPolicy::IfStale, loader).await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but a change in `inputs`
    /// since the subscription's previous call forces a fetch.
    pub async fn get_or_fetch_watched<W, F, Fut>(
        &self,
        watch: &mut WatchedInputs<W>,
        key: &str,
        ttl: Duration,
        inputs: &[W],
        loader: F,
    ) -> Outcome<V>
    where
        W: PartialEq + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>> + Send + 'static,
    {
        let policy = watch.policy_for(inputs);
        if policy == FetchPolicy::Force {
            debug!(key, "Watched input changed, forcing fetch");
        }
        self.fetch(key, ttl, policy, loader).await
    }

    /// Fetches `key` regardless of freshness.
    pub async fn refresh<F, Fut>(&self, key: &str, loader: F) -> Outcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>> + Send + 'static,
    {
        self.fetch(key, Duration::ZERO, FetchPolicy::Force, loader).await
    }

    // == Fetch ==
    /// Resolves `key` under `policy`.
    ///
    /// 1. A fetch already in flight for `key` is joined, `loader` is dropped.
    /// 2. Under `IfStale`, a fresh entry is returned.
    /// 3. Otherwise `loader` is invoked and its outcome shared with every
    ///    caller that joins before it completes.
    ///
    /// `loader` is called while the cache lock is held and must not call
    /// back into this cache before returning its future.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        policy: FetchPolicy,
        loader: F,
    ) -> Outcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, BackendError>> + Send + 'static,
    {
        if key.is_empty() {
            return Err(FetchError::InvalidKey);
        }

        let pending = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            if let Some(flight) = state.in_flight.get(key) {
                drop(loader);
                state.stats.record_join();
                debug!(key, "Joining in-flight fetch");
                flight.clone()
            } else {
                if policy == FetchPolicy::IfStale {
                    let now = self.inner.clock.now();
                    if let Some(entry) = state.entries.get(key) {
                        if entry.is_fresh(now, ttl) {
                            let value = Arc::clone(&entry.value);
                            state.stats.record_hit();
                            state.lru.touch(key);
                            debug!(key, "Serving fresh entry");
                            return Ok(value);
                        }
                    }
                }

                state.stats.record_miss();
                self.start_fetch(state, key, loader())
            }
        };

        pending.await
    }

    fn start_fetch<Fut>(&self, state: &mut State<V>, key: &str, load: Fut) -> InFlight<V>
    where
        Fut: Future<Output = Result<V, BackendError>> + Send + 'static,
    {
        let timeout = self.inner.options.loader_timeout;
        let inner = Arc::clone(&self.inner);
        let task_key = key.to_string();
        let task = tokio::spawn(async move {
            let result = run_loader(load, timeout).await;
            inner.complete(&task_key, result)
        });

        let inner = Arc::clone(&self.inner);
        let flight_key = key.to_string();
        let flight = async move {
            match task.await {
                Ok(outcome) => outcome,
                // the task was cancelled before it could publish anything
                Err(err) => inner.complete(
                    &flight_key,
                    Err(BackendError::Other(format!("Loader task failed: {err}"))),
                ),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.to_string(), flight.clone());
        state.stats.in_flight = state.in_flight.len();
        debug!(key, "Started fetch");
        flight
    }

    // == Invalidate ==
    /// Drops the stored entry for `key` so the next lookup fetches.
    ///
    /// A fetch already in flight is left running. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let removed = state.entries.remove(key).is_some();
        if removed {
            // an error slot keeps the key in the recency order
            if !state.errors.contains_key(key) {
                state.lru.remove(key);
            }
            state.stats.total_entries = state.entries.len();
            debug!(key, "Invalidated entry");
        }
        removed
    }

    // == Observation ==
    /// Snapshot of everything observable about `key`.
    pub fn state(&self, key: &str) -> ResourceState<V> {
        let state = self.inner.state.lock();
        let entry = state.entries.get(key);
        ResourceState {
            value: entry.map(|e| Arc::clone(&e.value)),
            fetched_at: entry.map(|e| e.fetched_at),
            pending: state.in_flight.contains_key(key),
            error: state.errors.get(key).cloned(),
        }
    }

    /// The stored entry for `key`, fresh or not.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner.state.lock().entries.get(key).cloned()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.state.lock().in_flight.contains_key(key)
    }

    pub fn last_error(&self, key: &str) -> Option<FetchError> {
        self.inner.state.lock().errors.get(key).cloned()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats.in_flight = state.in_flight.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Awaits a loader, converting a timeout or a panic into a backend failure.
async fn run_loader<V, Fut>(load: Fut, timeout: Option<Duration>) -> Result<V, BackendError>
where
    Fut: Future<Output = Result<V, BackendError>>,
{
    let guarded = AssertUnwindSafe(load).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(BackendError::Timeout(limit)),
        },
        None => guarded.await,
    };
    outcome.unwrap_or_else(|_| Err(BackendError::Other("Loader panicked".to_string())))
}

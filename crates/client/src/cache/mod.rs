//! In-memory response cache with request coalescing.
//!
//! Raw JSON payloads are kept for a TTL, keyed by canonical request key.
//! Concurrent requests for a key that is already being fetched join that
//! fetch instead of starting their own.
//!
//! - Entries are only created on success; failures are never cached.
//! - The in-flight entry for a key is removed when its fetch settles,
//!   whatever the outcome.
//! - A fetch, once started, runs to completion even if every caller stops
//!   waiting for it.
//! - Expired entries are swept whenever a fetch settles.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::time::Instant;

use feedback_core::Error;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>, Error>>>;

/// Whether a lookup may be served from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve live entries, join in-flight fetches.
    #[default]
    Normal,
    /// Always start a new fetch, still storing its result.
    Bypass,
}

struct CacheEntry {
    expires_at: Instant,
    payload: Arc<Value>,
    generation: u64,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct InFlight {
    generation: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
}

/// TTL cache plus in-flight map, owned by one client instance.
#[derive(Clone, Default)]
pub struct ResponseCache {
    state: Arc<Mutex<CacheState>>,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Lookup {
    Hit(Arc<Value>),
    Joined(SharedFetch),
}

/// Live entry or in-flight fetch for `key`, in that order.
fn lookup(state: &CacheState, key: &str) -> Option<Lookup> {
    if let Some(entry) = state.entries.get(key)
        && entry.is_live(Instant::now())
    {
        tracing::debug!(key = %key, "cache hit");
        return Some(Lookup::Hit(Arc::clone(&entry.payload)));
    }

    state.in_flight.get(key).map(|in_flight| {
        tracing::debug!(key = %key, "joining in-flight request");
        Lookup::Joined(in_flight.future.clone())
    })
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached payload for `key`, join its in-flight fetch, or
    /// start `fetch` and share it with later callers.
    pub async fn fetch_json_cached<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Arc<Value>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        self.fetch_json_with_mode(key, ttl, CacheMode::Normal, fetch).await
    }

    /// Like [`ResponseCache::fetch_json_cached`], with an explicit mode.
    ///
    /// `fetch` is called without the cache lock held, so it may use this
    /// cache itself.
    pub async fn fetch_json_with_mode<F, Fut>(
        &self, key: &str, ttl: Duration, mode: CacheMode, fetch: F,
    ) -> Result<Arc<Value>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        if mode == CacheMode::Normal {
            let found = lookup(&lock(&self.state), key);
            match found {
                Some(Lookup::Hit(payload)) => return Ok(payload),
                Some(Lookup::Joined(shared)) => return shared.await,
                None => tracing::debug!(key = %key, "cache miss"),
            }
        } else {
            tracing::debug!(key = %key, "cache bypassed");
        }

        let op = fetch();

        let shared = {
            let mut state = lock(&self.state);
            // Another caller may have started or finished this key while
            // `fetch` ran; the unused `op` is dropped unpolled.
            match (mode, lookup(&state, key)) {
                (CacheMode::Normal, Some(Lookup::Hit(payload))) => return Ok(payload),
                (CacheMode::Normal, Some(Lookup::Joined(shared))) => shared,
                _ => self.start(&mut state, key, ttl, op),
            }
        };

        shared.await
    }

    /// Spawn `op` and register it as the in-flight fetch for `key`.
    ///
    /// Must be called with the state lock held so the spawned task cannot
    /// settle before it is registered.
    fn start<Fut>(&self, state: &mut CacheState, key: &str, ttl: Duration, op: Fut) -> SharedFetch
    where
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        state.next_generation += 1;
        let generation = state.next_generation;
        let cache = Arc::clone(&self.state);
        let owned_key = key.to_string();

        let task = tokio::spawn(async move {
            let result = op.await.map(Arc::new);
            let mut state = lock(&cache);

            let now = Instant::now();
            state.entries.retain(|_, e| e.is_live(now));

            if let Ok(payload) = &result {
                let newer_exists = state.entries.get(&owned_key).is_some_and(|e| e.generation > generation);
                if !newer_exists {
                    let entry = CacheEntry { expires_at: now + ttl, payload: Arc::clone(payload), generation };
                    state.entries.insert(owned_key.clone(), entry);
                }
            }

            if state.in_flight.get(&owned_key).is_some_and(|f| f.generation == generation) {
                state.in_flight.remove(&owned_key);
            }

            result
        });

        let future = async move {
            task.await
                .unwrap_or_else(|e| Err(Error::Network(format!("fetch task failed: {}", e))))
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.to_string(), InFlight { generation, future: future.clone() });
        future
    }

    /// Live payload for `key`, without touching the network.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let state = lock(&self.state);
        state
            .entries
            .get(key)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| Arc::clone(&e.payload))
    }

    /// Drop the cached payload for `key`. In-flight fetches are unaffected.
    pub fn invalidate(&self, key: &str) -> bool {
        lock(&self.state).entries.remove(key).is_some()
    }

    /// Drop every cached payload.
    pub fn clear(&self) {
        lock(&self.state).entries.clear();
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = lock(&self.state);
        let before = state.entries.len();
        state.entries.retain(|_, e| e.is_live(now));
        before - state.entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_len(&self) -> usize {
        lock(&self.state).in_flight.len()
    }
}

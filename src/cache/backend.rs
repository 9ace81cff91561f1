//! Cache backend implementations.

use super::key::CacheKey;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        Self {
            data,
            created_at: now,
            ttl,
        }
    }

    /// Reaching the expiry instant exactly counts as expired.
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.created_at + self.ttl
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>>;
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration);
    /// Store only if nothing was invalidated since `generation` was observed.
    /// Returns whether the value was stored.
    async fn set_if_generation(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Duration,
        generation: u64,
    ) -> bool;
    async fn delete(&self, key: &CacheKey) -> bool;
    async fn clear(&self);
    async fn len(&self) -> usize;
    /// Counter bumped by every `delete` and `clear`.
    fn generation(&self) -> u64;
    fn name(&self) -> &'static str;
}

struct State {
    entries: LruCache<String, CacheEntry>,
    generation: u64,
}

impl State {
    fn insert(&mut self, key: &CacheKey, value: &[u8], ttl: Duration) {
        let now = Instant::now();
        if !self.entries.contains(&key.hash) && self.entries.len() >= self.entries.cap().get() {
            // Expired entries go first; only then does insertion order decide.
            let expired: Vec<String> = self
                .entries
                .iter()
                .filter(|(_, e)| e.is_expired_at(now))
                .map(|(k, _)| k.clone())
                .collect();
            for k in expired {
                self.entries.pop(&k);
            }
        }
        let entry = CacheEntry::new(value.to_vec(), ttl, now);
        if let Some((evicted, _)) = self.entries.push(key.hash.clone(), entry) {
            if evicted != key.hash {
                debug!(evicted = evicted.as_str(), "cache at capacity, evicted oldest entry");
            }
        }
    }
}

/// In-memory TTL cache with insertion-order eviction.
///
/// Reads use `peek`, so the LRU list only moves on insert: the "least recently
/// used" entry is always the least recently inserted one.
pub struct MemoryCache {
    state: Mutex<State>,
}

impl MemoryCache {
    /// A capacity of zero is treated as one.
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(State {
                entries: LruCache::new(cap),
                generation: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let mut st = self.lock();
        let expired = st.entries.peek(&key.hash)?.is_expired_at(Instant::now());
        if expired {
            st.entries.pop(&key.hash);
            return None;
        }
        st.entries.peek(&key.hash).map(|e| e.data.clone())
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) {
        self.lock().insert(key, value, ttl);
    }

    async fn set_if_generation(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let mut st = self.lock();
        if st.generation != generation {
            return false;
        }
        st.insert(key, value, ttl);
        true
    }

    async fn delete(&self, key: &CacheKey) -> bool {
        let mut st = self.lock();
        st.generation = st.generation.wrapping_add(1);
        st.entries.pop(&key.hash).is_some()
    }

    async fn clear(&self) {
        let mut st = self.lock();
        st.generation = st.generation.wrapping_add(1);
        st.entries.clear();
    }

    async fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .count()
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that stores nothing; used when caching is disabled.
pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Option<Vec<u8>> {
        None
    }
    async fn set(&self, _: &CacheKey, _: &[u8], _: Duration) {}
    async fn set_if_generation(&self, _: &CacheKey, _: &[u8], _: Duration, _: u64) -> bool {
        false
    }
    async fn delete(&self, _: &CacheKey) -> bool {
        false
    }
    async fn clear(&self) {}
    async fn len(&self) -> usize {
        0
    }
    fn generation(&self) -> u64 {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

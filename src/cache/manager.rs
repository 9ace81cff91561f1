//! Cache manager.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use super::backend::{CacheBackend, MemoryCache, NullCache};
use super::key::CacheKey;
use crate::Result;

#[derive(Debug, Clone)]
pub struct CacheConfig { pub default_ttl: Duration, pub capacity: usize, pub enabled: bool, pub max_entry_size: usize, pub key_prefix: Option<String> }

impl Default for CacheConfig {
    fn default() -> Self { Self { default_ttl: Duration::from_secs(300), capacity: 100, enabled: true, max_entry_size: 10 * 1024 * 1024, key_prefix: None } }
}

impl CacheConfig {
    pub fn new() -> Self { Self::default() }
    /// Note-shaped data: 100 entries, 5 minutes.
    pub fn notes() -> Self { Self::default() }
    /// Folder-shaped data: 50 entries, 10 minutes.
    pub fn folders() -> Self { Self { default_ttl: Duration::from_secs(600), capacity: 50, ..Self::default() } }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.default_ttl = ttl; self }
    pub fn with_capacity(mut self, capacity: usize) -> Self { self.capacity = capacity; self }
    pub fn with_enabled(mut self, enabled: bool) -> Self { self.enabled = enabled; self }
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self { self.key_prefix = Some(prefix.into()); self }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub deletes: u64, pub clears: u64, pub stale_writes: u64, pub errors: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, deletes: AtomicU64, clears: AtomicU64, stale_writes: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), deletes: AtomicU64::new(0), clears: AtomicU64::new(0), stale_writes: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            stale_writes: self.stale_writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Typed TTL cache over a [`CacheBackend`], with a default ttl and hit/miss stats.
pub struct CacheManager { config: CacheConfig, backend: Box<dyn CacheBackend>, stats: AtomicStats }

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self { Self { config, backend, stats: AtomicStats::new() } }

    /// In-memory manager sized from `config`; a disabled config gets a [`NullCache`].
    pub fn in_memory(config: CacheConfig) -> Self {
        let backend: Box<dyn CacheBackend> = if config.enabled { Box::new(MemoryCache::new(config.capacity)) } else { Box::new(NullCache::new()) };
        Self::new(config, backend)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled { return None; }
        let prefixed = self.prefix_key(key);
        match self.backend.get(&prefixed).await {
            Some(data) => match serde_json::from_slice(&data) {
                Ok(val) => { self.stats.hits.fetch_add(1, Ordering::Relaxed); Some(val) }
                Err(_) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); None }
            },
            None => { self.stats.misses.fetch_add(1, Ordering::Relaxed); None }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> { self.set_with_ttl(key, value, self.config.default_ttl).await }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<()> {
        let Some(data) = self.encode(value)? else { return Ok(()) };
        self.backend.set(&self.prefix_key(key), &data, ttl).await;
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write-through used by reads: stores only if no invalidation happened since
    /// `generation` was taken, so a slow read cannot resurrect data a write cleared.
    pub async fn set_if_generation<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>, generation: u64) -> Result<bool> {
        let Some(data) = self.encode(value)? else { return Ok(false) };
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let stored = self.backend.set_if_generation(&self.prefix_key(key), &data, ttl, generation).await;
        if stored { self.stats.sets.fetch_add(1, Ordering::Relaxed); } else { self.stats.stale_writes.fetch_add(1, Ordering::Relaxed); }
        Ok(stored)
    }

    /// Removes one entry; absent keys are not an error.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.backend.delete(&self.prefix_key(key)).await;
        if removed { self.stats.deletes.fetch_add(1, Ordering::Relaxed); }
        removed
    }

    pub async fn clear(&self) {
        self.backend.clear().await;
        self.stats.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize { self.backend.len().await }
    pub fn generation(&self) -> u64 { self.backend.generation() }
    pub fn default_ttl(&self) -> Duration { self.config.default_ttl }
    /// Effective capacity; zero when caching is disabled.
    pub fn capacity(&self) -> usize { if self.config.enabled { self.config.capacity.max(1) } else { 0 } }
    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn backend_name(&self) -> &'static str { self.backend.name() }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Option<Vec<u8>>> {
        if !self.config.enabled { return Ok(None); }
        let data = serde_json::to_vec(value).map_err(|e| { self.stats.errors.fetch_add(1, Ordering::Relaxed); e })?;
        if data.len() > self.config.max_entry_size { return Ok(None); }
        Ok(Some(data))
    }

    fn prefix_key(&self, key: &CacheKey) -> CacheKey {
        if let Some(ref p) = self.config.key_prefix { CacheKey::new(format!("{}:{}", p, key.hash)) } else { key.clone() }
    }
}

//! TTL caching for upstream reads.
//!
//! # Response Caching Module
//!
//! Each cache instance is a bounded key/value store with per-entry expiry. Entries
//! are visible only while `now < created_at + ttl`; an expired entry behaves exactly
//! like a missing key and is purged lazily. When an insert would exceed capacity,
//! expired entries are dropped first, then the least recently *inserted* entry.
//! Reads never change eviction order.
//!
//! The client owns two instances with the same design and different settings:
//!
//! | Instance | Capacity | Default ttl |
//! |----------|----------|-------------|
//! | notes    | 100      | 300 s       |
//! | folders  | 50       | 600 s       |
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Typed get/set/invalidate/clear with default ttl and statistics |
//! | [`CacheConfig`] | Capacity, ttl and enable switch |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`MemoryCache`] | In-memory backend with insertion-order eviction |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`CacheKeyGenerator`] | Derives keys from operation name and payload |
//!
//! ## Example
//!
//! ```rust
//! use ai_notes_rust::cache::{CacheConfig, CacheKey, CacheManager};
//!
//! # async fn demo() -> ai_notes_rust::Result<()> {
//! let notes = CacheManager::in_memory(CacheConfig::notes());
//! let key = CacheKey::new("get_note:n_42");
//! notes.set(&key, &serde_json::json!({"title": "Weekly sync"})).await?;
//! let hit: Option<serde_json::Value> = notes.get(&key).await;
//! assert!(hit.is_some());
//! notes.invalidate(&key).await;
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::{CacheKey, CacheKeyGenerator};
pub use manager::{CacheConfig, CacheManager, CacheStats};

use crate::cache::CacheStats;
use crate::resilience::rate_limiter::RateLimiterSnapshot;
use serde::Serialize;

/// A point-in-time view of the client's shared state.
///
/// Facts only: what the limiter and caches hold right now. Callers decide what to
/// do with it (back off, show a status line, export metrics).
#[derive(Debug, Clone)]
pub struct SignalsSnapshot {
    pub rate_limiter: RateLimiterSnapshot,
    pub notes_cache: CacheSnapshot,
    pub folders_cache: CacheSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    /// Live entries; expired ones are not counted even before they are purged.
    pub entries: usize,
    pub capacity: usize,
    pub stats: CacheStats,
}

/// Per-call facts returned by
/// [`run_resilient_with_stats`](crate::ResilientClient::run_resilient_with_stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    pub operation: String,
    pub key: String,
    /// Upstream attempts made; zero on a cache hit.
    pub attempts: u32,
    pub cache_hit: bool,
    /// Time spent waiting for a rate limit slot.
    pub limiter_wait_ms: u64,
    pub duration_ms: u64,
}

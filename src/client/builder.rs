use crate::cache::{CacheConfig, CacheKeyGenerator, CacheManager};
use crate::client::core::ResilientClient;
use crate::client::operation::{OperationKind, OperationRegistry};
use crate::config::AccessConfig;
use crate::resilience::rate_limiter::{AcquireMode, RateLimiter, RateLimiterConfig};
use crate::resilience::retry::{RetryExecutor, RetryPolicy};
use crate::transport::{HttpUpstream, Upstream};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ResilientClient`].
///
/// Keep this surface area small and predictable: an upstream is required,
/// everything else has a default.
pub struct ResilientClientBuilder {
    upstream: Option<Arc<dyn Upstream>>,
    notes_cache: CacheConfig,
    folders_cache: CacheConfig,
    rate_limit: RateLimiterConfig,
    shared_limiter: Option<Arc<RateLimiter>>,
    retry: RetryPolicy,
    acquire_mode: AcquireMode,
    default_timeout: Option<Duration>,
    registry: OperationRegistry,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            upstream: None,
            notes_cache: CacheConfig::notes(),
            folders_cache: CacheConfig::folders(),
            rate_limit: RateLimiterConfig::default(),
            shared_limiter: None,
            retry: RetryPolicy::default(),
            acquire_mode: AcquireMode::Blocking,
            default_timeout: None,
            registry: OperationRegistry::with_defaults(),
        }
    }

    /// Cache, limiter and retry settings from `config`. The upstream is still
    /// up to the caller.
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new()
            .notes_cache(config.notes_cache.clone())
            .folders_cache(config.folders_cache.clone())
            .rate_limit(config.rate_limit.clone())
            .retry_policy(config.retry.clone())
    }

    pub fn upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn notes_cache(mut self, config: CacheConfig) -> Self {
        self.notes_cache = config;
        self
    }

    pub fn folders_cache(mut self, config: CacheConfig) -> Self {
        self.folders_cache = config;
        self
    }

    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Use an existing limiter, e.g. one shared with another client that talks
    /// to the same upstream quota. Overrides [`rate_limit`](Self::rate_limit).
    pub fn shared_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.shared_limiter = Some(limiter);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Fail fast with `RateLimited` instead of waiting when the window is full.
    pub fn non_blocking(mut self) -> Self {
        self.acquire_mode = AcquireMode::NonBlocking;
        self
    }

    /// Deadline applied to every call that does not carry its own.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn register_operation(mut self, name: impl Into<String>, kind: OperationKind) -> Self {
        self.registry.register(name, kind);
        self
    }

    pub fn registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let upstream = self.upstream.ok_or_else(|| {
            Error::configuration(
                "no upstream configured",
                ErrorContext::new().with_source("client_builder"),
            )
        })?;

        let limiter = self
            .shared_limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(self.rate_limit)));

        Ok(ResilientClient {
            upstream,
            notes: Arc::new(CacheManager::in_memory(self.notes_cache)),
            folders: Arc::new(CacheManager::in_memory(self.folders_cache)),
            limiter,
            executor: RetryExecutor::new(self.retry),
            registry: self.registry,
            keys: CacheKeyGenerator::new(),
            acquire_mode: self.acquire_mode,
            default_timeout: self.default_timeout,
        })
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientClient {
    /// Client for the note service, configured entirely from `config`.
    pub fn for_notes(config: &AccessConfig) -> Result<Self> {
        ResilientClientBuilder::from_config(config)
            .upstream(Arc::new(HttpUpstream::note_service(config)?))
            .build()
    }

    /// Client for the language-model service. Its calls are pass-through, so the
    /// caches stay empty.
    pub fn for_language_model(config: &AccessConfig) -> Result<Self> {
        ResilientClientBuilder::from_config(config)
            .upstream(Arc::new(HttpUpstream::language_model(config)?))
            .build()
    }
}

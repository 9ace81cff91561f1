use crate::cache::{CacheKey, CacheKeyGenerator, CacheManager};
use crate::client::operation::{CacheScope, OperationKind, OperationRegistry};
use crate::client::signals::{CacheSnapshot, CallStats, SignalsSnapshot};
use crate::error::millis;
use crate::error_code::ErrorKind;
use crate::resilience::rate_limiter::{AcquireMode, RateLimiter};
use crate::resilience::retry::{RetryExecutor, RetryOutcome};
use crate::transport::Upstream;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-call overrides for [`ResilientClient::run_resilient_with_stats`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Absolute deadline for the whole call. Takes precedence over `timeout`.
    pub deadline: Option<Instant>,
    /// Relative deadline, measured from the start of the call.
    pub timeout: Option<Duration>,
    /// Overrides the client's limiter mode for this call.
    pub mode: Option<AcquireMode>,
    /// Skip the cache lookup for a read. The fresh result is still written through.
    pub bypass_cache: bool,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_mode(mut self, mode: AcquireMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

/// Composition root of the access layer: cache check, then admission, then the
/// retry executor, then cache update.
///
/// All state (caches, limiter) is owned by the client and shared by every call made
/// through it; clone the surrounding `Arc` to share a client between tasks.
pub struct ResilientClient {
    pub(crate) upstream: Arc<dyn Upstream>,
    pub(crate) notes: Arc<CacheManager>,
    pub(crate) folders: Arc<CacheManager>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) executor: RetryExecutor,
    pub(crate) registry: OperationRegistry,
    pub(crate) keys: CacheKeyGenerator,
    pub(crate) acquire_mode: AcquireMode,
    pub(crate) default_timeout: Option<Duration>,
}

impl ResilientClient {
    pub fn builder() -> crate::client::builder::ResilientClientBuilder {
        crate::client::builder::ResilientClientBuilder::new()
    }

    /// Run `operation` with `payload` through cache, limiter and retry.
    pub async fn run_resilient(&self, operation: &str, payload: Value) -> Result<Value> {
        self.run_resilient_with_stats(operation, payload, CallOptions::default())
            .await
            .map(|(value, _)| value)
    }

    /// Same as [`run_resilient`](Self::run_resilient), also returning call statistics.
    pub async fn run_resilient_with_stats(
        &self,
        operation: &str,
        payload: Value,
        options: CallOptions,
    ) -> Result<(Value, CallStats)> {
        let start = Instant::now();
        let deadline = options.deadline.or_else(|| {
            options
                .timeout
                .or(self.default_timeout)
                .map(|timeout| start + timeout)
        });
        let mode = options.mode.unwrap_or(self.acquire_mode);
        let key = self.keys.generate(operation, &payload);
        let mut stats = CallStats {
            operation: operation.to_string(),
            key: key.as_str().to_string(),
            ..CallStats::default()
        };

        let result = match self.registry.kind(operation) {
            OperationKind::Read { scope, ttl } => {
                let cache = self.cache(scope);
                if !options.bypass_cache {
                    if let Some(hit) = cache.get::<Value>(&key).await {
                        debug!(operation, key = key.as_str(), "cache hit");
                        stats.cache_hit = true;
                        stats.duration_ms = millis(start.elapsed());
                        return Ok((hit, stats));
                    }
                    debug!(operation, key = key.as_str(), "cache miss");
                }

                // Taken before the upstream call: a write that completes meanwhile
                // bumps the generation and the write-through below is dropped.
                let generation = cache.generation();
                let outcome = self
                    .admit_and_execute(operation, &key, &payload, deadline, mode, &mut stats)
                    .await;
                if let Ok(outcome) = &outcome {
                    match cache
                        .set_if_generation(&key, &outcome.value, ttl, generation)
                        .await
                    {
                        Ok(true) => {}
                        Ok(false) => debug!(
                            operation,
                            key = key.as_str(),
                            "cache invalidated during read, result not stored"
                        ),
                        Err(e) => warn!(operation, error = %e, "failed to store result in cache"),
                    }
                }
                outcome
            }
            OperationKind::Write { invalidates } => {
                let outcome = self
                    .admit_and_execute(operation, &key, &payload, deadline, mode, &mut stats)
                    .await;
                if outcome.is_ok() {
                    for scope in &invalidates {
                        self.cache(*scope).clear().await;
                    }
                    info!(operation, scopes = ?invalidates, "write succeeded, caches cleared");
                }
                outcome
            }
            OperationKind::PassThrough => {
                self.admit_and_execute(operation, &key, &payload, deadline, mode, &mut stats)
                    .await
            }
        };

        stats.duration_ms = millis(start.elapsed());
        match result {
            Ok(outcome) => {
                stats.attempts = outcome.attempts;
                debug!(
                    operation,
                    attempts = outcome.attempts,
                    duration_ms = stats.duration_ms,
                    "call completed"
                );
                Ok((outcome.value, stats))
            }
            Err(err) => {
                let err = err.with_context(
                    ErrorContext::new()
                        .with_operation(operation)
                        .with_key(key.as_str())
                        .with_elapsed(start.elapsed()),
                );
                log_failure(operation, &err);
                Err(err)
            }
        }
    }

    async fn admit_and_execute(
        &self,
        operation: &str,
        key: &CacheKey,
        payload: &Value,
        deadline: Option<Instant>,
        mode: AcquireMode,
        stats: &mut CallStats,
    ) -> Result<RetryOutcome<Value>> {
        let admission = self.limiter.acquire_with(mode);
        let waited = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, admission).await {
                Ok(res) => res?,
                Err(_) => {
                    return Err(Error::timeout(
                        "call deadline passed while waiting for a rate limit slot",
                        ErrorContext::new()
                            .with_attempts(0)
                            .with_source("rate_limiter"),
                    ))
                }
            },
            None => admission.await?,
        };
        stats.limiter_wait_ms = millis(waited);
        if !waited.is_zero() {
            debug!(
                operation,
                key = key.as_str(),
                wait_ms = stats.limiter_wait_ms,
                "admitted after rate limit wait"
            );
        }

        self.executor
            .execute(operation, deadline, move |attempt| async move {
                debug!(operation, attempt, "calling upstream");
                match self.upstream.call(operation, payload).await {
                    Ok(value) => Ok(value),
                    Err(failure) => {
                        let err = Error::from_upstream(failure);
                        self.feed_back(&err).await;
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Share what the upstream told us with the limiter so concurrent callers back
    /// off too. The hold is capped at the retry policy's `max_delay`, the longest
    /// the executor itself would wait on the same hint.
    async fn feed_back(&self, err: &Error) {
        if err.kind() != ErrorKind::RateLimited {
            return;
        }
        if let Some(hint) = err.retry_after() {
            let after = hint.min(self.executor.policy().max_delay);
            debug!(
                defer_ms = millis(after),
                hint_ms = millis(hint),
                "upstream rate limited, deferring admissions"
            );
            self.limiter.defer_for(after).await;
        }
    }

    fn cache(&self, scope: CacheScope) -> &CacheManager {
        match scope {
            CacheScope::Notes => &self.notes,
            CacheScope::Folders => &self.folders,
        }
    }

    pub fn notes_cache(&self) -> &Arc<CacheManager> {
        &self.notes
    }

    pub fn folders_cache(&self) -> &Arc<CacheManager> {
        &self.folders
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn upstream_name(&self) -> &'static str {
        self.upstream.name()
    }

    /// Snapshot current runtime signals (facts only).
    pub async fn signals(&self) -> SignalsSnapshot {
        SignalsSnapshot {
            rate_limiter: self.limiter.snapshot().await,
            notes_cache: snapshot_cache(&self.notes).await,
            folders_cache: snapshot_cache(&self.folders).await,
        }
    }
}

async fn snapshot_cache(cache: &CacheManager) -> CacheSnapshot {
    CacheSnapshot {
        entries: cache.len().await,
        capacity: cache.capacity(),
        stats: cache.stats(),
    }
}

fn log_failure(operation: &str, err: &Error) {
    let ctx = err.context();
    let attempts = ctx.and_then(|c| c.attempts).unwrap_or(0);
    let status = ctx.and_then(|c| c.status_code);
    match err.kind() {
        ErrorKind::Authentication => warn!(
            operation,
            attempts,
            http_status = ?status,
            error = %err,
            "upstream rejected credentials; re-check the configured API key"
        ),
        ErrorKind::Unknown => warn!(
            operation,
            attempts,
            http_status = ?status,
            error = %err,
            "unclassified upstream failure"
        ),
        kind => info!(
            operation,
            attempts,
            error_kind = kind.name(),
            http_status = ?status,
            error = %err,
            "call failed"
        ),
    }
}

use crate::error::millis;
use crate::{Error, ErrorContext, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub max_requests: usize,
    pub window: Duration,
    /// Admissions currently counted inside the trailing window.
    pub in_window: usize,
    /// Estimated wait time until a slot is available (ms), if currently full.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window. Zero disables limiting.
    pub max_requests: usize,
    /// Length of the trailing window.
    pub window: Duration,
}

impl RateLimiterConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

impl Default for RateLimiterConfig {
    /// 60 requests per 60 seconds.
    fn default() -> Self {
        Self::per_minute(60)
    }
}

/// What a caller wants when the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquireMode {
    /// Suspend until the oldest admission ages out of the window.
    #[default]
    Blocking,
    /// Fail immediately with a `RateLimited` error.
    NonBlocking,
}

#[derive(Debug)]
struct State {
    /// Admission instants, oldest first.
    admitted: VecDeque<Instant>,
    /// Set when the upstream told us to back off (retry-after).
    blocked_until: Option<Instant>,
}

/// Sliding-window-log rate limiter.
///
/// - Prune and record happen under one lock, so two callers can never both take
///   the last slot
/// - Old timestamps are pruned lazily on each admission check
/// - Best-effort fairness for async tasks
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let state = Mutex::new(State {
            admitted: VecDeque::with_capacity(cfg.max_requests.min(1024)),
            blocked_until: None,
        });
        Self { cfg, state }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn prune_locked(cfg: &RateLimiterConfig, st: &mut State, now: Instant) {
        while let Some(oldest) = st.admitted.front() {
            if now.duration_since(*oldest) >= cfg.window {
                st.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Check-and-record. `Err` carries the exact wait until a slot frees up.
    fn admit_locked(cfg: &RateLimiterConfig, st: &mut State, now: Instant) -> std::result::Result<(), Duration> {
        if let Some(until) = st.blocked_until {
            if until > now {
                return Err(until.duration_since(now));
            }
            st.blocked_until = None;
        }
        if cfg.max_requests == 0 {
            return Ok(());
        }

        Self::prune_locked(cfg, st, now);
        if st.admitted.len() < cfg.max_requests {
            st.admitted.push_back(now);
            return Ok(());
        }

        let oldest = st.admitted.front().copied().unwrap_or(now);
        Err(cfg.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Acquire one slot, sleeping as long as needed. Returns the total time waited.
    pub async fn acquire(&self) -> Duration {
        let start = Instant::now();
        loop {
            let wait = {
                let mut st = self.state.lock().await;
                match Self::admit_locked(&self.cfg, &mut st, Instant::now()) {
                    Ok(()) => return start.elapsed(),
                    Err(wait) => wait,
                }
            };
            debug!(
                wait_ms = millis(wait),
                max_requests = self.cfg.max_requests,
                "rate limit window full, waiting for a slot"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Try to acquire a slot without waiting, returns true if successful
    pub async fn try_acquire(&self) -> bool {
        let mut st = self.state.lock().await;
        Self::admit_locked(&self.cfg, &mut st, Instant::now()).is_ok()
    }

    /// Acquire according to `mode`. Non-blocking mode fails with
    /// [`Error::Admission`] (kind `RateLimited`) when the window is full.
    pub async fn acquire_with(&self, mode: AcquireMode) -> Result<Duration> {
        match mode {
            AcquireMode::Blocking => Ok(self.acquire().await),
            AcquireMode::NonBlocking => {
                let mut st = self.state.lock().await;
                match Self::admit_locked(&self.cfg, &mut st, Instant::now()) {
                    Ok(()) => Ok(Duration::ZERO),
                    Err(wait) => Err(Error::Admission {
                        message: format!(
                            "{} requests already admitted in the last {:?}",
                            st.admitted.len(),
                            self.cfg.window
                        ),
                        retry_in_ms: millis(wait),
                        context: ErrorContext::new()
                            .with_attempts(0)
                            .with_source("rate_limiter"),
                    }),
                }
            }
        }
    }

    /// Hold all admissions for `after`, e.g. when the upstream answered 429 with a
    /// retry-after hint. Never shortens an existing block.
    pub async fn defer_for(&self, after: Duration) {
        let Some(until) = Instant::now().checked_add(after) else {
            return;
        };
        let mut st = self.state.lock().await;
        st.blocked_until = Some(st.blocked_until.map_or(until, |cur| cur.max(until)));
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let mut st = self.state.lock().await;
        let now = Instant::now();
        Self::prune_locked(cfg, &mut st, now);

        // 1. Check external block first
        let mut wait_ms = st
            .blocked_until
            .filter(|until| *until > now)
            .map(|until| millis(until.duration_since(now)));

        // 2. Then the local window
        if cfg.max_requests > 0 && st.admitted.len() >= cfg.max_requests {
            if let Some(oldest) = st.admitted.front() {
                let local = cfg.window.saturating_sub(now.duration_since(*oldest));
                wait_ms = Some(wait_ms.unwrap_or(0).max(millis(local)));
            }
        }

        RateLimiterSnapshot {
            max_requests: cfg.max_requests,
            window: cfg.window,
            in_window: st.admitted.len(),
            estimated_wait_ms: wait_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.max_requests, 60);
        assert_eq!(config.window, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_rejects_past_max() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(3, Duration::from_secs(1)));

        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_acquire_waits_for_oldest_to_age_out() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(2, Duration::from_secs(1)));
        let start = Instant::now();

        assert_eq!(limiter.acquire().await, Duration::ZERO);
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(limiter.acquire().await, Duration::ZERO);

        // window - (now - oldest) = 1000 - 300
        let waited = limiter.acquire().await;
        assert!(waited >= Duration::from_millis(700) && waited < Duration::from_millis(702));
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_blocking_mode_fails_with_rate_limited() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(1, Duration::from_secs(2)));
        tokio_test::assert_ok!(limiter.acquire_with(AcquireMode::NonBlocking).await);

        let err = tokio_test::assert_err!(limiter.acquire_with(AcquireMode::NonBlocking).await);
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(err.context().and_then(|c| c.attempts), Some(0));
    }

    #[tokio::test]
    async fn test_zero_max_requests_is_unlimited() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(0, Duration::from_secs(1)));
        for _ in 0..100 {
            assert!(limiter.try_acquire().await);
        }
    }

    #[tokio::test]
    async fn test_concurrent_acquisitions_never_oversubscribe() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::new(
            5,
            Duration::from_secs(60),
        )));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.try_acquire().await }));
        }
        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defer_for_blocks_admissions_and_shows_in_snapshot() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(10, Duration::from_secs(1)));
        limiter.defer_for(Duration::from_millis(500)).await;

        let snapshot = limiter.snapshot().await;
        assert_eq!(snapshot.estimated_wait_ms, Some(500));
        assert!(!limiter.try_acquire().await);

        assert!(limiter.acquire().await >= Duration::from_millis(500));
        assert_eq!(limiter.snapshot().await.in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reports_local_wait() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(1, Duration::from_secs(1)));
        assert!(limiter.snapshot().await.estimated_wait_ms.is_none());
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(250)).await;
        let snapshot = limiter.snapshot().await;
        assert_eq!(snapshot.in_window, 1);
        assert_eq!(snapshot.estimated_wait_ms, Some(750));
    }
}

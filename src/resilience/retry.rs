use crate::error_code::ErrorKind;
use crate::error::millis;
use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Per-attempt bound. An attempt that overruns it fails as `Transient`.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            attempt_timeout: None,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (0-based: the wait after the first failure
    /// is `retry = 0`). A hint replaces the computed delay and is capped the same way.
    pub fn backoff_delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Time spent inside the executor when every attempt times out and no hints
    /// are given. `None` when attempts are unbounded in time.
    ///
    /// The executor enforces the same bound computed from the delays it actually
    /// schedules, so hinted waits extend it.
    pub fn max_elapsed(&self) -> Option<Duration> {
        let per_attempt = self.attempt_timeout?;
        let backoff: Duration = (0..self.attempts() - 1)
            .map(|retry| self.backoff_delay(retry, None))
            .sum();
        Some(backoff + per_attempt * self.attempts())
    }

    /// `attempt` is 1-based: the number of attempts already made.
    pub(crate) fn decide(&self, err: &Error, attempt: u32) -> Decision {
        if !err.is_retryable() || attempt >= self.attempts() {
            return Decision::Fail;
        }
        let hint = match err.kind() {
            ErrorKind::RateLimited => err.retry_after(),
            _ => None,
        };
        Decision::Retry {
            delay: self.backoff_delay(attempt - 1, hint),
        }
    }
}

/// Result of a successful execution.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Re-runs an async operation while it fails with a retryable error.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or runs out of
    /// attempts. `op` receives the 1-based attempt number.
    ///
    /// `deadline` bounds the whole execution, including waits between attempts. With
    /// an attempt timeout, execution is also bounded by the delays scheduled so far
    /// plus `max_attempts` attempt timeouts. When either bound passes, the call fails
    /// with [`Error::Timeout`] and is not retried.
    /// Every error returned carries the attempt count and elapsed time.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        deadline: Option<Instant>,
        mut op: F,
    ) -> Result<RetryOutcome<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let attempt_budget = self
            .policy
            .attempt_timeout
            .and_then(|t| t.checked_mul(self.policy.attempts()));
        let mut scheduled = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let budget = attempt_budget
                .and_then(|b| b.checked_add(scheduled))
                .and_then(|b| start.checked_add(b));
            let bound = match (deadline, budget) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            let outcome = self.run_attempt(op(attempt), attempt, bound).await;
            let err = match outcome {
                Ok(Some(value)) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt,
                        elapsed: start.elapsed(),
                    });
                }
                Ok(None) => {
                    let message = match deadline {
                        Some(deadline) if Instant::now() >= deadline => "call deadline exceeded",
                        _ => "retry budget exhausted",
                    };
                    return Err(deadline_exceeded(operation, message, attempt, start, None));
                }
                Err(err) => err,
            };

            let delay = match self.policy.decide(&err, attempt) {
                Decision::Fail => {
                    return Err(err.with_context(
                        ErrorContext::new()
                            .with_operation(operation)
                            .with_attempts(attempt)
                            .with_elapsed(start.elapsed()),
                    ));
                }
                Decision::Retry { delay } => delay,
            };

            if let Some(deadline) = deadline {
                if Instant::now() + delay > deadline {
                    return Err(deadline_exceeded(
                        operation,
                        "call deadline exceeded",
                        attempt,
                        start,
                        Some(&err),
                    ));
                }
            }
            scheduled = scheduled.saturating_add(delay);

            warn!(
                operation,
                attempt,
                delay_ms = millis(delay),
                error_kind = err.kind().name(),
                error = %err,
                "retry scheduled"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// `Ok(None)` means the overall deadline cut the attempt short.
    async fn run_attempt<T, Fut>(
        &self,
        fut: Fut,
        attempt: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<T>>
    where
        Fut: Future<Output = Result<T>>,
    {
        let bounded = async {
            match self.policy.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(Error::timeout(
                        format!("attempt {} exceeded {:?}", attempt, limit),
                        ErrorContext::new().with_source("retry_executor"),
                    )),
                },
                None => fut.await,
            }
        };

        match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, bounded).await {
                Ok(res) => res.map(Some),
                Err(_) => Ok(None),
            },
            None => bounded.await.map(Some),
        }
    }
}

fn deadline_exceeded(
    operation: &str,
    message: &str,
    attempts: u32,
    start: Instant,
    last: Option<&Error>,
) -> Error {
    let mut ctx = ErrorContext::new()
        .with_operation(operation)
        .with_attempts(attempts)
        .with_elapsed(start.elapsed())
        .with_source("retry_executor");
    if let Some(last) = last {
        ctx = ctx.with_details(format!("last error: {}", last));
    }
    Error::timeout(message, ctx)
}

//! # Resilience Primitives Module
//!
//! Admission control and retry for calls to rate-limited upstream services.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Sliding-window-log limiter shared by every call on a client |
//! | [`retry`] | Exponential backoff executor driven by the error taxonomy |
//!
//! ## Rate Limiter
//!
//! At most `max_requests` admissions fall inside any trailing `window`. A blocked
//! caller waits exactly until the oldest admission ages out:
//!
//! ```rust
//! use ai_notes_rust::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let limiter = RateLimiter::new(RateLimiterConfig::new(60, Duration::from_secs(60)));
//! if limiter.try_acquire().await {
//!     // Proceed with request...
//! }
//! # }
//! ```
//!
//! ## Retry
//!
//! Only `RateLimited` and `Transient` failures are retried. Delays follow
//! `base_delay * multiplier^n`, capped at `max_delay`; a rate-limited failure that
//! carries a retry-after hint waits for the hint instead.
//!
//! ```rust
//! use ai_notes_rust::resilience::retry::{RetryExecutor, RetryPolicy};
//!
//! # async fn demo() -> ai_notes_rust::Result<()> {
//! let executor = RetryExecutor::new(RetryPolicy::default().with_max_attempts(3));
//! let outcome = executor
//!     .execute("get_note", None, |_attempt| async { Ok::<_, ai_notes_rust::Error>(42) })
//!     .await?;
//! assert_eq!(outcome.value, 42);
//! # Ok(())
//! # }
//! ```

pub mod rate_limiter;
pub mod retry;

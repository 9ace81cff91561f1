//! Failure taxonomy: the closed set of error kinds and how upstream responses map onto them.
//!
//! Every failure that leaves the access layer is tagged with one [`ErrorKind`].
//! Retry decisions are made from the kind alone, so the mapping here is the single
//! place where "should we try again?" is answered.
//!
//! | Kind             | Typical source                  | Retried |
//! |------------------|---------------------------------|---------|
//! | `Validation`     | HTTP 400/422, bad caller input  | no      |
//! | `Authentication` | HTTP 401/403, rejected key      | no      |
//! | `NotFound`       | HTTP 404/410                    | no      |
//! | `RateLimited`    | HTTP 429, quota headers         | yes     |
//! | `Transient`      | HTTP 408/5xx, network, timeouts | yes     |
//! | `Unknown`        | anything else                   | no      |
//!
//! ## Example
//!
//! ```rust
//! use ai_notes_rust::error_code::ErrorKind;
//!
//! let kind = ErrorKind::from_http_status(503);
//! assert_eq!(kind, ErrorKind::Transient);
//! assert!(kind.retryable());
//! assert_eq!(ErrorKind::from_http_status(418), ErrorKind::Unknown);
//! ```

use crate::transport::UpstreamFailure;
use std::fmt;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing caller input.
    Validation,
    /// Credentials rejected by the upstream service.
    Authentication,
    /// Referenced note, folder or model does not exist.
    NotFound,
    /// Upstream quota exceeded, or local admission refused.
    RateLimited,
    /// Network failure, 5xx, or timeout.
    Transient,
    /// Unrecognized upstream condition.
    Unknown,
}

impl ErrorKind {
    /// Returns the snake_case name used in logs (e.g. `"rate_limited"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Unknown => "unknown",
        }
    }

    /// Only rate limits and transient failures are worth another attempt;
    /// `Unknown` is terminal.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient)
    }

    /// Maps a provider error code string (from the response body) to a kind.
    ///
    /// Returns `None` for codes this crate does not recognize so the caller can
    /// fall back to the HTTP status.
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let kind = match provider_code {
            "invalid_request" | "invalid_argument" | "validation_error" | "bad_request" => {
                Self::Validation
            }
            "unauthorized" | "unauthenticated" | "invalid_api_key" | "authentication_error"
            | "permission_denied" | "forbidden" => Self::Authentication,
            "not_found" | "note_not_found" | "model_not_found" => Self::NotFound,
            "rate_limited" | "rate_limit_exceeded" | "resource_exhausted" | "too_many_requests" => {
                Self::RateLimited
            }
            "server_error" | "internal" | "unavailable" | "overloaded" | "timeout"
            | "deadline_exceeded" => Self::Transient,
            _ => return None,
        };
        Some(kind)
    }

    /// Maps an HTTP status code to a kind. Unmapped statuses are `Unknown`.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 | 403 => Self::Authentication,
            404 | 410 => Self::NotFound,
            429 => Self::RateLimited,
            408 | 500..=599 => Self::Transient,
            _ => Self::Unknown,
        }
    }

    /// Deterministic classification of a raw upstream failure.
    ///
    /// A recognized provider code wins over the status; a failure with no status at
    /// all never reached the service and is treated as a network problem.
    pub fn classify(failure: &UpstreamFailure) -> Self {
        if let Some(kind) = failure.code.as_deref().and_then(Self::from_provider_code) {
            return kind;
        }
        match failure.status {
            Some(status) => Self::from_http_status(status),
            None => Self::Transient,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use crate::error_code::ErrorKind;
use crate::transport::{TransportError, UpstreamFailure};
use std::time::Duration;
use thiserror::Error;

/// Structured context attached to every failure leaving the access layer.
///
/// Carries enough information (operation, key, attempt count, elapsed time) for
/// structured logging without re-deriving the classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Logical operation name (e.g., "get_note", "update_note")
    pub operation: Option<String>,
    /// Cache key or resource id the operation targeted
    pub key: Option<String>,
    /// Number of attempts made before the failure was surfaced
    pub attempts: Option<u32>,
    /// Wall time spent on the call, including limiter waits and backoff
    pub elapsed_ms: Option<u64>,
    /// Upstream HTTP status, if the failure came from a response
    pub status_code: Option<u16>,
    /// Component that produced the error (e.g., "retry_executor", "config")
    pub source: Option<String>,
    /// Additional free-form details
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(millis(elapsed));
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Fill fields that are still empty from `other`; fields already set win.
    pub fn merge(mut self, other: ErrorContext) -> Self {
        self.operation = self.operation.or(other.operation);
        self.key = self.key.or(other.key);
        self.attempts = self.attempts.or(other.attempts);
        self.elapsed_ms = self.elapsed_ms.or(other.elapsed_ms);
        self.status_code = self.status_code.or(other.status_code);
        self.source = self.source.or(other.source);
        self.details = self.details.or(other.details);
        self
    }
}

/// Unified error type for the access layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Classified failure from an upstream call. `status` is `None` when the
    /// request never got a response.
    #[error("Remote error ({kind}): {message}{}", format_context(.context))]
    Remote {
        status: Option<u16>,
        kind: ErrorKind,
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    /// Local limiter refused admission in non-blocking mode.
    #[error("Rate limit window full: {message}{}", format_context(.context))]
    Admission {
        message: String,
        retry_in_ms: u64,
        context: ErrorContext,
    },

    #[error("Timeout: {message}{}", format_context(.context))]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {source}{}", format_context(.context))]
    Transport {
        #[source]
        source: TransportError,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {message}{}", format_context(.context))]
    Unknown {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref op) = ctx.operation {
        parts.push(format!("operation: {}", op));
    }
    if let Some(ref key) = ctx.key {
        parts.push(format!("key: {}", key));
    }
    if let Some(attempts) = ctx.attempts {
        parts.push(format!("attempts: {}", attempts));
    }
    if let Some(status) = ctx.status_code {
        parts.push(format!("status: {}", status));
    }
    if let Some(ms) = ctx.elapsed_ms {
        parts.push(format!("elapsed_ms: {}", ms));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl From<TransportError> for Error {
    fn from(source: TransportError) -> Self {
        Error::Transport {
            source,
            context: ErrorContext::new(),
        }
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn timeout(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Timeout {
            message: msg.into(),
            context,
        }
    }

    pub fn unknown(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Unknown {
            message: msg.into(),
            context,
        }
    }

    /// Classify a raw upstream failure and wrap it.
    pub fn from_upstream(failure: UpstreamFailure) -> Self {
        let kind = ErrorKind::classify(&failure);
        let mut context = ErrorContext::new().with_source("upstream");
        if let Some(status) = failure.status {
            context = context.with_status_code(status);
        }
        if let Some(id) = failure.request_id {
            context = context.with_details(format!("request_id: {}", id));
        }
        Error::Remote {
            status: failure.status,
            kind,
            message: failure.message,
            retry_after_ms: failure.retry_after.map(millis),
            context,
        }
    }

    /// The taxonomy kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } | Error::Validation { .. } => ErrorKind::Validation,
            Error::Remote { kind, .. } => *kind,
            Error::Admission { .. } => ErrorKind::RateLimited,
            Error::Timeout { .. } | Error::Transport { .. } => ErrorKind::Transient,
            Error::Serialization(_) | Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().retryable()
    }

    /// Upstream or limiter hint for when a retry may succeed.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Remote { retry_after_ms, .. } => retry_after_ms.map(Duration::from_millis),
            Error::Admission { retry_in_ms, .. } => Some(Duration::from_millis(*retry_in_ms)),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Remote { context, .. }
            | Error::Admission { context, .. }
            | Error::Timeout { context, .. }
            | Error::Transport { context, .. }
            | Error::Unknown { context, .. } => Some(context),
            Error::Serialization(_) => None,
        }
    }

    /// Attach context, keeping any fields the error already carries.
    pub fn with_context(self, extra: ErrorContext) -> Self {
        match self {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.merge(extra),
            },
            Error::Validation { message, context } => Error::Validation {
                message,
                context: context.merge(extra),
            },
            Error::Remote {
                status,
                kind,
                message,
                retry_after_ms,
                context,
            } => Error::Remote {
                status,
                kind,
                message,
                retry_after_ms,
                context: context.merge(extra),
            },
            Error::Admission {
                message,
                retry_in_ms,
                context,
            } => Error::Admission {
                message,
                retry_in_ms,
                context: context.merge(extra),
            },
            Error::Timeout { message, context } => Error::Timeout {
                message,
                context: context.merge(extra),
            },
            Error::Transport { source, context } => Error::Transport {
                source,
                context: context.merge(extra),
            },
            Error::Unknown { message, context } => Error::Unknown {
                message,
                context: context.merge(extra),
            },
            Error::Serialization(e) => Error::Unknown {
                message: e.to_string(),
                context: extra.with_source("serialization"),
            },
        }
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::validation("missing id", ErrorContext::new());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());

        let err = Error::timeout("attempt timed out", ErrorContext::new());
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());

        let err = Error::Admission {
            message: "full".into(),
            retry_in_ms: 250,
            context: ErrorContext::new(),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_with_context_keeps_existing_fields() {
        let err = Error::validation(
            "bad",
            ErrorContext::new().with_operation("get_note").with_key("n_1"),
        )
        .with_context(
            ErrorContext::new()
                .with_operation("ignored")
                .with_attempts(1),
        );
        let ctx = err.context().unwrap();
        assert_eq!(ctx.operation.as_deref(), Some("get_note"));
        assert_eq!(ctx.key.as_deref(), Some("n_1"));
        assert_eq!(ctx.attempts, Some(1));
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::from_upstream(UpstreamFailure::http(404, "no such note"))
            .with_context(ErrorContext::new().with_operation("get_note").with_attempts(1));
        let text = err.to_string();
        assert!(text.contains("status: 404"));
        assert!(text.contains("not_found"));
        assert!(text.contains("operation: get_note"));
        assert!(text.contains("attempts: 1"));
    }

    #[test]
    fn test_from_upstream_keeps_retry_after_and_request_id() {
        let failure = UpstreamFailure::http(429, "slow down")
            .with_retry_after(Duration::from_secs(3))
            .with_request_id("req-1");
        let err = Error::from_upstream(failure);
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        let ctx = err.context().unwrap();
        assert_eq!(ctx.status_code, Some(429));
        assert_eq!(ctx.details.as_deref(), Some("request_id: req-1"));
    }

    #[test]
    fn test_huge_durations_saturate() {
        let err = Error::from_upstream(
            UpstreamFailure::http(429, "come back later").with_retry_after(Duration::MAX),
        )
        .with_context(ErrorContext::new().with_elapsed(Duration::MAX));
        assert_eq!(err.retry_after(), Some(Duration::from_millis(u64::MAX)));
        assert_eq!(err.context().and_then(|c| c.elapsed_ms), Some(u64::MAX));
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
    }

    #[test]
    fn test_network_failure_has_no_status() {
        let err = Error::from_upstream(UpstreamFailure::network("connection refused"));
        assert!(matches!(err, Error::Remote { status: None, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_serialization_error_becomes_unknown_with_context() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(raw).with_context(ErrorContext::new().with_operation("get_note"));
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(
            err.context().and_then(|c| c.operation.as_deref()),
            Some("get_note")
        );
    }
}

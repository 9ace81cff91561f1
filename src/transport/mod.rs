//! Upstream boundary: the request/response call the access layer wraps.
//!
//! An [`Upstream`] takes an operation name and a JSON payload and returns either a
//! success payload or an [`UpstreamFailure`] carrying whatever the service told us
//! (status, error code, retry-after). Classification into an
//! [`ErrorKind`](crate::error_code::ErrorKind) happens in the client, not here.

mod http;

pub use http::{HttpUpstream, ServiceKind, TransportError};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Raw failure as observed at the upstream boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// HTTP status; `None` when the request never got a response.
    pub status: Option<u16>,
    /// Provider error code from the response body, lowercased.
    pub code: Option<String>,
    pub message: String,
    /// Retry-after hint, usually from a 429 response.
    pub retry_after: Option<Duration>,
    pub request_id: Option<String>,
}

impl UpstreamFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
            retry_after: None,
            request_id: None,
        }
    }

    /// Connection-level failure (refused, reset, timed out).
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            retry_after: None,
            request_id: None,
        }
    }

    /// The request could not even be built from the caller's payload.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::network(message).with_code("invalid_request")
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, after: Duration) -> Self {
        self.retry_after = Some(after);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A remote service the client can call.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(
        &self,
        operation: &str,
        payload: &Value,
    ) -> std::result::Result<Value, UpstreamFailure>;

    fn name(&self) -> &'static str;
}

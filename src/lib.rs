//! # ai-notes-rust
//!
//! Resilient API access layer for an AI-assisted note client.
//!
//! ## Overview
//!
//! Every outbound call to the note service or the language-model service goes
//! through a [`ResilientClient`], which combines:
//!
//! - **TTL caching**: bounded caches with per-entry expiry avoid redundant reads
//! - **Rate limiting**: a sliding-window limiter keeps throughput under upstream quotas
//! - **Retry/backoff**: transient and rate-limited failures are replayed on an
//!   exponential schedule; everything else fails fast
//!
//! Reads go cache check → admission → execution → cache update. Writes skip the
//! cache check and clear the caches they could have staled once they succeed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_notes_rust::{AccessConfig, NoteDraft, ResilientClient};
//!
//! #[tokio::main]
//! async fn main() -> ai_notes_rust::Result<()> {
//!     let config = AccessConfig::from_env()?;
//!     ai_notes_rust::logging::init(&config.log_level);
//!
//!     let client = ResilientClient::for_notes(&config)?;
//!     let note = client
//!         .create_note(&NoteDraft::new("Weekly sync", "- shipped the importer"))
//!         .await?;
//!
//!     // Served from the notes cache on the second call
//!     let again = client.get_note(&note.id).await?;
//!     let again = client.get_note(&again.id).await?;
//!     println!("{}", again.title);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Resilient client, builder, operation registry, typed helpers |
//! | [`cache`] | TTL caches with insertion-order eviction |
//! | [`resilience`] | Rate limiter and retry executor |
//! | [`error_code`] | Error taxonomy and classification |
//! | [`transport`] | Upstream boundary and the HTTP implementation |
//! | [`types`] | Note and folder payloads |
//! | [`config`] | Configuration loaded from the environment |
//! | [`logging`] | tracing-subscriber setup |

pub mod cache;
pub mod client;
pub mod config;
pub mod error_code;
pub mod logging;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{
    CallOptions, CallStats, CacheScope, OperationKind, OperationRegistry, ResilientClient,
    ResilientClientBuilder, SignalsSnapshot,
};
pub use config::AccessConfig;
pub use error_code::ErrorKind;
pub use resilience::rate_limiter::{AcquireMode, RateLimiter, RateLimiterConfig};
pub use resilience::retry::{RetryExecutor, RetryPolicy};
pub use transport::{HttpUpstream, Upstream, UpstreamFailure};
pub use types::{Folder, FolderDraft, Note, NoteDraft};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

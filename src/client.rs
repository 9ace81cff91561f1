//! Resilient client: the single entry point for calls to an upstream service.
//!
//! Keep the public surface small and predictable. Implementation details are split
//! into submodules under `src/client/`.

pub mod builder;
pub mod core;
mod notes;
pub mod operation;
pub mod signals;

pub use builder::ResilientClientBuilder;
pub use self::core::{CallOptions, ResilientClient};
pub use operation::{CacheScope, OperationKind, OperationRegistry};
pub use signals::{CacheSnapshot, CallStats, SignalsSnapshot};

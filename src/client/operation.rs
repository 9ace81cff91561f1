//! Operation registry: how each named operation interacts with the caches.

use std::collections::HashMap;
use std::time::Duration;

/// Which cache instance an operation reads from or invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Notes,
    Folders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Cache-first; successful results are written through to `scope`.
    /// `ttl` overrides the cache's default when set.
    Read {
        scope: CacheScope,
        ttl: Option<Duration>,
    },
    /// Never served from cache; on success every scope listed is cleared.
    Write { invalidates: Vec<CacheScope> },
    /// Limiter and retry only, no caching.
    PassThrough,
}

impl OperationKind {
    pub fn read(scope: CacheScope) -> Self {
        OperationKind::Read { scope, ttl: None }
    }

    pub fn write(invalidates: &[CacheScope]) -> Self {
        OperationKind::Write {
            invalidates: invalidates.to_vec(),
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, OperationKind::Read { .. })
    }
}

/// Maps operation names to their [`OperationKind`]. Names that were never
/// registered run as [`OperationKind::PassThrough`].
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    ops: HashMap<String, OperationKind>,
}

impl OperationRegistry {
    pub fn empty() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// Note service reads and writes, plus `generate` as pass-through.
    ///
    /// A note may be listed under a folder, so folder writes clear both caches.
    pub fn with_defaults() -> Self {
        use CacheScope::{Folders, Notes};

        let mut reg = Self::empty();
        for name in ["get_note", "search_notes", "list_notes"] {
            reg.register(name, OperationKind::read(Notes));
        }
        for name in ["list_folders", "search_folder"] {
            reg.register(name, OperationKind::read(Folders));
        }
        for name in ["create_note", "update_note", "delete_note"] {
            reg.register(name, OperationKind::write(&[Notes]));
        }
        for name in ["create_folder", "rename_folder", "delete_folder"] {
            reg.register(name, OperationKind::write(&[Notes, Folders]));
        }
        reg.register("generate", OperationKind::PassThrough);
        reg
    }

    /// Insert or replace; returns the previous kind if there was one.
    pub fn register(&mut self, name: impl Into<String>, kind: OperationKind) -> Option<OperationKind> {
        self.ops.insert(name.into(), kind)
    }

    pub fn kind(&self, name: &str) -> OperationKind {
        self.ops
            .get(name)
            .cloned()
            .unwrap_or(OperationKind::PassThrough)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

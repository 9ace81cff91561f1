//! Cache key generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub operation: Option<String>,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self { Self { hash: hash.into(), operation: None } }
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self { self.operation = Some(operation.into()); self }
    pub fn as_str(&self) -> &str { &self.hash }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.hash) }
}

impl From<&str> for CacheKey { fn from(s: &str) -> Self { Self::new(s) } }
impl From<String> for CacheKey { fn from(s: String) -> Self { Self::new(s) } }

/// Derives keys as `<operation>:<sha256 of the canonical payload>`.
///
/// `serde_json::Map` keeps keys sorted, so two payloads with the same fields in a
/// different order produce the same key.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    pub fn new() -> Self { Self }

    pub fn generate(&self, operation: &str, payload: &Value) -> CacheKey {
        let canonical = serde_json::to_string(payload).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical.as_bytes());
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        CacheKey::new(format!("{}:{}", operation, hash)).with_operation(operation)
    }
}

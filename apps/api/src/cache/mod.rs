//! TTL response cache in front of the GitHub fetcher.
//!
//! Values are JSON documents keyed by username. Backends are swappable at
//! startup; the analyzer never sees the cache.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod file;
pub mod memory;
pub mod redis_cache;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the value if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn invalidate(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every entry; returns how many were removed.
    async fn clear(&self) -> Result<usize, CacheError>;

    fn backend(&self) -> &'static str;
}

/// Stored form for backends without native expiry.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub expires_at: i64,
    pub value: Value,
}

/// Keys become file names and redis keys; anything outside `[a-z0-9_-]` is replaced.
pub(crate) fn sanitize_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

//! # Connections Module
//!
//! This module handles the key-value store that backs the quote cache. The
//! store is always passed into the service as an explicit dependency, never
//! held as a module-level singleton, so tests can substitute the in-memory
//! implementation.
//!
//! ## Contained Modules:
//!
//! - **`cache_memory`**: process-local store with passive TTL expiry.
//! - **`cache_redis`** (feature `connections`): shared Redis store.
//! - **`keys`**: the key namespaces used by the service.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Module for the in-memory cache store.
pub mod cache_memory;
/// Module for Redis cache operations and connection handling.
#[cfg(feature = "connections")]
pub mod cache_redis;
/// Cache key namespaces.
pub mod keys;

pub use cache_memory::MemoryCache;
#[cfg(feature = "connections")]
pub use cache_redis::RedisCache;

/// Failures of the backing store. These never reach API callers: the quote
/// service logs them and carries on without caching.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cache command failed: {0}")]
    Command(String),
}

/// The subset of key-value operations the quote service relies on.
///
/// Values are opaque strings (JSON documents in practice). Patterns follow
/// Redis `KEYS` glob syntax.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` with the given expiry, overwriting any
    /// existing entry.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes `keys` and returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Lists live keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}

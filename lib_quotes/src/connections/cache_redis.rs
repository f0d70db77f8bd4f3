//! # Redis Cache Implementation
//!
//! Provides an asynchronous wrapper for the Redis key-value operations the
//! quote service needs: `GET`, `SET .. EX`, `DEL` and `KEYS`.
//!
//! The connection is established lazily on first use, so the service starts
//! (and keeps serving uncached) while Redis is still down. Every command is
//! bounded by `op_timeout`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{CacheError, CacheStore};

/// A handler for Redis cache interactions.
pub struct RedisCache {
    /// The internal Redis client instance.
    client: Client,
    /// Multiplexed, auto-reconnecting connection, created on first use.
    manager: OnceCell<ConnectionManager>,
    /// Upper bound for connecting and for each command.
    op_timeout: Duration,
}

impl RedisCache {
    /// Creates a new RedisCache from a connection string.
    ///
    /// Only the URL is validated here; no network traffic happens until the
    /// first command.
    ///
    /// # Arguments
    /// * `url` - The redis URL (e.g., "redis://127.0.0.1/").
    /// * `op_timeout` - Timeout applied to every cache command.
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        // Open the client; this parses the URL but does not connect
        let client = Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
            op_timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = self
                    .bounded(self.client.get_connection_manager())
                    .await?;
                info!("Connected to Redis cache store");
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_redis_error(e)),
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }
}

fn map_redis_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        CacheError::Unavailable(e.to_string())
    } else {
        CacheError::Command(e.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // Redis rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed = self.bounded(conn.del::<_, u64>(keys)).await?;
        debug!(requested = keys.len(), removed, "Deleted cache keys");
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.keys::<_, Vec<String>>(pattern)).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

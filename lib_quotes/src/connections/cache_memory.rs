//! # In-Memory Cache Store
//!
//! Process-local stand-in for Redis. Used when no Redis URL is configured and
//! as the fake store in tests. Expiry is passive: stale entries are dropped
//! when touched, mirroring what callers observe from Redis. Writes also sweep
//! every dead entry at most once per [`SWEEP_INTERVAL`], so keys that are
//! never read again (free-text searches) do not accumulate.

use async_trait::async_trait;
use glob::Pattern;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::{CacheError, CacheStore};

/// Minimum spacing between full sweeps of expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

struct Store {
    entries: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Store {
    fn sweep_if_due(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) >= SWEEP_INTERVAL {
            self.entries.retain(|_, entry| entry.is_live(now));
            self.last_sweep = now;
        }
    }
}

/// A `HashMap` behind a mutex. The lock is never held across an await.
pub struct MemoryCache {
    store: Mutex<Store>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|store| store.entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Entries held in memory, expired or not.
    #[cfg(test)]
    fn resident(&self) -> usize {
        self.lock().map(|store| store.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>, CacheError> {
        self.store
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut store = self.lock()?;
        if let Some(entry) = store.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
            store.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };
        let mut store = self.lock()?;
        store.sweep_if_due(now);
        store.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut store = self.lock()?;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = store.entries.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = Pattern::new(pattern)
            .map_err(|e| CacheError::Command(format!("bad key pattern {:?}: {}", pattern, e)))?;
        let now = Instant::now();
        let mut store = self.lock()?;
        store.entries.retain(|_, entry| entry.is_live(now));
        store.last_sweep = now;

        let mut found: Vec<String> = store
            .entries
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect();
        found.sort();
        Ok(found)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

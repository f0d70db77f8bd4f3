//! # Quote Service
//!
//! Cache-aside reads for quotes, intraday series and symbol search. Each read
//! follows the same flow:
//!
//! 1. validate the input, before any I/O;
//! 2. look the key up in the cache store and return a hit as-is;
//! 3. on a miss, synthesize (simulation mode, or no provider configured) or
//!    call the provider under a timeout;
//! 4. on provider failure, apply the [`FallbackPolicy`];
//! 5. write the validated result back with the namespace TTL.
//!
//! Cache failures never reach the caller. They are logged and the request
//! proceeds as if the cache were empty.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::{FallbackPolicy, ServiceConfig};
use crate::connections::{keys, CacheError, CacheStore};
use crate::errors::QuoteError;
use crate::markets::clock::{Clock, SystemClock};
use crate::markets::marketstatus::{is_market_open, market_status_at, MarketStatus};
use crate::markets::provider::QuoteProvider;
use crate::markets::simulated;
use crate::models::series::normalize_keywords;
use crate::models::{BatchEntry, Interval, Served, ServedIntraday, ServedQuote, ServedSearch, Symbol};

/// Spaces out provider calls inside a batch.
struct Pacer {
    delay: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay, last_call: None }
    }

    /// Waits until `delay` has passed since the previous provider call.
    async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            tokio::time::sleep_until(last + self.delay).await;
        }
        self.last_call = Some(Instant::now());
    }
}

/// Mediates every read of market data.
pub struct QuoteService {
    cache: Arc<dyn CacheStore>,
    provider: Option<Arc<dyn QuoteProvider>>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl QuoteService {
    /// Creates a service on the system clock.
    ///
    /// # Arguments
    /// * `cache` - Backing store for every namespace.
    /// * `provider` - Live data source. `None` means every miss is synthesized.
    /// * `config` - TTLs, timeouts, pacing and fallback policy.
    pub fn new(cache: Arc<dyn CacheStore>, provider: Option<Arc<dyn QuoteProvider>>, config: ServiceConfig) -> Self {
        Self {
            cache,
            provider,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replaces the clock used for market hours and timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cache_name(&self) -> &'static str {
        self.cache.name()
    }

    /// Identifier of the provider consulted on a miss, `None` when simulating.
    pub fn provider_id(&self) -> Option<&'static str> {
        self.live_provider().map(|p| p.id())
    }

    fn live_provider(&self) -> Option<Arc<dyn QuoteProvider>> {
        if self.config.simulation_mode {
            None
        } else {
            self.provider.clone()
        }
    }

    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Malformed cache entry, treating as a miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache = self.cache.name(), key, error = %e, "Cache read failed, continuing without cache");
                None
            }
        }
    }

    async fn cache_put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set_ex(key, &raw, ttl).await {
            warn!(cache = self.cache.name(), key, error = %e, "Cache write failed");
        }
    }

    /// The shared cache-then-fetch flow.
    ///
    /// # Arguments
    /// * `key` - Cache key of the value.
    /// * `ttl` - Expiry of the written entry.
    /// * `limit` - Provider timeout.
    /// * `pacer` - Batch pacing, waited on only when the provider is called.
    /// * `fetch` - Provider call, including any validation of its result.
    /// * `synthesize` - Simulated stand-in.
    async fn serve<T, F, Fut, S>(
        &self,
        key: &str,
        ttl: Duration,
        limit: Duration,
        pacer: Option<&mut Pacer>,
        fetch: F,
        synthesize: S,
    ) -> Result<Served<T>, QuoteError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Arc<dyn QuoteProvider>, DateTime<Utc>) -> Fut,
        Fut: Future<Output = Result<T, QuoteError>>,
        S: FnOnce(DateTime<Utc>) -> T,
    {
        if let Some(hit) = self.cache_get::<T>(key).await {
            debug!(key, "Cache hit");
            return Ok(Served::from_cache(hit));
        }

        let value = match self.live_provider() {
            None => {
                debug!(key, "Cache miss, synthesizing");
                synthesize(self.clock.now())
            }
            Some(provider) => {
                if let Some(pacer) = pacer {
                    pacer.wait().await;
                }
                // read after pacing so fetched_at and the open check match the call
                let now = self.clock.now();
                let provider_id = provider.id();
                debug!(key, provider = provider_id, "Cache miss, calling provider");

                let result = match tokio::time::timeout(limit, fetch(provider, now)).await {
                    Ok(result) => result,
                    Err(_) => Err(QuoteError::UpstreamTimeout {
                        provider: provider_id.to_string(),
                    }),
                };

                match result {
                    Ok(value) => value,
                    Err(e) if e.is_upstream() && self.config.fallback_policy == FallbackPolicy::Synthesize => {
                        warn!(key, provider = provider_id, error = %e, "Provider failed, serving synthesized data");
                        synthesize(now)
                    }
                    Err(e) => {
                        warn!(key, provider = provider_id, error = %e, "Provider failed");
                        return Err(e);
                    }
                }
            }
        };

        self.cache_put(key, &value, ttl).await;
        Ok(Served::fresh(value))
    }

    async fn quote_for(&self, symbol: &Symbol, pacer: Option<&mut Pacer>) -> Result<ServedQuote, QuoteError> {
        self.serve(
            &keys::quote(symbol),
            self.config.quote_ttl(),
            self.config.quote_timeout(),
            pacer,
            move |provider, now| async move {
                let mut quote = provider.global_quote(symbol).await?.ensure_priced()?;
                quote.fetched_at = now;
                if !is_market_open(now) {
                    quote.apply_closed_market_estimate();
                }
                Ok(quote)
            },
            move |now| simulated::quote(symbol, now),
        )
        .await
    }

    /// Latest quote for one symbol.
    ///
    /// # Errors
    /// `InvalidSymbol` before any I/O; under the strict policy, whatever the
    /// provider failed with.
    pub async fn get_quote(&self, symbol: &str) -> Result<ServedQuote, QuoteError> {
        let symbol = Symbol::parse(symbol)?;
        self.quote_for(&symbol, None).await
    }

    /// Quotes for up to `max_batch_size` symbols, in input order.
    ///
    /// Symbols are processed one after another. Consecutive provider calls are
    /// spaced by `batch_delay`; cache hits and synthesized quotes are not.
    /// Per-symbol failures are reported inline.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty list, a list over the cap, or duplicate
    /// symbols after normalization. The list is never truncated.
    pub async fn get_batch_quotes(&self, symbols: &[String]) -> Result<Vec<BatchEntry>, QuoteError> {
        if symbols.is_empty() {
            return Err(QuoteError::InvalidRequest("at least one symbol is required".to_string()));
        }
        let cap = self.config.max_batch_size;
        if symbols.len() > cap {
            return Err(QuoteError::InvalidRequest(format!(
                "at most {} symbols per batch, got {}",
                cap,
                symbols.len()
            )));
        }
        let mut seen = HashSet::with_capacity(symbols.len());
        for raw in symbols {
            let normalized = raw.trim().to_ascii_uppercase();
            if !seen.insert(normalized.clone()) {
                return Err(QuoteError::InvalidRequest(format!("duplicate symbol {}", normalized)));
            }
        }

        let mut pacer = Pacer::new(self.config.batch_delay());
        let mut entries = Vec::with_capacity(symbols.len());
        for raw in symbols {
            let entry = match Symbol::parse(raw) {
                Ok(symbol) => match self.quote_for(&symbol, Some(&mut pacer)).await {
                    Ok(quote) => BatchEntry::Quote(quote),
                    Err(e) => BatchEntry::failed(raw, &e),
                },
                Err(e) => BatchEntry::failed(raw, &e),
            };
            entries.push(entry);
        }

        let failed = entries.iter().filter(|e| e.quote().is_none()).count();
        info!(requested = symbols.len(), failed, "Batch quotes served");
        Ok(entries)
    }

    /// Regular-session status on the service clock. Never calls out.
    pub async fn get_market_status(&self) -> Served<MarketStatus> {
        if let Some(status) = self.cache_get::<MarketStatus>(keys::MARKET_STATUS_KEY).await {
            return Served::from_cache(status);
        }
        let status = market_status_at(self.clock.now());
        self.cache_put(keys::MARKET_STATUS_KEY, &status, self.config.status_ttl()).await;
        Served::fresh(status)
    }

    async fn delete_patterns(&self, patterns: &[String]) -> Result<u64, CacheError> {
        let mut matched = Vec::new();
        for pattern in patterns {
            matched.extend(self.cache.keys(pattern).await?);
        }
        if matched.is_empty() {
            return Ok(0);
        }
        self.cache.delete(&matched).await
    }

    /// Removes cached quotes, series and searches, for one symbol or for all.
    /// The market status entry is left alone.
    ///
    /// # Returns
    /// The number of keys removed; `0` when the store is unreachable.
    pub async fn clear_cache(&self, symbol: Option<&str>) -> Result<u64, QuoteError> {
        let patterns = match symbol {
            Some(raw) => keys::symbol_patterns(&Symbol::parse(raw)?),
            None => keys::all_patterns(),
        };

        match self.delete_patterns(&patterns).await {
            Ok(removed) => {
                info!(?patterns, removed, "Cache cleared");
                Ok(removed)
            }
            Err(e) => {
                warn!(cache = self.cache.name(), error = %e, "Cache clear failed");
                Ok(0)
            }
        }
    }

    /// Intraday bars for one symbol, newest first.
    pub async fn get_intraday(&self, symbol: &str, interval: Interval) -> Result<ServedIntraday, QuoteError> {
        let symbol = Symbol::parse(symbol)?;
        let symbol = &symbol;
        self.serve(
            &keys::intraday(symbol, interval),
            self.config.intraday_ttl(),
            self.config.series_timeout(),
            None,
            move |provider, now| async move {
                let mut series = provider.intraday(symbol, interval).await?;
                series.fetched_at = now;
                Ok(series)
            },
            move |now| simulated::intraday(symbol, interval, now),
        )
        .await
    }

    /// Symbol lookup by free-text keywords.
    ///
    /// # Errors
    /// `InvalidRequest` when the trimmed keywords are empty, longer than 50
    /// characters, or contain glob metacharacters.
    pub async fn search_symbols(&self, keywords: &str) -> Result<ServedSearch, QuoteError> {
        let keywords = normalize_keywords(keywords)?;
        let keywords = keywords.as_str();
        self.serve(
            &keys::search(keywords),
            self.config.search_ttl(),
            self.config.quote_timeout(),
            None,
            move |provider, now| async move {
                let mut search = provider.search(keywords).await?;
                search.fetched_at = now;
                Ok(search)
            },
            move |now| simulated::search(keywords, now),
        )
        .await
    }
}

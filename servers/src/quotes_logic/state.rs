use anyhow::{Context, Result};
use lib_quotes::connections::RedisCache;
use lib_quotes::markets::alphavantage::AlphaVantageClient;
use lib_quotes::{CacheStore, MemoryCache, QuoteProvider, QuoteService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::config::Config;

/// Shared handler state. Cloning is cheap: everything sits behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuoteService>,
}

impl AppState {
    pub fn new(service: QuoteService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Wires the cache store and the provider from the resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let service_config = config.service_config()?;

        let cache: Arc<dyn CacheStore> = match config.redis_url() {
            Some(url) => {
                let redis = RedisCache::new(url, config.cache_timeout()).context("Invalid Redis URL")?;
                info!(timeout_ms = config.cache_timeout().as_millis() as u64, "Using Redis cache");
                Arc::new(redis)
            }
            None => {
                info!("No Redis URL configured, using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let provider: Option<Arc<dyn QuoteProvider>> = match config.api_key() {
            _ if service_config.simulation_mode => {
                info!("Simulation mode: the provider will not be called");
                None
            }
            Some(key) => {
                // transport ceiling; the service enforces the per-operation timeouts
                let ceiling = Duration::from_millis(service_config.quote_timeout_ms.max(service_config.series_timeout_ms));
                let client = AlphaVantageClient::new(config.base_url(), key, ceiling)
                    .with_context(|| format!("Invalid Alpha Vantage base URL {}", config.base_url()))?;
                info!(base_url = config.base_url(), "Using Alpha Vantage provider");
                Some(Arc::new(client))
            }
            None => {
                warn!("No Alpha Vantage API key configured, serving simulated data");
                None
            }
        };

        Ok(Self::new(QuoteService::new(cache, provider, service_config)))
    }
}

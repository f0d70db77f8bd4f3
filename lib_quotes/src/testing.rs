//! Test doubles shared by the service tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::connections::{CacheError, CacheStore};
use crate::errors::QuoteError;
use crate::markets::provider::QuoteProvider;
use crate::markets::simulated;
use crate::models::{IntradaySeries, Interval, Quote, QuoteSource, Symbol, SymbolSearch};

pub(crate) const FAKE_PROVIDER_ID: &str = "FAKE";

/// A provider that answers from fixed data and counts its calls.
#[derive(Default)]
pub(crate) struct FakeProvider {
    calls: AtomicUsize,
    failure: Option<QuoteError>,
    unknown: Vec<String>,
    latency: Option<Duration>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `err`.
    pub(crate) fn failing(mut self, err: QuoteError) -> Self {
        self.failure = Some(err);
        self
    }

    /// These symbols answer `NotFound`.
    pub(crate) fn unknown(mut self, symbols: &[&str]) -> Self {
        self.unknown = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every call sleeps this long (tokio time) before answering.
    pub(crate) fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// price 175.50, high 178.00, previous close 173.00
    pub(crate) fn sample_quote(symbol: &Symbol) -> Quote {
        Quote {
            symbol: symbol.clone(),
            price: 175.5,
            change: 2.5,
            change_percent: 1.4451,
            volume: 48_000_000,
            open: 173.5,
            high: 178.0,
            low: 172.0,
            previous_close: 173.0,
            last_updated: "2024-01-19".to_string(),
            fetched_at: Utc::now(),
            source: QuoteSource::Provider,
            market_closed_estimate: false,
        }
    }

    async fn enter(&self, subject: &str) -> Result<(), QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.unknown.iter().any(|s| s == subject) {
            return Err(QuoteError::NotFound(subject.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    fn id(&self) -> &'static str {
        FAKE_PROVIDER_ID
    }

    async fn global_quote(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        self.enter(symbol.as_str()).await?;
        Ok(Self::sample_quote(symbol))
    }

    async fn intraday(&self, symbol: &Symbol, interval: Interval) -> Result<IntradaySeries, QuoteError> {
        self.enter(symbol.as_str()).await?;
        let mut series = simulated::intraday(symbol, interval, Utc::now());
        series.source = QuoteSource::Provider;
        Ok(series)
    }

    async fn search(&self, keywords: &str) -> Result<SymbolSearch, QuoteError> {
        self.enter(keywords).await?;
        let mut search = simulated::search(keywords, Utc::now());
        search.source = QuoteSource::Provider;
        Ok(search)
    }
}

/// A store whose every operation fails, as if Redis were down.
pub(crate) struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

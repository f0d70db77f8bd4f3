//! # Alpha Vantage Provider
//!
//! [`QuoteProvider`] implementation over the Alpha Vantage `query` endpoint,
//! built on the crate's [`ApiClient`].
//!
//! Alpha Vantage reports most failures with HTTP 200 and a marker field in the
//! body (`Error Message`, `Note`, `Information`), so every body is checked for
//! markers before it is parsed. Retries are disabled: the free tier allows only
//! a handful of calls per minute and a retry would spend the next one.
//!
//! ## Contained Modules:
//!
//! - **`payloads`**: response structures and conversion into crate models.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::QuoteError;
use crate::markets::provider::QuoteProvider;
use crate::models::{IntradaySeries, Interval, Quote, Symbol, SymbolSearch};
use crate::retrieve::ky_http::{ApiClient, RetrieveError};

mod payloads;

/// Provider identifier reported in errors and logs.
pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";
/// Public Alpha Vantage endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/";

const QUERY_PATH: &str = "query";

/// Client for the Alpha Vantage market data API.
pub struct AlphaVantageClient {
    api: ApiClient,
    api_key: String,
    request_timeout: Duration,
}

impl AlphaVantageClient {
    /// Creates a client.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL, normally [`DEFAULT_BASE_URL`].
    /// * `api_key` - Alpha Vantage API key, sent as the `apikey` query parameter.
    /// * `request_timeout` - Transport-level ceiling for a single request.
    pub fn new(base_url: &str, api_key: impl Into<String>, request_timeout: Duration) -> Result<Self, RetrieveError> {
        Ok(Self {
            api: ApiClient::new(base_url, None, 0)?,
            api_key: api_key.into(),
            request_timeout,
        })
    }

    /// Replaces the API key in text that may echo the request URL.
    fn redact(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, "***")
        }
    }

    fn unavailable(&self, message: &str) -> QuoteError {
        QuoteError::UpstreamUnavailable {
            provider: PROVIDER_ID.to_string(),
            message: self.redact(message),
        }
    }

    /// Issues one `query` call and returns the marker-checked body.
    async fn fetch(&self, params: &[(&str, &str)], subject: &str) -> Result<Value, QuoteError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));

        debug!(provider = PROVIDER_ID, ?params, "Alpha Vantage request");

        let response = self
            .api
            .request::<Value, ()>(Method::GET, QUERY_PATH, &query, None, None, Some(self.request_timeout))
            .await
            .map_err(|e| match e {
                RetrieveError::Timeout => QuoteError::UpstreamTimeout {
                    provider: PROVIDER_ID.to_string(),
                },
                other => self.unavailable(&other.to_string()),
            })?;

        if response.status == 429 {
            return Err(QuoteError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if !response.success {
            return Err(self.unavailable(&format!("HTTP {}", response.status)));
        }

        let body = response.data.ok_or_else(|| self.unavailable("empty body"))?;
        if let Err(e) = payloads::check_markers(&body, subject) {
            warn!(provider = PROVIDER_ID, error = %e, "Alpha Vantage returned an error marker");
            return Err(e);
        }
        Ok(body)
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn global_quote(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())];
        let body = self.fetch(&params, symbol.as_str()).await?;
        payloads::parse_global_quote(body, symbol, Utc::now())
    }

    async fn intraday(&self, symbol: &Symbol, interval: Interval) -> Result<IntradaySeries, QuoteError> {
        let params = [
            ("function", "TIME_SERIES_INTRADAY"),
            ("symbol", symbol.as_str()),
            ("interval", interval.as_str()),
            ("outputsize", "compact"),
        ];
        let body = self.fetch(&params, symbol.as_str()).await?;
        payloads::parse_intraday(body, symbol, interval, Utc::now())
    }

    async fn search(&self, keywords: &str) -> Result<SymbolSearch, QuoteError> {
        let params = [("function", "SYMBOL_SEARCH"), ("keywords", keywords)];
        let body = self.fetch(&params, keywords).await?;
        payloads::parse_search(body, keywords, Utc::now())
    }
}

//! Seam between the quote service and whatever supplies live market data.

use async_trait::async_trait;

use crate::errors::QuoteError;
use crate::models::{IntradaySeries, Interval, Quote, Symbol, SymbolSearch};

/// An external market data source.
///
/// Implementations check the provider's error markers before trusting a
/// payload and translate them into [`QuoteError`]. They never retry and never
/// fall back to synthesized data; that policy belongs to the service.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider identifier used in errors and logs.
    fn id(&self) -> &'static str;

    /// Latest quote for one symbol.
    async fn global_quote(&self, symbol: &Symbol) -> Result<Quote, QuoteError>;

    /// Intraday bars for one symbol, newest first.
    async fn intraday(&self, symbol: &Symbol, interval: Interval) -> Result<IntradaySeries, QuoteError>;

    /// Symbol lookup by free-text keywords (already normalized).
    async fn search(&self, keywords: &str) -> Result<SymbolSearch, QuoteError>;
}

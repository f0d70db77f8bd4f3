use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::QuoteError;
use crate::models::served::Served;
use crate::models::symbol::Symbol;

/// A quote as returned to callers, flagged with whether the cache served it.
pub type ServedQuote = Served<Quote>;

/// Where a cache-resident value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Returned by the external market data provider.
    Provider,
    /// Synthesized locally from a hash of the symbol.
    Simulated,
}

/// Snapshot of a ticker's last observed trade.
///
/// This is exactly what is written to the cache; the `cached` flag lives on
/// [`ServedQuote`] so it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    /// Trading day of the source data, `YYYY-MM-DD`.
    pub last_updated: String,
    pub fetched_at: DateTime<Utc>,
    pub source: QuoteSource,
    /// Set when the session high replaced the last trade outside market hours.
    #[serde(default)]
    pub market_closed_estimate: bool,
}

impl Quote {
    /// Outside trading hours the last trade is stale, so the session high is
    /// served instead and the change fields are recomputed against the
    /// previous close. Does nothing when no usable high was provided.
    pub fn apply_closed_market_estimate(&mut self) {
        if self.high <= 0.0 {
            return;
        }

        self.price = self.high;
        self.change = round_to(self.high - self.previous_close, 4);
        self.change_percent = if self.previous_close > 0.0 {
            round_to(self.change / self.previous_close * 100.0, 4)
        } else {
            0.0
        };
        self.market_closed_estimate = true;
    }

    /// A quote can only be served as authoritative with a positive price.
    pub fn ensure_priced(self) -> Result<Self, QuoteError> {
        if self.price > 0.0 && self.price.is_finite() {
            Ok(self)
        } else {
            Err(QuoteError::NotFound(self.symbol.to_string()))
        }
    }
}

/// One element of a batch response. Failed lookups are carried inline so a
/// single bad symbol never fails the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Quote(ServedQuote),
    Error {
        /// The symbol exactly as the caller sent it.
        symbol: String,
        error: String,
        status: u16,
    },
}

impl BatchEntry {
    pub fn failed(symbol: &str, err: &QuoteError) -> Self {
        BatchEntry::Error {
            symbol: symbol.to_string(),
            error: err.to_string(),
            status: err.status_code(),
        }
    }

    pub fn quote(&self) -> Option<&ServedQuote> {
        match self {
            BatchEntry::Quote(q) => Some(q),
            BatchEntry::Error { .. } => None,
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Quote {
        Quote {
            symbol: Symbol::parse("AAPL").unwrap(),
            price: 175.50,
            change: 2.50,
            change_percent: 1.4451,
            volume: 51_000_000,
            open: 174.0,
            high: 178.00,
            low: 173.5,
            previous_close: 173.00,
            last_updated: "2024-01-17".to_string(),
            fetched_at: Utc::now(),
            source: QuoteSource::Provider,
            market_closed_estimate: false,
        }
    }

    #[test]
    fn test_closed_market_estimate_uses_high() {
        let mut quote = sample();
        quote.apply_closed_market_estimate();
        assert_eq!(quote.price, 178.00);
        assert_eq!(quote.change, 5.00);
        assert_eq!(quote.change_percent, 2.8902);
        assert!(quote.market_closed_estimate);
    }

    #[test]
    fn test_closed_market_estimate_skips_missing_high() {
        let mut quote = sample();
        quote.high = 0.0;
        quote.apply_closed_market_estimate();
        assert_eq!(quote.price, 175.50);
        assert!(!quote.market_closed_estimate);
    }

    #[test]
    fn test_zero_price_is_not_found() {
        let mut quote = sample();
        quote.price = 0.0;
        assert_eq!(
            quote.ensure_priced(),
            Err(QuoteError::NotFound("AAPL".to_string()))
        );
    }

    #[test]
    fn test_served_quote_json_shape() {
        let served = ServedQuote::from_cache(sample());
        let json = serde_json::to_value(&served).unwrap();
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["previousClose"], 173.0);
        assert_eq!(json["cached"], true);

        // the persisted form never carries the flag
        let stored = serde_json::to_value(&served.data).unwrap();
        assert!(stored.get("cached").is_none());
    }

    #[test]
    fn test_batch_error_entry_shape() {
        let entry = BatchEntry::failed("INVALID$YMBOL", &QuoteError::InvalidSymbol("INVALID$YMBOL".into()));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["symbol"], "INVALID$YMBOL");
        assert_eq!(json["status"], 400);
        assert!(entry.quote().is_none());
    }
}

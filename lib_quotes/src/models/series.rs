use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::QuoteError;
use crate::models::quote::QuoteSource;
use crate::models::served::Served;
use crate::models::symbol::Symbol;

/// Longest search phrase forwarded to the provider.
pub const MAX_KEYWORDS_LEN: usize = 50;

pub type ServedIntraday = Served<IntradaySeries>;
pub type ServedSearch = Served<SymbolSearch>;

/// Bar width of an intraday series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Interval {
    #[serde(rename = "1min")]
    OneMinute,
    #[default]
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1min",
            Interval::FiveMinutes => "5min",
            Interval::FifteenMinutes => "15min",
            Interval::ThirtyMinutes => "30min",
            Interval::SixtyMinutes => "60min",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Interval::OneMinute => 1,
            Interval::FiveMinutes => 5,
            Interval::FifteenMinutes => 15,
            Interval::ThirtyMinutes => 30,
            Interval::SixtyMinutes => 60,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1min" => Ok(Interval::OneMinute),
            "5min" => Ok(Interval::FiveMinutes),
            "15min" => Ok(Interval::FifteenMinutes),
            "30min" => Ok(Interval::ThirtyMinutes),
            "60min" => Ok(Interval::SixtyMinutes),
            other => Err(QuoteError::InvalidRequest(format!(
                "unsupported interval {:?} (expected 1min, 5min, 15min, 30min or 60min)",
                other
            ))),
        }
    }
}

/// One OHLCV bar. `timestamp` is exchange-local, as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayBar {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Intraday bars for one symbol, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradaySeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub last_refreshed: String,
    pub bars: Vec<IntradayBar>,
    pub fetched_at: DateTime<Utc>,
    pub source: QuoteSource,
}

/// A single symbol search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub region: String,
    pub currency: String,
    pub match_score: f64,
}

/// Result of a keyword search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSearch {
    pub keywords: String,
    pub matches: Vec<SymbolMatch>,
    pub fetched_at: DateTime<Utc>,
    pub source: QuoteSource,
}

/// Trims and uppercases search keywords; the result doubles as the cache key
/// suffix.
pub fn normalize_keywords(raw: &str) -> Result<String, QuoteError> {
    let keywords = raw.trim().to_ascii_uppercase();
    if keywords.is_empty() || keywords.chars().count() > MAX_KEYWORDS_LEN {
        return Err(QuoteError::InvalidRequest(format!(
            "keywords must be 1-{} characters",
            MAX_KEYWORDS_LEN
        )));
    }
    if keywords.chars().any(|c| matches!(c, '*' | '?' | '[' | ']')) {
        return Err(QuoteError::InvalidRequest(
            "keywords may not contain pattern characters".to_string(),
        ));
    }
    Ok(keywords)
}

//! Alpha Vantage response bodies and their conversion into crate models.
//!
//! All numbers arrive as strings (`"05. price": "178.7200"`), percentages carry
//! a trailing `%`, and map keys are prefixed with an ordinal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::PROVIDER_ID;
use crate::errors::QuoteError;
use crate::models::{IntradayBar, IntradaySeries, Interval, Quote, QuoteSource, Symbol, SymbolMatch, SymbolSearch};

/// Top-level markers Alpha Vantage returns with HTTP 200 instead of data.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiMarkers {
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

/// Every field is optional: an unknown symbol yields `"Global Quote": {}`.
#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntradayMeta {
    #[serde(rename = "3. Last Refreshed")]
    last_refreshed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntradayPoint {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// SYMBOL_SEARCH response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "bestMatches")]
    best_matches: Option<Vec<SearchMatch>>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
    #[serde(rename = "3. type")]
    kind: String,
    #[serde(rename = "4. region")]
    region: String,
    #[serde(rename = "8. currency")]
    currency: String,
    #[serde(rename = "9. matchScore")]
    match_score: String,
}

fn malformed(what: &str) -> QuoteError {
    QuoteError::UpstreamUnavailable {
        provider: PROVIDER_ID.to_string(),
        message: format!("malformed {} payload", what),
    }
}

/// Parses a numeric string, tolerating a trailing `%`.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn number(field: &Option<String>) -> Option<f64> {
    field.as_deref().and_then(parse_number)
}

fn volume(raw: &str) -> Option<u64> {
    parse_number(raw).filter(|v| *v >= 0.0).map(|v| v as u64)
}

/// Maps the error markers onto [`QuoteError`]. `subject` names what was
/// asked for and ends up in `NotFound`.
pub(crate) fn check_markers(body: &Value, subject: &str) -> Result<(), QuoteError> {
    let markers = ApiMarkers::deserialize(body).unwrap_or_default();

    if let Some(msg) = markers.error_message {
        if msg.contains("Invalid API call") || msg.contains("not found") {
            return Err(QuoteError::NotFound(subject.to_string()));
        }
        return Err(QuoteError::UpstreamUnavailable {
            provider: PROVIDER_ID.to_string(),
            message: msg,
        });
    }

    if markers.note.is_some() {
        return Err(QuoteError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        });
    }

    if let Some(msg) = markers.information {
        let lowered = msg.to_ascii_lowercase();
        if lowered.contains("api call frequency") || lowered.contains("rate limit") {
            return Err(QuoteError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        return Err(QuoteError::UpstreamUnavailable {
            provider: PROVIDER_ID.to_string(),
            message: msg,
        });
    }

    Ok(())
}

/// Converts a GLOBAL_QUOTE body. An empty quote object or a non-positive
/// price is `NotFound`.
pub(crate) fn parse_global_quote(body: Value, symbol: &Symbol, now: DateTime<Utc>) -> Result<Quote, QuoteError> {
    let response: GlobalQuoteResponse = serde_json::from_value(body).map_err(|_| malformed("GLOBAL_QUOTE"))?;
    let raw = response.global_quote.unwrap_or_default();

    if raw.symbol.is_none() && raw.price.is_none() {
        return Err(QuoteError::NotFound(symbol.to_string()));
    }
    let price = number(&raw.price).ok_or_else(|| malformed("GLOBAL_QUOTE"))?;

    let quote = Quote {
        symbol: symbol.clone(),
        price,
        change: number(&raw.change).unwrap_or(0.0),
        change_percent: number(&raw.change_percent).unwrap_or(0.0),
        volume: raw.volume.as_deref().and_then(volume).unwrap_or(0),
        open: number(&raw.open).unwrap_or(0.0),
        high: number(&raw.high).unwrap_or(0.0),
        low: number(&raw.low).unwrap_or(0.0),
        previous_close: number(&raw.previous_close).unwrap_or(0.0),
        last_updated: raw.latest_trading_day.unwrap_or_default(),
        fetched_at: now,
        source: QuoteSource::Provider,
        market_closed_estimate: false,
    };
    quote.ensure_priced()
}

/// Converts a TIME_SERIES_INTRADAY body into bars ordered newest first.
pub(crate) fn parse_intraday(
    body: Value,
    symbol: &Symbol,
    interval: Interval,
    now: DateTime<Utc>,
) -> Result<IntradaySeries, QuoteError> {
    let series_key = format!("Time Series ({})", interval.as_str());
    let Value::Object(mut fields) = body else {
        return Err(malformed("TIME_SERIES_INTRADAY"));
    };

    let points: BTreeMap<String, IntradayPoint> = match fields.remove(&series_key) {
        Some(series) => serde_json::from_value(series).map_err(|_| malformed("TIME_SERIES_INTRADAY"))?,
        None => return Err(QuoteError::NotFound(symbol.to_string())),
    };
    if points.is_empty() {
        return Err(QuoteError::NotFound(symbol.to_string()));
    }

    let meta: Option<IntradayMeta> = fields
        .remove("Meta Data")
        .and_then(|m| serde_json::from_value(m).ok());

    // timestamps are "YYYY-MM-DD HH:MM:SS", so lexical order is time order
    let bars = points
        .into_iter()
        .rev()
        .map(|(timestamp, p)| {
            Some(IntradayBar {
                timestamp,
                open: parse_number(&p.open)?,
                high: parse_number(&p.high)?,
                low: parse_number(&p.low)?,
                close: parse_number(&p.close)?,
                volume: volume(&p.volume)?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| malformed("TIME_SERIES_INTRADAY"))?;

    let last_refreshed = meta
        .and_then(|m| m.last_refreshed)
        .or_else(|| bars.first().map(|b| b.timestamp.clone()))
        .unwrap_or_default();

    Ok(IntradaySeries {
        symbol: symbol.clone(),
        interval,
        last_refreshed,
        bars,
        fetched_at: now,
        source: QuoteSource::Provider,
    })
}

/// Converts a SYMBOL_SEARCH body. No matches is a valid, empty result.
pub(crate) fn parse_search(body: Value, keywords: &str, now: DateTime<Utc>) -> Result<SymbolSearch, QuoteError> {
    let response: SearchResponse = serde_json::from_value(body).map_err(|_| malformed("SYMBOL_SEARCH"))?;
    let raw = response.best_matches.ok_or_else(|| malformed("SYMBOL_SEARCH"))?;

    let matches = raw
        .into_iter()
        .map(|m| SymbolMatch {
            symbol: m.symbol,
            name: m.name,
            kind: m.kind,
            region: m.region,
            currency: m.currency,
            match_score: parse_number(&m.match_score).unwrap_or(0.0),
        })
        .collect();

    Ok(SymbolSearch {
        keywords: keywords.to_string(),
        matches,
        fetched_at: now,
        source: QuoteSource::Provider,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 17, 15, 0, 0).unwrap()
    }

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[test]
    fn test_parse_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "176.1500",
                "03. high": "179.4300",
                "04. low": "175.8200",
                "05. price": "178.7200",
                "06. volume": "54686860",
                "07. latest trading day": "2024-01-16",
                "08. previous close": "176.6500",
                "09. change": "2.0700",
                "10. change percent": "1.1718%"
            }
        });
        let quote = parse_global_quote(body, &aapl(), now()).unwrap();
        assert_eq!(quote.price, 178.72);
        assert_eq!(quote.high, 179.43);
        assert_eq!(quote.volume, 54_686_860);
        assert_eq!(quote.change_percent, 1.1718);
        assert_eq!(quote.last_updated, "2024-01-16");
        assert_eq!(quote.source, QuoteSource::Provider);
        assert!(!quote.market_closed_estimate);
    }

    #[test]
    fn test_empty_global_quote_is_not_found() {
        let err = parse_global_quote(json!({"Global Quote": {}}), &aapl(), now()).unwrap_err();
        assert_eq!(err, QuoteError::NotFound("AAPL".to_string()));
    }

    #[test]
    fn test_zero_price_is_not_found() {
        let body = json!({"Global Quote": {"01. symbol": "AAPL", "05. price": "0.0000"}});
        let err = parse_global_quote(body, &aapl(), now()).unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(_)));
    }

    #[test]
    fn test_garbage_price_is_upstream_unavailable() {
        let body = json!({"Global Quote": {"01. symbol": "AAPL", "05. price": "n/a"}});
        let err = parse_global_quote(body, &aapl(), now()).unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_markers() {
        let not_found = json!({"Error Message": "Invalid API call. Please retry or visit the documentation"});
        assert!(matches!(check_markers(&not_found, "AAPL"), Err(QuoteError::NotFound(s)) if s == "AAPL"));

        let other_error = json!({"Error Message": "the parameter apikey is invalid"});
        assert!(matches!(
            check_markers(&other_error, "AAPL"),
            Err(QuoteError::UpstreamUnavailable { .. })
        ));

        let note = json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"});
        assert!(matches!(check_markers(&note, "AAPL"), Err(QuoteError::RateLimited { .. })));

        let info_limit = json!({"Information": "We have detected your API key and our standard API rate limit is 25 requests per day."});
        assert!(matches!(check_markers(&info_limit, "AAPL"), Err(QuoteError::RateLimited { .. })));

        let info_other = json!({"Information": "This is a premium endpoint."});
        assert!(matches!(
            check_markers(&info_other, "AAPL"),
            Err(QuoteError::UpstreamUnavailable { .. })
        ));

        assert!(check_markers(&json!({"Global Quote": {}}), "AAPL").is_ok());
        assert!(check_markers(&json!([1, 2, 3]), "AAPL").is_ok());
    }

    #[test]
    fn test_parse_intraday_newest_first() {
        let body = json!({
            "Meta Data": {
                "1. Information": "Intraday (5min) open, high, low, close prices and volume",
                "2. Symbol": "AAPL",
                "3. Last Refreshed": "2024-01-16 19:55:00",
                "4. Interval": "5min"
            },
            "Time Series (5min)": {
                "2024-01-16 19:50:00": {"1. open": "183.5000", "2. high": "183.6000", "3. low": "183.4000", "4. close": "183.5500", "5. volume": "1200"},
                "2024-01-16 19:55:00": {"1. open": "183.5500", "2. high": "183.7000", "3. low": "183.5000", "4. close": "183.6300", "5. volume": "3400"}
            }
        });
        let series = parse_intraday(body, &aapl(), Interval::FiveMinutes, now()).unwrap();
        assert_eq!(series.last_refreshed, "2024-01-16 19:55:00");
        assert_eq!(series.bars.len(), 2);
        assert_eq!(series.bars[0].timestamp, "2024-01-16 19:55:00");
        assert_eq!(series.bars[0].close, 183.63);
        assert_eq!(series.bars[1].volume, 1200);
    }

    #[test]
    fn test_intraday_without_series_is_not_found() {
        let body = json!({"Meta Data": {"3. Last Refreshed": "2024-01-16 19:55:00"}});
        let err = parse_intraday(body, &aapl(), Interval::OneMinute, now()).unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(_)));
    }

    #[test]
    fn test_parse_search() {
        let body = json!({
            "bestMatches": [
                {
                    "1. symbol": "TSCO.LON",
                    "2. name": "Tesco PLC",
                    "3. type": "Equity",
                    "4. region": "United Kingdom",
                    "5. marketOpen": "08:00",
                    "6. marketClose": "16:30",
                    "7. timezone": "UTC+01",
                    "8. currency": "GBX",
                    "9. matchScore": "0.7273"
                }
            ]
        });
        let search = parse_search(body, "TESCO", now()).unwrap();
        assert_eq!(search.keywords, "TESCO");
        assert_eq!(search.matches[0].symbol, "TSCO.LON");
        assert_eq!(search.matches[0].currency, "GBX");
        assert_eq!(search.matches[0].match_score, 0.7273);

        let empty = parse_search(json!({"bestMatches": []}), "ZZZZ", now()).unwrap();
        assert!(empty.matches.is_empty());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1.5% "), Some(1.5));
        assert_eq!(parse_number("-0.25"), Some(-0.25));
        assert_eq!(parse_number("None"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}

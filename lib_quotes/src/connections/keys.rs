//! Key layout shared by every instance of the service.

use crate::models::{Interval, Symbol};

pub const QUOTE_PREFIX: &str = "quote";
pub const INTRADAY_PREFIX: &str = "intraday";
pub const SEARCH_PREFIX: &str = "search";
pub const MARKET_STATUS_KEY: &str = "market:status";

pub fn quote(symbol: &Symbol) -> String {
    format!("{}:{}", QUOTE_PREFIX, symbol)
}

pub fn intraday(symbol: &Symbol, interval: Interval) -> String {
    format!("{}:{}:{}", INTRADAY_PREFIX, symbol, interval)
}

pub fn search(keywords: &str) -> String {
    format!("{}:{}", SEARCH_PREFIX, keywords)
}

/// Patterns covering everything cached for one symbol.
pub fn symbol_patterns(symbol: &Symbol) -> Vec<String> {
    vec![
        quote(symbol),
        format!("{}:{}:*", INTRADAY_PREFIX, symbol),
        search(symbol.as_str()),
    ]
}

/// Patterns covering the quote, intraday and search namespaces. The market
/// status key is not included.
pub fn all_patterns() -> Vec<String> {
    [QUOTE_PREFIX, INTRADAY_PREFIX, SEARCH_PREFIX]
        .iter()
        .map(|prefix| format!("{}:*", prefix))
        .collect()
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::QuoteError;

/// Longest ticker accepted anywhere in the service.
pub const MAX_SYMBOL_LEN: usize = 10;

/// A normalized ticker: uppercase, 1-10 ASCII alphanumeric characters.
///
/// Constructing one is the only way into the cache or provider paths, so a
/// malformed symbol can never reach a key pattern or an outbound URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trims, uppercases and validates a raw ticker.
    pub fn parse(raw: &str) -> Result<Self, QuoteError> {
        let normalized = raw.trim().to_ascii_uppercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_SYMBOL_LEN
            && normalized.chars().all(|c| c.is_ascii_alphanumeric());

        if valid {
            Ok(Self(normalized))
        } else {
            Err(QuoteError::InvalidSymbol(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

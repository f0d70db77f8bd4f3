//! # Data Models
//!
//! Transient, cache-resident values handled by the quote service.
//!
//! ## Contained Modules:
//!
//! - **`symbol`**: the validated ticker newtype every operation starts from.
//! - **`quote`**: the quote snapshot and batch response entries.
//! - **`series`**: intraday bars and symbol search results.
//! - **`served`**: the response-time wrapper carrying the `cached` flag.

#![warn(rust_2018_idioms, unused_qualifications)]

pub mod quote;
pub mod served;
pub mod series;
pub mod symbol;

pub use quote::{BatchEntry, Quote, QuoteSource, ServedQuote};
pub use served::Served;
pub use series::{
    IntradayBar, IntradaySeries, Interval, ServedIntraday, ServedSearch, SymbolMatch, SymbolSearch,
};
pub use symbol::Symbol;

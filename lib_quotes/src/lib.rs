//! # lib_quotes
//!
//! Shared library behind the quote cache service. It mediates every outbound
//! call to the market data provider, serving cached quotes when fresh and
//! fetching or synthesizing them otherwise.
//!
//! Modules that pull heavy dependencies are gated behind cargo features, the
//! same way the rest of the workspace keeps builds lean:
//!
//! - `connections`: Redis-backed [`connections::CacheStore`].
//! - `retrieve`: HTTP client and the Alpha Vantage provider.
//! - `loggers`: tracing subscriber with rolling log files.

#![forbid(unsafe_code)]

pub mod connections;
pub mod errors;
pub mod markets;
pub mod models;
pub mod service;

#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the types every consumer needs
pub use connections::{CacheError, CacheStore, MemoryCache};
pub use errors::QuoteError;
pub use markets::clock::{Clock, FixedClock, SystemClock};
pub use markets::marketstatus::MarketStatus;
pub use markets::provider::QuoteProvider;
pub use models::{BatchEntry, Interval, Quote, QuoteSource, ServedQuote, Symbol};
pub use service::{FallbackPolicy, QuoteService, ServiceConfig};

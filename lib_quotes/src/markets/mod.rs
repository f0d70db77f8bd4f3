//! # Financial Market Module
//!
//! This module groups together all logic related to market data sources and
//! market hours. Its purpose is to abstract the details of interacting with
//! external services, providing normalized data to the quote service.
//!
//! ## Contained Modules:
//!
//! - **`provider`**: the `QuoteProvider` trait the service calls on a cache miss.
//! - **`alphavantage`** (feature `retrieve`): HTTP client for the Alpha Vantage
//!   API, including its error and rate-limit markers.
//! - **`simulated`**: deterministic synthesized quotes, series and search hits.
//! - **`marketstatus`**: regular-session open/closed computation in New York time.
//! - **`clock`**: injectable wall clock.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Client for the Alpha Vantage market data API.
#[cfg(feature = "retrieve")]
pub mod alphavantage;
/// Wall-clock abstraction.
pub mod clock;
/// Regular-session market status.
pub mod marketstatus;
/// Market data provider trait.
pub mod provider;
/// Deterministic synthesized market data.
pub mod simulated;

//! # Quote Service Module
//!
//! The cache-aside layer in front of the market data provider. Every caller
//! (HTTP routes, the live test runner) goes through [`QuoteService`].
//!
//! ## Contained Modules:
//!
//! - **`config`**: TTLs, timeouts, batch pacing and the fallback policy.
//! - **`quote_service`**: the operations themselves.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Service tunables.
pub mod config;
/// Cache-then-fetch operations.
pub mod quote_service;

pub use config::{FallbackPolicy, ServiceConfig};
pub use quote_service::QuoteService;

//! # Data Retrieval Module
//!
//! This module provides a centralized location for generic HTTP retrieval,
//! encapsulating request building, timeouts, optional retry middleware and
//! JSON handling so provider clients can focus on payload semantics.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`. It serves as the foundation for provider clients
//!   such as Alpha Vantage.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware and per-request timeouts.
pub mod ky_http;

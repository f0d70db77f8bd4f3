//! # Logging Module
//!
//! Process-wide `tracing` subscriber setup for the quote cache binaries.
//!
//! ## Contained Modules:
//!
//! - **`loggerlocal`**: console output (text or JSON), an optional daily
//!   rolling log file and pruning of old log files.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Implements a local logger with support for TTY and rolling file output.
pub mod loggerlocal;

pub use loggerlocal::{init, LogFormat, LoggerError, LoggerLocalOptions};

//! # Quote Service Errors
//!
//! Error taxonomy for every operation the quote service exposes. Each variant
//! knows the HTTP status it maps to at the API boundary and whether the caller
//! may usefully retry.

use thiserror::Error;

/// Errors surfaced to callers of the quote service.
///
/// Cache failures are deliberately absent: the service degrades to direct
/// provider calls and never reports them (see [`crate::connections::CacheError`]).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuoteError {
    /// The ticker is not 1-10 ASCII alphanumeric characters.
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// Request shape violates an operation constraint (batch size, interval...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider did not answer within the configured timeout.
    #[error("Upstream timeout: {provider}")]
    UpstreamTimeout {
        /// Provider that timed out.
        provider: String,
    },

    /// The provider failed at the transport or HTTP level, or sent a payload
    /// that could not be trusted.
    #[error("Upstream unavailable: {provider} - {message}")]
    UpstreamUnavailable {
        /// Provider that failed.
        provider: String,
        /// What went wrong.
        message: String,
    },

    /// The provider signalled its call frequency limit.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// Provider that rate limited the request.
        provider: String,
    },

    /// The provider does not know the symbol, or returned no usable price.
    #[error("Symbol not found: {0}")]
    NotFound(String),
}

impl QuoteError {
    /// HTTP status code this error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            QuoteError::InvalidSymbol(_) | QuoteError::InvalidRequest(_) => 400,
            QuoteError::NotFound(_) => 404,
            QuoteError::RateLimited { .. } => 429,
            QuoteError::UpstreamUnavailable { .. } => 502,
            QuoteError::UpstreamTimeout { .. } => 504,
        }
    }

    /// Stable machine-readable name, used as `error_type` in JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            QuoteError::InvalidSymbol(_) => "InvalidSymbol",
            QuoteError::InvalidRequest(_) => "InvalidRequest",
            QuoteError::UpstreamTimeout { .. } => "UpstreamTimeout",
            QuoteError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            QuoteError::RateLimited { .. } => "RateLimited",
            QuoteError::NotFound(_) => "NotFound",
        }
    }

    /// Whether a caller may retry later (after backing off). Nothing in this
    /// crate retries automatically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QuoteError::UpstreamTimeout { .. }
                | QuoteError::UpstreamUnavailable { .. }
                | QuoteError::RateLimited { .. }
        )
    }

    /// Whether the error originated at the provider. Only these are eligible
    /// for the synthesize fallback; validation errors never are.
    pub fn is_upstream(&self) -> bool {
        !matches!(
            self,
            QuoteError::InvalidSymbol(_) | QuoteError::InvalidRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(QuoteError::InvalidSymbol("A$".into()).status_code(), 400);
        assert_eq!(QuoteError::NotFound("ZZZZ".into()).status_code(), 404);
        assert_eq!(
            QuoteError::RateLimited { provider: "ALPHA_VANTAGE".into() }.status_code(),
            429
        );
        assert_eq!(
            QuoteError::UpstreamTimeout { provider: "ALPHA_VANTAGE".into() }.status_code(),
            504
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(!QuoteError::InvalidSymbol("".into()).is_transient());
        assert!(!QuoteError::NotFound("X".into()).is_transient());
        assert!(QuoteError::RateLimited { provider: "P".into() }.is_transient());
        assert!(!QuoteError::InvalidRequest("too many".into()).is_upstream());
        assert!(QuoteError::NotFound("X".into()).is_upstream());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What to do when the provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Propagate the upstream error to the caller.
    #[default]
    Strict,
    /// Log a warning and serve simulated data instead.
    Synthesize,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FallbackPolicy::Strict),
            "synthesize" => Ok(FallbackPolicy::Synthesize),
            other => Err(format!("unknown fallback policy {:?} (expected strict or synthesize)", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackPolicy::Strict => "strict",
            FallbackPolicy::Synthesize => "synthesize",
        })
    }
}

/// Tunables of [`super::QuoteService`].
///
/// Durations are stored as plain integers so the struct reads naturally from
/// a JSON config file; use the accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Never call the provider; synthesize every response.
    pub simulation_mode: bool,
    pub fallback_policy: FallbackPolicy,
    pub quote_ttl_secs: u64,
    pub intraday_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub status_ttl_secs: u64,
    /// Minimum spacing between provider calls within one batch.
    pub batch_delay_ms: u64,
    pub max_batch_size: usize,
    /// Provider timeout for quotes and symbol search.
    pub quote_timeout_ms: u64,
    /// Provider timeout for intraday series.
    pub series_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            simulation_mode: false,
            fallback_policy: FallbackPolicy::Strict,
            quote_ttl_secs: 300,
            intraday_ttl_secs: 60,
            search_ttl_secs: 3600,
            status_ttl_secs: 300,
            batch_delay_ms: 1000,
            max_batch_size: 10,
            quote_timeout_ms: 10_000,
            series_timeout_ms: 15_000,
        }
    }
}

impl ServiceConfig {
    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }

    pub fn intraday_ttl(&self) -> Duration {
        Duration::from_secs(self.intraday_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }

    pub fn series_timeout(&self) -> Duration {
        Duration::from_millis(self.series_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.quote_ttl(), Duration::from_secs(300));
        assert_eq!(config.intraday_ttl(), Duration::from_secs(60));
        assert_eq!(config.search_ttl(), Duration::from_secs(3600));
        assert_eq!(config.batch_delay(), Duration::from_secs(1));
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.fallback_policy, FallbackPolicy::Strict);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"simulationMode": true, "fallbackPolicy": "synthesize", "quoteTtlSecs": 60}"#)
                .unwrap();
        assert!(config.simulation_mode);
        assert_eq!(config.fallback_policy, FallbackPolicy::Synthesize);
        assert_eq!(config.quote_ttl_secs, 60);
        assert_eq!(config.series_timeout_ms, 15_000);
    }

    #[test]
    fn test_fallback_policy_parse() {
        assert_eq!("Synthesize".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Synthesize));
        assert!("lenient".parse::<FallbackPolicy>().is_err());
    }
}

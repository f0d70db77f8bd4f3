use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lib_quotes::loggers::{LogFormat, LoggerLocalOptions};
use lib_quotes::markets::alphavantage::DEFAULT_BASE_URL;
use lib_quotes::{FallbackPolicy, ServiceConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "server_quotes";
const DEFAULT_CONFIG_FILE: &str = "server_quotes.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Quote Cache HTTP Server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "QUOTES_PORT", help = "Port to listen on for HTTP clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "QUOTES_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "QUOTES_LOG_DIR", help = "Directory for daily log files. Empty disables file logging.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "QUOTES_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error). RUST_LOG wins if set.")]
    pub log_level: Option<String>,

    #[clap(long, env = "QUOTES_LOG_FORMAT", help = "Log line format (text or json).")]
    pub log_format: Option<String>,

    #[clap(long, env = "REDIS_URL", help = "Redis URL. Without it an in-process cache is used.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "QUOTES_CACHE_TIMEOUT_MS", help = "Timeout in milliseconds for each cache command.")]
    pub cache_timeout_ms: Option<u64>,

    #[clap(long, env = "ALPHA_VANTAGE_API_KEY", help = "Alpha Vantage API key. Without it all data is simulated.")]
    pub alpha_vantage_api_key: Option<String>,

    #[clap(long, env = "ALPHA_VANTAGE_BASE_URL", help = "Alpha Vantage base URL.")]
    pub alpha_vantage_base_url: Option<String>,

    #[clap(long, env = "QUOTES_SIMULATION_MODE", help = "Never call the provider (true or false).")]
    pub simulation_mode: Option<bool>,

    #[clap(long, env = "QUOTES_FALLBACK_POLICY", help = "On provider failure: strict or synthesize.")]
    pub fallback_policy: Option<String>,

    #[clap(long, env = "QUOTES_QUOTE_TTL_SECONDS", help = "Seconds a quote stays cached.")]
    pub quote_ttl_seconds: Option<u64>,

    #[clap(long, env = "QUOTES_INTRADAY_TTL_SECONDS", help = "Seconds an intraday series stays cached.")]
    pub intraday_ttl_seconds: Option<u64>,

    #[clap(long, env = "QUOTES_SEARCH_TTL_SECONDS", help = "Seconds a symbol search stays cached.")]
    pub search_ttl_seconds: Option<u64>,

    #[clap(long, env = "QUOTES_STATUS_TTL_SECONDS", help = "Seconds the market status stays cached.")]
    pub status_ttl_seconds: Option<u64>,

    #[clap(long, env = "QUOTES_BATCH_DELAY_MS", help = "Delay in milliseconds between provider calls within a batch.")]
    pub batch_delay_ms: Option<u64>,

    #[clap(long, env = "QUOTES_MAX_BATCH_SIZE", help = "Maximum number of symbols per batch request.")]
    pub max_batch_size: Option<usize>,

    #[clap(long, env = "QUOTES_QUOTE_TIMEOUT_MS", help = "Provider timeout in milliseconds for quotes and search.")]
    pub quote_timeout_ms: Option<u64>,

    #[clap(long, env = "QUOTES_SERIES_TIMEOUT_MS", help = "Provider timeout in milliseconds for intraday series.")]
    pub series_timeout_ms: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            log_format: other.log_format.or(self.log_format),
            redis_url: other.redis_url.or(self.redis_url),
            cache_timeout_ms: other.cache_timeout_ms.or(self.cache_timeout_ms),
            alpha_vantage_api_key: other.alpha_vantage_api_key.or(self.alpha_vantage_api_key),
            alpha_vantage_base_url: other.alpha_vantage_base_url.or(self.alpha_vantage_base_url),
            simulation_mode: other.simulation_mode.or(self.simulation_mode),
            fallback_policy: other.fallback_policy.or(self.fallback_policy),
            quote_ttl_seconds: other.quote_ttl_seconds.or(self.quote_ttl_seconds),
            intraday_ttl_seconds: other.intraday_ttl_seconds.or(self.intraday_ttl_seconds),
            search_ttl_seconds: other.search_ttl_seconds.or(self.search_ttl_seconds),
            status_ttl_seconds: other.status_ttl_seconds.or(self.status_ttl_seconds),
            batch_delay_ms: other.batch_delay_ms.or(self.batch_delay_ms),
            max_batch_size: other.max_batch_size.or(self.max_batch_size),
            quote_timeout_ms: other.quote_timeout_ms.or(self.quote_timeout_ms),
            series_timeout_ms: other.series_timeout_ms.or(self.series_timeout_ms),
        }
    }

    fn defaults() -> Config {
        Config {
            port: Some(8080),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            log_format: Some("text".to_string()),
            cache_timeout_ms: Some(2000),
            alpha_vantage_base_url: Some(DEFAULT_BASE_URL.to_string()),
            simulation_mode: Some(false),
            fallback_policy: Some("strict".to_string()),
            ..Default::default()
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms.unwrap_or(2000))
    }

    /// Redis URL, when one is configured and non-empty.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// API key, when one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.alpha_vantage_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.alpha_vantage_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Library-side tunables, missing values falling back to the library defaults.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let defaults = ServiceConfig::default();
        let fallback_policy = match &self.fallback_policy {
            Some(raw) => raw.parse::<FallbackPolicy>().map_err(|e| anyhow!(e))?,
            None => defaults.fallback_policy,
        };

        Ok(ServiceConfig {
            simulation_mode: self.simulation_mode.unwrap_or(defaults.simulation_mode),
            fallback_policy,
            quote_ttl_secs: self.quote_ttl_seconds.unwrap_or(defaults.quote_ttl_secs),
            intraday_ttl_secs: self.intraday_ttl_seconds.unwrap_or(defaults.intraday_ttl_secs),
            search_ttl_secs: self.search_ttl_seconds.unwrap_or(defaults.search_ttl_secs),
            status_ttl_secs: self.status_ttl_seconds.unwrap_or(defaults.status_ttl_secs),
            batch_delay_ms: self.batch_delay_ms.unwrap_or(defaults.batch_delay_ms),
            max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
            quote_timeout_ms: self.quote_timeout_ms.unwrap_or(defaults.quote_timeout_ms),
            series_timeout_ms: self.series_timeout_ms.unwrap_or(defaults.series_timeout_ms),
        })
    }

    pub fn logger_options(&self) -> Result<LoggerLocalOptions> {
        let format = match &self.log_format {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| anyhow!(e))?,
            None => LogFormat::Text,
        };
        Ok(LoggerLocalOptions {
            app_name: APP_NAME.to_string(),
            level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            format,
            log_dir: self.log_dir.clone().filter(|dir| !dir.as_os_str().is_empty()),
            ..Default::default()
        })
    }
}

/// Resolves the configuration: defaults, then the JSON file, then env/CLI.
///
/// A missing config file is not an error; an unreadable or malformed one is.
pub fn load_config() -> Result<Config> {
    // 1. Parse CLI (and env) first to get a potential config_path override
    resolve(Config::parse())
}

fn resolve(cli_args: Config) -> Result<Config> {
    let mut current_config = Config::defaults();

    // 2. Load from config file (server_quotes.conf) if present
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if config_file_path.exists() {
        let config_str = fs::read_to_string(&config_file_path)
            .with_context(|| format!("Failed to read config file {}", config_file_path.display()))?;
        let file_config: Config = serde_json::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", config_file_path.display()))?;
        current_config = current_config.merge(file_config);
    }

    // 3. Override with environment variables and CLI arguments
    Ok(current_config.merge(cli_args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Config {
        let mut argv = vec!["server_quotes"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(cli(&["--config-path", "/nonexistent/server_quotes.conf"])).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.redis_url(), None);

        let service = config.service_config().unwrap();
        assert_eq!(service, ServiceConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 9100, "fallbackPolicy": "synthesize", "quoteTtlSeconds": 30, "logFormat": "json"}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = resolve(cli(&["--config-path", &path, "--port", "9200"])).unwrap();
        assert_eq!(config.port(), 9200);

        let service = config.service_config().unwrap();
        assert_eq!(service.fallback_policy, FallbackPolicy::Synthesize);
        assert_eq!(service.quote_ttl_secs, 30);
        assert_eq!(service.intraday_ttl_secs, 60);
        assert_eq!(config.logger_options().unwrap().format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(resolve(cli(&["--config-path", &path])).is_err());
    }

    #[test]
    fn test_blank_secrets_are_ignored() {
        let config = cli(&["--alpha-vantage-api-key", "  ", "--redis-url", ""]);
        assert_eq!(config.api_key(), None);
        assert_eq!(config.redis_url(), None);
    }

    #[test]
    fn test_bad_policy_is_rejected() {
        let config = cli(&["--fallback-policy", "lenient"]);
        assert!(config.service_config().is_err());
    }
}

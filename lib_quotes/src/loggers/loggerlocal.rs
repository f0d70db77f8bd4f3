use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glob::glob;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, Layer, Registry};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    Filter(String),
    #[error("Log file setup failed: {0}")]
    File(String),
    #[error("Subscriber already installed: {0}")]
    Init(String),
}

/// # Log Format
///
/// Line format for console and file output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines with target and line number.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?} (expected text or json)", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
/// # Logger Local Options
///
/// Configuration options for the process logger, controlling where and how
/// log events are output.
pub struct LoggerLocalOptions {
    /// Prefix of the log file names (`{app_name}.YYYY-MM-DD.log`).
    pub app_name: String,
    /// Default filter directive, used when `RUST_LOG` is not set (e.g. "info").
    pub level: String,
    /// Console and file line format.
    pub format: LogFormat,
    /// Directory for daily log files. `None` disables file output.
    pub log_dir: Option<PathBuf>,
    /// Number of log files kept when pruning, the current one included.
    pub keep_files: usize,
}

impl Default for LoggerLocalOptions {
    fn default() -> Self {
        Self {
            app_name: "quotes".to_string(),
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            keep_files: 7,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => tfmt::layer().json().with_current_span(false).boxed(),
        LogFormat::Text => tfmt::layer().with_target(true).with_line_number(true).boxed(),
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `options.level`. When a log directory is
/// configured, old files are pruned first and a daily rolling file is added.
///
/// # Returns
/// The file writer's guard, which must be held until shutdown so buffered
/// lines are flushed. `None` when file output is disabled.
pub fn init(options: &LoggerLocalOptions) -> Result<Option<WorkerGuard>, LoggerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| LoggerError::Filter(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(options.format)];
    let mut guard = None;

    if let Some(dir) = &options.log_dir {
        std::fs::create_dir_all(dir).map_err(|e| LoggerError::File(format!("{}: {}", dir.display(), e)))?;
        // the file about to be opened counts towards the limit
        rotate_logs(&options.app_name, dir, options.keep_files.saturating_sub(1));

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&options.app_name)
            .filename_suffix("log")
            .build(dir)
            .map_err(|e| LoggerError::File(e.to_string()))?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);

        let file_layer = match options.format {
            LogFormat::Json => tfmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
            LogFormat::Text => tfmt::layer().with_writer(writer).with_ansi(false).boxed(),
        };
        layers.push(file_layer);
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))?;

    Ok(guard)
}

/// Rotates log files for a given application and log directory.
///
/// Keeps the `keep` newest files (the date in the file name orders them) and
/// deletes the rest.
///
/// # Arguments
/// * `app_name` - The name of the application whose logs are being rotated.
/// * `log_dir` - The directory containing the log files.
/// * `keep` - How many of the newest files survive.
///
/// # Returns
/// The number of files deleted.
pub fn rotate_logs(app_name: &str, log_dir: &Path, keep: usize) -> usize {
    let pattern = format!("{}/{}.*.log", log_dir.display(), app_name);
    let mut log_files: Vec<PathBuf> = match glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            eprintln!("Invalid log rotation pattern {}: {}", pattern, e);
            return 0;
        }
    };

    // newest first
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old_file in log_files.iter().skip(keep) {
        match std::fs::remove_file(old_file) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Error deleting old log file {}: {}", old_file.display(), e),
        }
    }
    removed
}

//! # Quote Cache HTTP Server
//!
//! Serves stock quotes, intraday series, symbol search and market status over
//! HTTP, mediating every outbound call to the market data provider through a
//! shared cache.
//!
//! ## Key Features:
//! - **Cache-aside reads**: Redis when `REDIS_URL` is set, an in-process store
//!   otherwise. A cache outage degrades to direct provider calls.
//! - **Provider**: Alpha Vantage when an API key is configured; deterministic
//!   simulated data otherwise, or always in simulation mode.
//! - **Configurable**: defaults, then a JSON config file, then environment and
//!   command-line arguments, using `clap`.
//! - **Structured Logging**: `tracing` to the console and a daily log file.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

mod quotes_logic;
use quotes_logic::{config, routes, state};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = config::load_config()?;
    // Held until main returns so buffered file lines are flushed
    let _log_guard = lib_quotes::loggers::init(&config.logger_options()?)?;

    let app_state = state::AppState::from_config(&config)?;
    info!(
        port = config.port(),
        cache = app_state.service.cache_name(),
        provider = app_state.service.provider_id().unwrap_or("simulated"),
        fallback = %app_state.service.config().fallback_policy,
        "Configuration loaded"
    );

    let app = routes::router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting HTTP server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, initiating shutdown."),
        _ = terminate => info!("SIGTERM received, initiating shutdown."),
    }
}

//! HTTP surface of the quote cache. Handlers only translate between HTTP and
//! [`lib_quotes::QuoteService`]; all behavior lives in the service.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{delete, get, post},
};
use lib_quotes::models::{Served, ServedIntraday, ServedSearch};
use lib_quotes::{BatchEntry, Interval, MarketStatus, QuoteError, ServedQuote};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntradayParams {
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keywords: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/quote/{symbol}", get(get_quote))
        .route("/batch-quotes", post(get_batch_quotes))
        .route("/status", get(get_market_status))
        .route("/cache", delete(clear_all))
        .route("/cache/{symbol}", delete(clear_symbol))
        .route("/intraday/{symbol}", get(get_intraday))
        .route("/search", get(search_symbols))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn get_quote(State(state): State<AppState>, Path(symbol): Path<String>) -> Result<Json<ServedQuote>, ApiError> {
    Ok(Json(state.service.get_quote(&symbol).await?))
}

async fn get_batch_quotes(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    let Json(request) = payload.map_err(|e| QuoteError::InvalidRequest(e.body_text()))?;
    Ok(Json(state.service.get_batch_quotes(&request.symbols).await?))
}

async fn get_market_status(State(state): State<AppState>) -> Json<Served<MarketStatus>> {
    Json(state.service.get_market_status().await)
}

async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.service.clear_cache(None).await?;
    Ok(Json(ClearResponse { removed }))
}

async fn clear_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.service.clear_cache(Some(&symbol)).await?;
    Ok(Json(ClearResponse { removed }))
}

async fn get_intraday(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<IntradayParams>,
) -> Result<Json<ServedIntraday>, ApiError> {
    let interval = match params.interval.as_deref() {
        Some(raw) => raw.parse::<Interval>()?,
        None => Interval::default(),
    };
    Ok(Json(state.service.get_intraday(&symbol, interval).await?))
}

async fn search_symbols(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ServedSearch>, ApiError> {
    let keywords = params.keywords.unwrap_or_default();
    Ok(Json(state.service.search_symbols(&keywords).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use lib_quotes::{MemoryCache, QuoteService, ServiceConfig};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = ServiceConfig {
            simulation_mode: true,
            ..ServiceConfig::default()
        };
        let service = QuoteService::new(Arc::new(MemoryCache::new()), None, config);
        router(AppState::new(service))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_quote_then_cached() {
        let app = app();
        let (status, first) = send(&app, Method::GET, "/quote/aapl", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["symbol"], "AAPL");
        assert_eq!(first["cached"], false);
        assert_eq!(first["source"], "simulated");
        assert!(first["price"].as_f64().unwrap() > 0.0);
        assert!(first["changePercent"].is_number());

        let (_, second) = send(&app, Method::GET, "/quote/AAPL", None).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["price"], first["price"]);
    }

    #[tokio::test]
    async fn test_invalid_symbol_is_400() {
        let (status, body) = send(&app(), Method::GET, "/quote/A$PL", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "InvalidSymbol");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/batch-quotes",
            Some(r#"{"symbols": ["AAPL", "INVALID$YMBOL"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["symbol"], "AAPL");
        assert!(entries[0]["price"].is_number());
        assert_eq!(entries[1]["symbol"], "INVALID$YMBOL");
        assert_eq!(entries[1]["status"], 400);
        assert!(entries[1]["error"].is_string());
    }

    #[tokio::test]
    async fn test_batch_shape_errors_are_400() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/batch-quotes", Some(r#"{"symbols": []}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "InvalidRequest");

        let (status, body) = send(&app, Method::POST, "/batch-quotes", Some(r#"{"tickers": ["AAPL"]}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_status() {
        let (status, body) = send(&app(), Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["isOpen"].is_boolean());
        assert_eq!(body["timezone"], "America/New_York");
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn test_clear_cache_counts() {
        let app = app();
        send(&app, Method::GET, "/quote/AAPL", None).await;
        send(&app, Method::GET, "/quote/MSFT", None).await;
        send(&app, Method::GET, "/intraday/AAPL", None).await;

        let (status, body) = send(&app, Method::DELETE, "/cache/aapl", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 2);

        let (_, body) = send(&app, Method::DELETE, "/cache", None).await;
        assert_eq!(body["removed"], 1);

        let (_, body) = send(&app, Method::DELETE, "/cache", None).await;
        assert_eq!(body["removed"], 0);
    }

    #[tokio::test]
    async fn test_intraday_interval() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/intraday/MSFT?interval=15min", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["interval"], "15min");
        assert!(!body["bars"].as_array().unwrap().is_empty());

        let (status, body) = send(&app, Method::GET, "/intraday/MSFT?interval=2min", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_search() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/search?keywords=micro", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keywords"], "MICRO");
        assert_eq!(body["matches"][0]["symbol"], "MSFT");

        let (status, _) = send(&app, Method::GET, "/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

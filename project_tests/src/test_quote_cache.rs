//! # Quote Cache Live Runner
//!
//! Exercises a running `server_quotes` instance end to end over HTTP using the
//! workspace `ApiClient`. Not part of `cargo test`: start the server first
//! (simulation mode is enough), then run this binary against it.
//!
//! Exits non-zero on the first failed check.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use anyhow::{Result, bail};
use clap::Parser;
use lib_quotes::retrieve::ky_http::{ApiClient, ApiResponse};
use reqwest::Method;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(about = "Live checks against a running quote cache server")]
struct Args {
    /// Base URL of the server under test.
    #[clap(long, env = "QUOTES_BASE_URL", default_value = "http://127.0.0.1:8080/")]
    base_url: String,

    /// Symbol used for the single-quote checks.
    #[clap(long, default_value = "AAPL")]
    symbol: String,
}

const TIMEOUT: Duration = Duration::from_secs(30);

async fn call(api: &ApiClient, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse<Value>> {
    Ok(api.request::<Value, Value>(method, path, &[], None, body, Some(TIMEOUT)).await?)
}

/// Error bodies arrive as text; parse them for the `error_type` field.
fn error_type(res: &ApiResponse<Value>) -> Option<String> {
    let body: Value = serde_json::from_str(res.error_body.as_deref()?).ok()?;
    body["error_type"].as_str().map(str::to_string)
}

fn check(name: &str, ok: bool, detail: impl std::fmt::Display) -> Result<()> {
    if ok {
        println!("✅ {}", name);
        Ok(())
    } else {
        println!("❌ {} ({})", name, detail);
        bail!("check failed: {}", name)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let api = ApiClient::new(&args.base_url, None, 0)?;
    let symbol = args.symbol.to_ascii_uppercase();

    println!("--- Quote cache live checks against {} ---", api.base_url());

    // 1. Health
    let res = api
        .request::<Value, ()>(Method::GET, "health", &[], None, None, Some(TIMEOUT))
        .await;
    // the body is plain text, so a decode error still proves the server answered
    let healthy = match &res {
        Ok(r) => r.success,
        Err(lib_quotes::retrieve::ky_http::RetrieveError::Decode(_)) => true,
        Err(_) => false,
    };
    check("GET /health", healthy, format!("{:?}", res.err()))?;

    // 2. Start from a clean slate for the symbol
    let res = call(&api, Method::DELETE, &format!("cache/{}", symbol), None).await?;
    check("DELETE /cache/{symbol}", res.success, res.status)?;

    // 3. Miss, then hit
    let first = call(&api, Method::GET, &format!("quote/{}", symbol), None).await?;
    let first_body = first.data.clone().unwrap_or(Value::Null);
    check(
        "GET /quote first read is fresh",
        first.success && first_body["cached"] == json!(false),
        &first_body,
    )?;
    let second = call(&api, Method::GET, &format!("quote/{}", symbol), None).await?;
    let second_body = second.data.unwrap_or(Value::Null);
    check(
        "GET /quote second read is cached",
        second_body["cached"] == json!(true) && second_body["price"] == first_body["price"],
        &second_body,
    )?;

    // 4. Validation
    let invalid = call(&api, Method::GET, "quote/A$PL", None).await?;
    check(
        "GET /quote rejects malformed symbols",
        invalid.status == 400 && error_type(&invalid).as_deref() == Some("InvalidSymbol"),
        invalid.status,
    )?;

    // 5. Batch with one bad symbol
    let batch = call(
        &api,
        Method::POST,
        "batch-quotes",
        Some(json!({ "symbols": [symbol.as_str(), "INVALID$YMBOL"] })),
    )
    .await?;
    let entries = batch.data.unwrap_or(Value::Null);
    check(
        "POST /batch-quotes tolerates a bad symbol",
        entries.as_array().map(|a| a.len()) == Some(2) && entries[1]["status"] == json!(400),
        &entries,
    )?;

    // 6. Market status
    let status = call(&api, Method::GET, "status", None).await?;
    let status_body = status.data.unwrap_or(Value::Null);
    check(
        "GET /status",
        status_body["isOpen"].is_boolean() && status_body["cached"].is_boolean(),
        &status_body,
    )?;

    // 7. Intraday and search
    let intraday = call(&api, Method::GET, &format!("intraday/{}?interval=5min", symbol), None).await?;
    check("GET /intraday", intraday.success, intraday.status)?;

    let search = call(&api, Method::GET, "search?keywords=micro", None).await?;
    check("GET /search", search.success, search.status)?;

    // 8. Clear everything
    let cleared = call(&api, Method::DELETE, "cache", None).await?;
    let cleared_body = cleared.data.unwrap_or(Value::Null);
    check(
        "DELETE /cache reports a count",
        cleared_body["removed"].as_u64().is_some(),
        &cleared_body,
    )?;

    println!("--- All checks passed ---");
    Ok(())
}

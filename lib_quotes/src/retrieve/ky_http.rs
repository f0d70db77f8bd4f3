//! # HTTP Retrieval Utilities
//!
//! `ApiClient` resolves paths against a fixed base URL and exchanges JSON over
//! `reqwest`, optionally behind transient-failure retries. Status handling is
//! left to the caller: a non-2xx answer is a normal [`ApiResponse`], only
//! transport, URL and decoding problems are errors.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

/// Longest slice of an undecodable body kept in a [`RetrieveError::Decode`].
const BODY_SNIPPET: usize = 200;

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request timed out")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(String),
    /// A 2xx body that is not the expected JSON shape.
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RetrieveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RetrieveError::Timeout
        } else {
            RetrieveError::Transport(e.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for RetrieveError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(inner) => inner.into(),
            other => RetrieveError::Transport(other.to_string()),
        }
    }
}

/// Outcome of one exchange. `data` is set on 2xx, `error_body` otherwise.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error_body: Option<String>,
    pub status: u16,
    pub success: bool,
    pub headers: HeaderMap,
}

pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// `base_url` must be absolute; keep its trailing slash so joined paths
    /// stay below it. `max_retries == 0` installs no retry middleware.
    pub fn new(base_url: &str, auth_token: Option<String>, max_retries: u32) -> Result<Self, RetrieveError> {
        let base_url = Url::parse(base_url)?;

        let mut builder = ClientBuilder::new(reqwest::Client::new());
        if max_retries > 0 {
            let policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends `body` (if any) as JSON to `path` and decodes a 2xx answer into
    /// `T`. `timeout` bounds the whole exchange, body download included.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<HeaderMap>,
        body: Option<B>,
        timeout: Option<Duration>,
    ) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let req = self.prepare(method, path, query, headers, timeout)?;
        let req = match body {
            Some(b) => req
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_string(&b)?),
            None => req,
        };

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        // Read as text first so a decode failure can report what came back
        let text = response.text().await?;

        if !status.is_success() {
            return Ok(ApiResponse {
                data: None,
                error_body: Some(text),
                status: status.as_u16(),
                success: false,
                headers,
            });
        }

        let data = serde_json::from_str::<T>(&text)
            .map_err(|e| RetrieveError::Decode(format!("{} (body: {})", e, snippet(&text))))?;
        Ok(ApiResponse {
            data: Some(data),
            error_body: None,
            status: status.as_u16(),
            success: true,
            headers,
        })
    }

    fn prepare(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<HeaderMap>,
        timeout: Option<Duration>,
    ) -> Result<RequestBuilder, RetrieveError> {
        let mut req = self.inner.request(method, self.base_url.join(path)?);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(h) = headers {
            req = req.headers(h);
        }
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(limit) = timeout {
            req = req.timeout(limit);
        }
        Ok(req)
    }
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(BODY_SNIPPET) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_base_url_is_rejected() {
        let result = ApiClient::new("/query", None, 0);
        assert!(matches!(result, Err(RetrieveError::InvalidUrl(_))));
    }

    #[test]
    fn test_paths_join_below_base() {
        let client = ApiClient::new("https://www.alphavantage.co/", None, 0).unwrap();
        assert_eq!(client.base_url().as_str(), "https://www.alphavantage.co/");
        assert_eq!(
            client.base_url().join("query").unwrap().as_str(),
            "https://www.alphavantage.co/query"
        );
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(snippet(&long).chars().count(), BODY_SNIPPET);
        assert_eq!(snippet("short"), "short");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_or_timeout() {
        let client = ApiClient::new("http://127.0.0.1:1/", None, 0).unwrap();
        let result = client
            .request::<serde_json::Value, ()>(Method::GET, "x", &[], None, None, Some(Duration::from_secs(2)))
            .await;
        assert!(matches!(
            result,
            Err(RetrieveError::Transport(_)) | Err(RetrieveError::Timeout)
        ));
    }
}

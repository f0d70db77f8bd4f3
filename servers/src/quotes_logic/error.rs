use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lib_quotes::QuoteError;
use serde_json::json;
use tracing::{error, warn};

/// # API Error
///
/// Wraps a [`QuoteError`] so handlers can return it with `?`. Rendered as
/// `{"error_type", "message"}` with the status the error maps to.
#[derive(Debug)]
pub struct ApiError(pub QuoteError);

impl From<QuoteError> for ApiError {
    fn from(e: QuoteError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error_type = self.0.kind(), "{}", self.0);
        } else {
            warn!(error_type = self.0.kind(), "{}", self.0);
        }

        let body = json!({
            "error_type": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

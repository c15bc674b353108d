use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use duckserve_core::DuckserveError;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Failure of a query request, rendered as `{error, code}` JSON.
#[derive(Debug)]
pub struct ApiError(pub DuckserveError);

impl From<DuckserveError> for ApiError {
    fn from(err: DuckserveError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DuckserveError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            DuckserveError::InvalidSql(_) => (StatusCode::BAD_REQUEST, "INVALID_SQL"),
            DuckserveError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTION_ERROR"),
            DuckserveError::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, "CONNECTION_ERROR"),
            DuckserveError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(code, "query failed: {}", self.0);
        } else {
            warn!(code, "query rejected: {}", self.0);
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code,
        });
        (status, body).into_response()
    }
}

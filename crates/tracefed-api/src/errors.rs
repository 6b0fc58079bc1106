//! API error types with their HTTP mappings.
//!
//! The fan-out/merge core never surfaces 5xx for backend trouble; partial
//! failure is carried in-band. Only programming errors (response encoding)
//! land here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Response marshalling failed (500 Internal Server Error)
    #[error("failed to encode response: {message}")]
    Encoding { message: String },
}

impl ApiError {
    pub fn encoding(message: impl Into<String>) -> Self {
        ApiError::Encoding {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Encoding { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, status = status.as_u16(), "request failed");
        let body = Json(json!({
            "error": "internal_error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

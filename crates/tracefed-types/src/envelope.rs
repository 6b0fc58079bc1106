//! The per-backend response envelope.
//!
//! Created by the backend client, consumed by exactly one merger. A completed
//! HTTP exchange carries status + body regardless of status code value; a
//! transport failure carries only an error description. Status-code
//! classification is the consuming merger's job, so a 404 here is not an
//! error.

use bytes::Bytes;
use http::StatusCode;

#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// Display name of the originating backend.
    pub backend: String,
    /// HTTP status of a completed exchange; absent on transport failure.
    pub status: Option<StatusCode>,
    /// Response body of a completed exchange.
    pub body: Bytes,
    /// Transport failure description; absent on a completed exchange.
    pub error: Option<String>,
}

impl BackendResponse {
    pub fn completed(backend: impl Into<String>, status: StatusCode, body: Bytes) -> Self {
        BackendResponse {
            backend: backend.into(),
            status: Some(status),
            body,
            error: None,
        }
    }

    pub fn transport_error(backend: impl Into<String>, error: impl ToString) -> Self {
        BackendResponse {
            backend: backend.into(),
            status: None,
            body: Bytes::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }
}

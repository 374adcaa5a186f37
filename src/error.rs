//! Error taxonomy for the box registry.
//!
//! Registry outcomes (`BoxNotFound`, `AlreadyExists`) are expected,
//! user-facing results; they render as `Success: false` bodies with HTTP 200.
//! Everything else is a failure of the read pipeline itself.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ---
    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("box {0} does not exist")]
    BoxNotFound(String),

    #[error("cache artifact {0} not found")]
    ArtifactNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("no cache available for box {0}")]
    NoCacheAvailable(String),

    #[error("box {0} already exists")]
    AlreadyExists(String),
}

impl Error {
    /// Text placed in the `Reason` field of a rejected request.
    pub fn reason(&self) -> String {
        match self {
            Error::BoxNotFound(_) => "Box does not exists".to_string(),
            Error::AlreadyExists(_) => "Box already exists".to_string(),
            Error::UpstreamUnavailable(_) => "Upstream unavailable".to_string(),
            _ => "Internal error".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::BoxNotFound(_) | Error::AlreadyExists(_) => StatusCode::OK,
            Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }
        let body = Json(json!({ "Success": false, "Reason": self.reason() }));
        (status, body).into_response()
    }
}

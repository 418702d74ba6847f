//! Error types for the relay server
//!
//! Provides unified error handling using thiserror. Relay handlers are the
//! only place these are turned into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Relay Error Enum ==
/// Unified error type for the relay server.
///
/// `Clone` because one failed load is handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Missing or malformed request parameter
    #[error("Invalid parameter: {0}")]
    ParameterInvalid(String),

    /// Upstream API could not be reached
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream API did not answer in time
    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// Upstream API answered with a non-2xx status
    #[error("Upstream returned {status}: {message}")]
    UpstreamError { status: u16, message: String },

    /// Upstream body could not be read after the headers arrived
    #[error("Upstream read failed: {0}")]
    UpstreamReadFailed(String),

    /// Peer transport request from an address that is not a configured peer
    #[error("Peer rejected: {0}")]
    PeerRejected(String),

    /// Peer transport request for a group this node does not serve
    #[error("Unknown cache group: {0}")]
    UnknownGroup(String),

    /// Fetch from the owning peer failed
    #[error("Peer fetch failed: {0}")]
    PeerFetch(String),

    /// Unexpected failure inside the cache group
    #[error("Internal error: {0}")]
    CacheInternal(String),
}

impl RelayError {
    // == Status Code ==
    /// Maps the error kind to the status code returned to the caller.
    ///
    /// Upstream 4xx statuses are passed through; upstream 5xx statuses become
    /// 502 since the failure is on the far side of this gateway.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::ParameterInvalid(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::UpstreamError { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            RelayError::UpstreamReadFailed(_) => StatusCode::BAD_GATEWAY,
            RelayError::PeerRejected(_) => StatusCode::FORBIDDEN,
            RelayError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            RelayError::PeerFetch(_) => StatusCode::BAD_GATEWAY,
            RelayError::CacheInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.to_string()));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the relay server.
pub type Result<T> = std::result::Result<T, RelayError>;

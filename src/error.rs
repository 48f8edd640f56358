//! Error types for the CDN services
//!
//! Provides unified error handling using thiserror.

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == CDN Error Enum ==
/// Unified error type for the origin, cache node and router.
#[derive(Error, Debug)]
pub enum CdnError {
    /// Missing, empty or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket could not be bound at startup
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Datagram or path parameter that is not a valid request
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Key not present
    #[error("Key not found: {0}")]
    NotFound(u64),

    /// Every attempt against an origin timed out
    #[error("Origin {origin} did not answer after {attempts} attempts")]
    OriginTimeout { origin: String, attempts: u32 },

    /// Single request went unanswered
    #[error("No reply from {peer} within the timeout")]
    Timeout { peer: String },

    /// Peer answered with an empty payload
    #[error("Empty reply from {peer}")]
    EmptyReply { peer: String },

    /// Non-timeout I/O failure while talking to a peer
    #[error("Network error with {peer}: {source}")]
    Network {
        peer: String,
        #[source]
        source: io::Error,
    },

    /// Cache is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CdnError {
    /// Wraps an I/O error raised while talking to `peer`.
    pub fn network(peer: impl Into<String>, source: io::Error) -> Self {
        CdnError::Network {
            peer: peer.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CdnError {
    fn into_response(self) -> Response {
        let status = match &self {
            CdnError::NotFound(_) => StatusCode::NOT_FOUND,
            CdnError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            CdnError::CacheFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the CDN services.
pub type Result<T> = std::result::Result<T, CdnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CdnError::NotFound(7).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CdnError::MalformedRequest("x".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CdnError::CacheFull("full".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            CdnError::Config("bad".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_origin_timeout_message() {
        let err = CdnError::OriginTimeout {
            origin: "127.0.0.1:7777".into(),
            attempts: 6,
        };
        assert_eq!(
            err.to_string(),
            "Origin 127.0.0.1:7777 did not answer after 6 attempts"
        );
    }
}

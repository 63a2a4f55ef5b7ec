//! Error types for the mcpdemo SDK.

use mcpdemo_core::{JsonRpcResponse, ProtocolError};

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Error types that can occur when talking to an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON-RPC error or malformed result.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server reply could not be matched to the request.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server picked a protocol revision this client does not speak.
    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocol(String),

    /// The session was already closed.
    #[error("Session is closed")]
    SessionClosed,
}

impl SdkError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The server no longer knows the session (HTTP 404 on a session request).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Create an API error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        // Servers usually explain themselves with a JSON-RPC error body
        let message = serde_json::from_str::<JsonRpcResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map(|e| e.message)
            .unwrap_or_else(|| body.trim().to_string());

        Self::Api { status, message }
    }
}

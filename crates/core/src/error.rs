//! Errors raised while building or interpreting protocol messages.

/// Result type for protocol helpers.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The peer answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// A response carried neither `result` nor `error`.
    #[error("response {0} has no result")]
    MissingResult(serde_json::Value),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

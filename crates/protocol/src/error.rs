//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding server messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message has no \"type\" field")]
    MissingType,

    #[error("Malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
}

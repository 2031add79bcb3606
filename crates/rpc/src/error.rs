//! Error types for RPC calls.

use thiserror::Error;

/// Errors from a single RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response body carried no `result` object.
    #[error("Response to {method} has no result object")]
    MissingResult { method: String },

    /// The server answered with `status: error`.
    #[error("Server error for {method}: {error} ({})", .message.as_deref().unwrap_or("no message"))]
    Server {
        method: String,
        error: String,
        message: Option<String>,
    },

    /// The `result` object did not have the expected shape.
    #[error("Failed to decode {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Whether the call may succeed if simply repeated.
    ///
    /// Connection failures, HTTP error statuses and server error replies
    /// (`tooBusy`, `noCurrent`, ...) are what a loaded server produces. A
    /// result of the wrong shape will not fix itself.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RpcError::Decode { .. })
    }

    pub(crate) fn decode(method: &str, reason: impl ToString) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

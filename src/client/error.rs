//! Client error types.

use thiserror::Error;

use crate::transport::TransportError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Marker the server puts in memory-limit exceptions.
const MEMORY_LIMIT_MARKER: &str = "Memory limit";

/// Every failure the client can surface.
///
/// Variants carry plain messages so errors can be cloned into both the
/// iterator's error slot and the value handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request could not be built (bad host, scheme or credentials).
    #[error("can't build request to {target}: {message}")]
    RequestBuild { target: String, message: String },

    /// The exchange failed before a status was received.
    #[error("can't do request to {target}: {message}")]
    Transport { target: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response carried no header line.
    #[error("can't get columns names")]
    NoColumns,

    /// A row had fewer cells than the header.
    #[error("malformed row: expected {expected} cells, found {found}")]
    MalformedRow { expected: usize, found: usize },

    /// Reading the response stream failed.
    #[error("read error: {0}")]
    Read(String),

    /// The requested column is not part of the row.
    #[error("can't get value by `{0}`")]
    FieldNotFound(String),

    /// A cell could not be parsed into the requested type.
    #[error("can't convert value {value} to {kind}: {reason}")]
    Conversion {
        value: String,
        kind: &'static str,
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Check if the error reports a server-side memory limit. Such errors
    /// abort the retry loop.
    pub fn is_memory_limit(&self) -> bool {
        match self {
            ClientError::Transport { message, .. } | ClientError::Status { message, .. } => {
                message.contains(MEMORY_LIMIT_MARKER)
            }
            _ => false,
        }
    }

    /// Check if another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. } | ClientError::Status { .. }
        ) && !self.is_memory_limit()
    }

    pub(crate) fn transport(target: &str, err: TransportError) -> Self {
        ClientError::Transport {
            target: target.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Read(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::InvalidConfig(e.to_string())
    }
}

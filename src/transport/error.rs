//! Transport errors.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures of the raw exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = error_chain(&e);
        if e.is_timeout() {
            TransportError::Timeout(message)
        } else if e.is_connect() {
            TransportError::Connect(message)
        } else {
            TransportError::Other(message)
        }
    }
}

// reqwest's top-level Display hides the cause; the memory-limit check
// needs the full text.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

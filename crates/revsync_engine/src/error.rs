//! Error types for the engine.

use revsync_protocol::ProtocolError;
use revsync_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration. The only fatal, unrecoverable error: it
    /// terminates initialization before any session state is created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server rejected the request.
    #[error("server error: {0}")]
    Server(String),

    /// Message encoding or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// Not connected to the remote service.
    #[error("not connected to service")]
    NotConnected,
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// The billing layer uses this to decide whether a failed purchase
    /// submission should be redelivered on the next purchase-update
    /// notification.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            EngineError::Server(_) => true,
            EngineError::Timeout => true,
            EngineError::NotConnected => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::transport_retryable("connection reset").is_retryable());
        assert!(!EngineError::transport_fatal("invalid certificate").is_retryable());
        assert!(EngineError::Timeout.is_retryable());
        assert!(EngineError::NotConnected.is_retryable());
        assert!(EngineError::Server("internal error".into()).is_retryable());
        assert!(!EngineError::Configuration("empty key".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::Configuration("access key must not be empty".into());
        assert!(err.to_string().contains("access key"));

        let err = EngineError::transport_retryable("dns failure");
        assert!(err.to_string().contains("dns failure"));
    }
}

//! Error types for the server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller is not authorized.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The requested endpoint does not exist.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

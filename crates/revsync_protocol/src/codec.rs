//! JSON encoding/decoding helpers.
//!
//! The remote service speaks JSON; serialization mechanics are kept behind
//! these two helpers so transports never depend on serde_json directly.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A message could not be encoded to JSON.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// A response body could not be decoded from JSON.
    #[error("failed to decode message: {0}")]
    Decode(String),
}

/// Encodes a message to JSON bytes.
pub fn encode_json<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes a message from JSON bytes.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

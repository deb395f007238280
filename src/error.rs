//! # Error Types
//!
//! Error handling for the secure conversation layer.
//!
//! Every failure inside the chunk pipeline is a [`ProtocolError`]. The pipeline
//! never lets one escape from [`feed`](crate::protocol::pipeline::SecureMessageReader::feed):
//! it is converted into a [`Notification::PipelineError`](crate::protocol::notification::Notification)
//! at that boundary, so a bad chunk costs the current message and nothing else.
//!
//! ## Error Categories
//! - **Frame Errors**: unknown message type, bad chunk role, length mismatch, truncation
//! - **Cryptographic Errors**: unsupported policy, decryption failure, bad signature
//! - **Token Errors**: unknown token, expired token
//! - **Body Errors**: unknown type identifier, decoder failure
//! - **Remote Errors**: ERR chunks and aborted messages sent by the peer
//!
//! Continuation point and numeric range operations do not use this type; they
//! report a [`StatusCode`] instead.
//!
//! ## Example Usage
//! ```rust
//! use opcua_secure_conversation::error::{ProtocolError, Result};
//! use tracing::error;
//!
//! fn require_token(found: bool, token_id: u32) -> Result<()> {
//!     if !found {
//!         return Err(ProtocolError::UnknownToken(token_id));
//!     }
//!     Ok(())
//! }
//!
//! if let Err(e) = require_token(false, 7) {
//!     error!(error = %e, status = %e.status_code(), "token lookup failed");
//! }
//! ```

use crate::core::header::MessageType;
use crate::core::node_id::ExpandedNodeId;
use crate::services::status::StatusCode;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Registry errors
    pub const ERR_REGISTRY_WRITE_LOCK: &str = "Failed to acquire write lock on decoder registry";
    pub const ERR_REGISTRY_READ_LOCK: &str = "Failed to acquire read lock on decoder registry";

    /// Frame errors
    pub const ERR_TRUNCATED_HEADER: &str = "Chunk shorter than its header";
    pub const ERR_TRUNCATED_SECURITY_HEADER: &str = "Chunk ends inside its security header";
    pub const ERR_TRUNCATED_SEQUENCE_HEADER: &str = "Chunk ends inside its sequence header";

    /// Security errors
    pub const ERR_MISSING_PRIVATE_KEY: &str = "Encrypted OPN received but no private key is set";
    pub const ERR_MISSING_SENDER_CERTIFICATE: &str = "OPN security header carries no sender certificate";
    pub const ERR_ASYMMETRIC_SIGNATURE: &str = "Invalid packet signature (asymmetric verify)";
    pub const ERR_SYMMETRIC_SIGNATURE: &str = "Invalid packet signature (symmetric verify)";
    pub const ERR_SECURITY_MODE_NOT_SET: &str = "Security mode is not set for a secured channel";
    pub const ERR_SECURITY_NOT_ESTABLISHED: &str = "Secured message received before the channel was opened";

    /// Body errors
    pub const ERR_DECODER_PANICKED: &str = "Decoder panicked";
    pub const ERR_SINK_PANICKED: &str = "Notification sink panicked";
}

/// ProtocolError is the primary error type for all pipeline operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid chunk header: {0}")]
    InvalidHeader(&'static str),

    #[error("Unknown message type: {0:?}")]
    InvalidMessageType([u8; 3]),

    #[error("Unknown chunk type: 0x{0:02x}")]
    InvalidChunkType(u8),

    #[error("Chunk length mismatch: header declares {declared} bytes, received {actual}")]
    ChunkLengthMismatch { declared: usize, actual: usize },

    #[error("Chunk too large: {size} bytes (limit {limit})")]
    OversizedChunk { size: usize, limit: usize },

    #[error("Message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Too many chunks for one message: {count} (limit {limit})")]
    TooManyChunks { count: usize, limit: usize },

    #[error("Request id changed inside a message: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: u32, actual: u32 },

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Error received from peer: {status} {reason}")]
    RemoteError { status: StatusCode, reason: String },

    #[error("Message {request_id} aborted by sender: {status} {reason}")]
    MessageAborted {
        request_id: u32,
        status: StatusCode,
        reason: String,
    },

    #[error("Unsupported security policy: {0}")]
    UnsupportedSecurityPolicy(String),

    #[error("Security policy {0} is not implemented")]
    SecurityPolicyNotImplemented(&'static str),

    #[error("Security policy changed on an open channel: {current} -> {requested}")]
    SecurityPolicyMismatch {
        current: &'static str,
        requested: &'static str,
    },

    #[error("Security error: {0}")]
    SecurityError(&'static str),

    #[error("Unsupported signature length: {0} bytes")]
    InvalidSignatureLength(usize),

    #[error("Invalid padding: {0}")]
    InvalidPadding(String),

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Security token {0} does not exist")]
    UnknownToken(u32),

    #[error("Security token has expired: tokenId {0}")]
    ExpiredToken(u32),

    #[error("Security token {0} has no derived keys")]
    MissingDerivedKeys(u32),

    #[error("Unexpected message type {0}")]
    UnexpectedMessage(MessageType),

    #[error("Cannot construct object with type id {0}")]
    UnknownTypeId(ExpandedNodeId),

    #[error("Cannot decode message of type {type_id}: {reason}")]
    BodyDecode {
        type_id: ExpandedNodeId,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Status code a transport would report to the peer for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProtocolError::Io(_) => StatusCode::BAD_TCP_INTERNAL_ERROR,
            ProtocolError::InvalidHeader(_)
            | ProtocolError::InvalidChunkType(_)
            | ProtocolError::ChunkLengthMismatch { .. }
            | ProtocolError::Decoding(_) => StatusCode::BAD_DECODING_ERROR,
            ProtocolError::InvalidMessageType(_) | ProtocolError::UnexpectedMessage(_) => {
                StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID
            }
            ProtocolError::OversizedChunk { .. }
            | ProtocolError::MessageTooLarge { .. }
            | ProtocolError::TooManyChunks { .. } => StatusCode::BAD_TCP_MESSAGE_TOO_LARGE,
            ProtocolError::RequestIdMismatch { .. } => StatusCode::BAD_SEQUENCE_NUMBER_INVALID,
            ProtocolError::RemoteError { status, .. }
            | ProtocolError::MessageAborted { status, .. } => *status,
            ProtocolError::UnsupportedSecurityPolicy(_)
            | ProtocolError::SecurityPolicyNotImplemented(_)
            | ProtocolError::SecurityPolicyMismatch { .. } => {
                StatusCode::BAD_SECURITY_POLICY_REJECTED
            }
            ProtocolError::SecurityError(_)
            | ProtocolError::InvalidSignatureLength(_)
            | ProtocolError::InvalidPadding(_)
            | ProtocolError::DecryptionFailure => StatusCode::BAD_SECURITY_CHECKS_FAILED,
            ProtocolError::UnknownToken(_)
            | ProtocolError::ExpiredToken(_)
            | ProtocolError::MissingDerivedKeys(_) => StatusCode::BAD_SECURE_CHANNEL_TOKEN_UNKNOWN,
            ProtocolError::UnknownTypeId(_) | ProtocolError::BodyDecode { .. } => {
                StatusCode::BAD_DECODING_ERROR
            }
            ProtocolError::ConfigError(_) | ProtocolError::Custom(_) => {
                StatusCode::BAD_UNEXPECTED_ERROR
            }
        }
    }

    /// Whether the error was raised before the chunk's security was checked.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidHeader(_)
                | ProtocolError::InvalidMessageType(_)
                | ProtocolError::InvalidChunkType(_)
                | ProtocolError::ChunkLengthMismatch { .. }
                | ProtocolError::OversizedChunk { .. }
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_are_distinct() {
        let unknown = ProtocolError::UnknownToken(4);
        let expired = ProtocolError::ExpiredToken(4);
        assert_ne!(unknown.to_string(), expired.to_string());
        assert!(expired.to_string().contains("expired"));
        assert_eq!(
            unknown.status_code(),
            StatusCode::BAD_SECURE_CHANNEL_TOKEN_UNKNOWN
        );
    }

    #[test]
    fn test_remote_status_is_preserved() {
        let err = ProtocolError::RemoteError {
            status: StatusCode::BAD_TCP_ENDPOINT_URL_INVALID,
            reason: "no such endpoint".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_TCP_ENDPOINT_URL_INVALID);
    }

    #[test]
    fn test_frame_error_classification() {
        assert!(ProtocolError::InvalidMessageType(*b"XYZ").is_frame_error());
        assert!(!ProtocolError::DecryptionFailure.is_frame_error());
    }
}

//! Error types for the Sealwire protocol engine.
//!
//! [`DecodeError`] is what a caller may learn about a rejected request: each
//! variant maps to an HTTP status, an `ErrorCode` and a fixed message. The
//! underlying cause (which byte failed, which primitive complained) is only
//! logged, never sent.

use std::fmt;

use sealwire_crypto::CryptoError;
use sealwire_proto::{ErrorResponse, ProtocolError};
use thiserror::Error;

/// Which part of the envelope a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPart {
    /// Request body is not an `EncryptedMessage` JSON envelope
    Envelope,
    /// `EncryptedSymmetricKey` could not be decoded, unwrapped or verified
    SymmetricKey,
    /// `EncryptedBody` could not be decoded, verified, decrypted or parsed
    Body,
}

impl InvalidPart {
    /// Message sent to the caller.
    pub fn message(self) -> &'static str {
        match self {
            Self::Envelope => "EncryptedMessage is Invalid",
            Self::SymmetricKey => "EncryptedSymmetricKey is Invalid",
            Self::Body => "EncryptedBody is Invalid",
        }
    }
}

impl fmt::Display for InvalidPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Reasons a request envelope is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Malformed or unauthentic envelope content
    #[error("{0}")]
    InvalidMessage(InvalidPart),

    /// Request IV was already used within its lifetime
    #[error("Nonce already seen")]
    NonceSeen,

    /// Request timestamp is older than the freshness window allows
    #[error("Request too old")]
    RequestTooOld {
        /// Timestamp carried by the request
        timestamp: i64,
        /// Oldest timestamp that would have been accepted
        oldest_allowed: i64,
    },

    /// Request timestamp is further in the future than the allowed skew
    #[error("Request timestamp is in the future")]
    RequestTooNew {
        /// Timestamp carried by the request
        timestamp: i64,
        /// Newest timestamp that would have been accepted
        newest_allowed: i64,
    },
}

impl DecodeError {
    /// HTTP status the rejection is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidMessage(_) => 400,
            Self::NonceSeen | Self::RequestTooOld { .. } | Self::RequestTooNew { .. } => 403,
        }
    }

    /// Stable identifier placed in `ResponseStatus.ErrorCode`.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "InvalidMessage",
            Self::NonceSeen => "NonceSeen",
            Self::RequestTooOld { .. } => "RequestTooOld",
            Self::RequestTooNew { .. } => "RequestTooNew",
        }
    }

    /// Error body to encrypt back to the caller.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.to_string())
    }
}

/// Failures while producing an encrypted response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Dispatcher result could not be serialized to JSON
    #[error("failed to serialize response: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Client-side failures building a request or reading its response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Key wrapping or response decryption failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Request line or response envelope is malformed
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Published key does not match the pinned fingerprint
    #[error("public key fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch {
        /// Pinned fingerprint
        expected: String,
        /// Fingerprint of the key that was offered
        actual: String,
    },

    /// Decrypted response is not UTF-8
    #[error("response body is not valid UTF-8")]
    InvalidUtf8,
}

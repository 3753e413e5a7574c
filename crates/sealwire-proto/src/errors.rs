//! Protocol decoding errors.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Structural errors while decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Field is not valid standard base64
    #[error("{field} is not valid base64")]
    InvalidBase64 {
        /// Wire field name
        field: &'static str,
    },

    /// Decoded field is shorter than its fixed-width parts
    #[error("{field} too short: {actual} bytes, need at least {minimum}")]
    TooShort {
        /// Wire field name
        field: &'static str,
        /// Decoded length
        actual: usize,
        /// Minimum acceptable length
        minimum: usize,
    },

    /// Ciphertext is not a whole number of cipher blocks
    #[error("{field} ciphertext of {actual} bytes is not block-aligned")]
    Misaligned {
        /// Wire field name
        field: &'static str,
        /// Ciphertext length
        actual: usize,
    },

    /// Plaintext request line is empty or malformed
    #[error("malformed request line: {0}")]
    MalformedLine(&'static str),

    /// JSON envelope could not be parsed
    #[error("invalid envelope JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::TooShort { field: "EncryptedBody", actual: 10, minimum: 64 };
        assert_eq!(err.to_string(), "EncryptedBody too short: 10 bytes, need at least 64");

        let err = ProtocolError::MalformedLine("missing operation");
        assert_eq!(err.to_string(), "malformed request line: missing operation");
    }
}

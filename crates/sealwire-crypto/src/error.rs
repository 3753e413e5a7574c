//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from cryptographic primitives.
///
/// Variants deliberately carry no detail about *why* symmetric decryption
/// failed: padding errors and authentication errors must look the same to a
/// caller that forwards them to a peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Symmetric decryption failed (bad padding, bad length, or bad tag)
    #[error("decryption failed")]
    DecryptionFailed,

    /// RSA key is malformed, too small, or could not unwrap a ciphertext
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Human-readable cause, for operator logs only
        reason: String,
    },

    /// Key or payload has the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// RSA encryption of a session payload failed
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Underlying cause
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error indicates server misconfiguration.
    ///
    /// Key-material errors raised while loading or generating the server
    /// keypair are fatal at startup. Everything else is a per-message failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidKeyMaterial { .. })
    }

    pub(crate) fn key_material(reason: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failure_has_no_detail() {
        assert_eq!(CryptoError::DecryptionFailed.to_string(), "decryption failed");
    }

    #[test]
    fn key_material_is_configuration_error() {
        assert!(CryptoError::key_material("modulus too small").is_configuration());
        assert!(!CryptoError::DecryptionFailed.is_configuration());
        assert!(!CryptoError::InvalidKeyLength { expected: 64, actual: 12 }.is_configuration());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidKeyLength { expected: 64, actual: 63 };
        assert_eq!(err.to_string(), "invalid key length: expected 64, got 63");
    }
}

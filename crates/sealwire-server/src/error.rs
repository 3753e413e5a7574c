//! Server error types.

use sealwire_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while starting or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (unreadable key file, invalid bind address, etc.).
    ///
    /// These are fatal errors that prevent server startup. Fix configuration
    /// and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Server key could not be loaded, generated or exported.
    ///
    /// Fatal at registration: the channel never starts with a broken key.
    #[error("key error: {0}")]
    Key(#[from] CryptoError),

    /// Transport/network error (bind failure, accept failure, etc.).
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_keep_their_reason() {
        let err = ServerError::from(CryptoError::InvalidKeyMaterial { reason: "bad PEM".to_string() });
        assert!(err.to_string().starts_with("key error:"));
        assert!(err.to_string().contains("bad PEM"));
    }
}

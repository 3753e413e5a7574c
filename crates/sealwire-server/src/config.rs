//! Runtime configuration for the HTTP host.

use std::path::PathBuf;

use sealwire_core::EngineConfig;
use sealwire_crypto::{KeyLength, PublicKeyFormat};

/// Default route serving the public key.
pub const DEFAULT_PUBLIC_KEY_PATH: &str = "/publickey";

/// Default route accepting encrypted envelopes.
pub const DEFAULT_MESSAGE_PATH: &str = "/json/reply/EncryptedMessage";

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Private key file (PEM or `RSAKeyValue` XML). Generated at startup when
    /// absent.
    pub private_key_path: Option<PathBuf>,
    /// Modulus size for a generated key
    pub key_length: KeyLength,
    /// Encoding of the published public key
    pub public_key_format: PublicKeyFormat,
    /// Route serving the public key
    pub public_key_path: String,
    /// Route accepting encrypted envelopes
    pub message_path: String,
    /// Freshness and replay settings
    pub engine: EngineConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            private_key_path: None,
            key_length: KeyLength::default(),
            public_key_format: PublicKeyFormat::default(),
            public_key_path: DEFAULT_PUBLIC_KEY_PATH.to_string(),
            message_path: DEFAULT_MESSAGE_PATH.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

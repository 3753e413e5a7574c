//! JSON envelopes exchanged with clients.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Inbound encrypted request.
///
/// ```json
/// { "EncryptedSymmetricKey": "<base64>", "EncryptedBody": "<base64>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Base64 [`KeyExchangeBlob`](crate::KeyExchangeBlob)
    #[serde(rename = "EncryptedSymmetricKey")]
    pub encrypted_symmetric_key: String,

    /// Base64 [`SymmetricBlob`](crate::SymmetricBlob)
    #[serde(rename = "EncryptedBody")]
    pub encrypted_body: String,
}

impl EncryptedMessage {
    /// Parse an envelope from a JSON request body.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Outbound encrypted response, used for both success and error results.
///
/// ```json
/// { "EncryptedBody": "<base64>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessageResponse {
    /// Base64 [`SymmetricBlob`](crate::SymmetricBlob)
    #[serde(rename = "EncryptedBody")]
    pub encrypted_body: String,
}

impl EncryptedMessageResponse {
    /// Parse a response envelope (client side).
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

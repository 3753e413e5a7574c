//! Binary blobs carried as base64 in the envelope fields.
//!
//! Both blobs share one layout, the output of the authenticate primitive:
//!
//! ```text
//! KeyExchangeBlob:  IV (16) ‖ RSA-OAEP(cryptKey ‖ authKey) ‖ tag (32)
//! SymmetricBlob:    IV (16) ‖ AES-256-CBC(body)            ‖ tag (32)
//! ```
//!
//! The middle section is variable width: its size depends on the RSA modulus
//! or on the padded body length. Decoding splits off the fixed-width IV and
//! tag and keeps the raw bytes so the tag can later be verified over exactly
//! what arrived.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sealwire_crypto::{IV_SIZE, TAG_SIZE};

use crate::errors::{ProtocolError, Result};

const KEY_FIELD: &str = "EncryptedSymmetricKey";
const BODY_FIELD: &str = "EncryptedBody";

/// AES block size; CBC ciphertext is always a multiple of it.
const BLOCK_SIZE: usize = 16;

/// Decoded `EncryptedSymmetricKey` field.
///
/// # Invariants
///
/// - `bytes.len() > IV_SIZE + TAG_SIZE` (the RSA ciphertext is non-empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExchangeBlob {
    bytes: Vec<u8>,
}

impl KeyExchangeBlob {
    /// Decode the base64 wire field.
    ///
    /// # Errors
    ///
    /// - `InvalidBase64`: field is not standard base64
    /// - `TooShort`: no room for IV, tag, and at least one ciphertext byte
    pub fn decode(field: &str) -> Result<Self> {
        let bytes = decode_base64(KEY_FIELD, field)?;
        Self::from_bytes(bytes)
    }

    /// Wrap already-decoded bytes, checking the layout.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        check_min_len(KEY_FIELD, bytes.len(), IV_SIZE + 1 + TAG_SIZE)?;
        Ok(Self { bytes })
    }

    /// Leading IV, which doubles as the request nonce.
    pub fn iv(&self) -> [u8; IV_SIZE] {
        leading_iv(&self.bytes)
    }

    /// The RSA-OAEP ciphertext between IV and tag.
    pub fn rsa_ciphertext(&self) -> &[u8] {
        middle(&self.bytes)
    }

    /// Trailing HMAC tag.
    pub fn tag(&self) -> &[u8] {
        trailing_tag(&self.bytes)
    }

    /// The full `IV ‖ ciphertext ‖ tag` buffer, as the tag check expects it.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode for the wire.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Decoded `EncryptedBody` field (requests and responses).
///
/// # Invariants
///
/// - ciphertext is non-empty and a multiple of the AES block size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricBlob {
    bytes: Vec<u8>,
}

impl SymmetricBlob {
    /// Decode the base64 wire field.
    ///
    /// # Errors
    ///
    /// - `InvalidBase64`: field is not standard base64
    /// - `TooShort`: no room for IV, tag, and one cipher block
    /// - `Misaligned`: ciphertext is not a whole number of blocks
    pub fn decode(field: &str) -> Result<Self> {
        let bytes = decode_base64(BODY_FIELD, field)?;
        Self::from_bytes(bytes)
    }

    /// Wrap already-decoded bytes, checking the layout.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        check_min_len(BODY_FIELD, bytes.len(), IV_SIZE + BLOCK_SIZE + TAG_SIZE)?;

        let ciphertext_len = bytes.len() - IV_SIZE - TAG_SIZE;
        if ciphertext_len % BLOCK_SIZE != 0 {
            return Err(ProtocolError::Misaligned { field: BODY_FIELD, actual: ciphertext_len });
        }

        Ok(Self { bytes })
    }

    /// Leading IV used to encrypt the body.
    pub fn iv(&self) -> [u8; IV_SIZE] {
        leading_iv(&self.bytes)
    }

    /// AES-CBC ciphertext between IV and tag.
    pub fn ciphertext(&self) -> &[u8] {
        middle(&self.bytes)
    }

    /// Trailing HMAC tag.
    pub fn tag(&self) -> &[u8] {
        trailing_tag(&self.bytes)
    }

    /// The full `IV ‖ ciphertext ‖ tag` buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode for the wire.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>> {
    STANDARD.decode(value.trim()).map_err(|_| ProtocolError::InvalidBase64 { field })
}

fn check_min_len(field: &'static str, actual: usize, minimum: usize) -> Result<()> {
    if actual < minimum {
        return Err(ProtocolError::TooShort { field, actual, minimum });
    }
    Ok(())
}

// Accessors below rely on the constructors' length checks.

fn leading_iv(bytes: &[u8]) -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&bytes[..IV_SIZE]);
    iv
}

fn middle(bytes: &[u8]) -> &[u8] {
    &bytes[IV_SIZE..bytes.len() - TAG_SIZE]
}

fn trailing_tag(bytes: &[u8]) -> &[u8] {
    &bytes[bytes.len() - TAG_SIZE..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(iv: u8, middle_len: usize, tag: u8) -> Vec<u8> {
        let mut bytes = vec![iv; IV_SIZE];
        bytes.extend((0..middle_len).map(|i| i as u8));
        bytes.extend(std::iter::repeat_n(tag, TAG_SIZE));
        bytes
    }

    #[test]
    fn key_exchange_splits_fields() {
        let blob = KeyExchangeBlob::from_bytes(layout(0x01, 128, 0xEE)).unwrap();

        assert_eq!(blob.iv(), [0x01; IV_SIZE]);
        assert_eq!(blob.rsa_ciphertext().len(), 128);
        assert_eq!(blob.rsa_ciphertext()[5], 5);
        assert_eq!(blob.tag(), &[0xEE; TAG_SIZE]);
        assert_eq!(blob.as_bytes().len(), IV_SIZE + 128 + TAG_SIZE);
    }

    #[test]
    fn key_exchange_base64_roundtrip() {
        let blob = KeyExchangeBlob::from_bytes(layout(0x02, 256, 0xAA)).unwrap();
        assert_eq!(KeyExchangeBlob::decode(&blob.to_base64()).unwrap(), blob);
    }

    #[test]
    fn key_exchange_rejects_missing_ciphertext() {
        let result = KeyExchangeBlob::from_bytes(layout(0x01, 0, 0xEE));
        assert_eq!(
            result,
            Err(ProtocolError::TooShort {
                field: "EncryptedSymmetricKey",
                actual: IV_SIZE + TAG_SIZE,
                minimum: IV_SIZE + TAG_SIZE + 1,
            })
        );
    }

    #[test]
    fn key_exchange_rejects_bad_base64() {
        assert_eq!(
            KeyExchangeBlob::decode("not base64!"),
            Err(ProtocolError::InvalidBase64 { field: "EncryptedSymmetricKey" })
        );
    }

    #[test]
    fn symmetric_splits_fields() {
        let blob = SymmetricBlob::from_bytes(layout(0x03, 32, 0xBB)).unwrap();

        assert_eq!(blob.iv(), [0x03; IV_SIZE]);
        assert_eq!(blob.ciphertext().len(), 32);
        assert_eq!(blob.tag(), &[0xBB; TAG_SIZE]);
    }

    #[test]
    fn symmetric_rejects_misaligned_ciphertext() {
        let result = SymmetricBlob::from_bytes(layout(0x03, 17, 0xBB));
        assert_eq!(result, Err(ProtocolError::Misaligned { field: "EncryptedBody", actual: 17 }));
    }

    #[test]
    fn symmetric_rejects_empty_ciphertext() {
        let result = SymmetricBlob::from_bytes(layout(0x03, 0, 0xBB));
        assert!(matches!(result, Err(ProtocolError::TooShort { .. })));
    }

    #[test]
    fn symmetric_rejects_empty_field() {
        assert!(matches!(SymmetricBlob::decode(""), Err(ProtocolError::TooShort { actual: 0, .. })));
    }
}

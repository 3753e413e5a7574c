//! Per-request session key material.
//!
//! A request's `cryptKey`, `authKey` and IV are generated by the client,
//! recovered once by the server, and used for exactly one request/response
//! exchange. Buffers are zeroized on drop.

use std::fmt;

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    error::CryptoError,
    symmetric::{self, IV_SIZE, KEY_SIZE},
};

/// Size of the RSA-wrapped payload: `cryptKey ‖ authKey`
pub const SESSION_PAYLOAD_SIZE: usize = KEY_SIZE * 2;

/// Symmetric keys and IV for a single request.
///
/// Intentionally not `Clone`: the material belongs to exactly one request
/// context and is wiped when that context is dropped.
pub struct SessionKeys {
    crypt_key: [u8; KEY_SIZE],
    auth_key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl SessionKeys {
    /// Assemble session keys from raw parts.
    pub fn new(crypt_key: [u8; KEY_SIZE], auth_key: [u8; KEY_SIZE], iv: [u8; IV_SIZE]) -> Self {
        Self { crypt_key, auth_key, iv }
    }

    /// Generate fresh random keys and IV (client side).
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut keys = Self::zeroed(None);
        rng.fill_bytes(&mut keys.crypt_key);
        rng.fill_bytes(&mut keys.auth_key);
        rng.fill_bytes(&mut keys.iv);
        keys
    }

    /// All-zero keys, optionally paired with a known IV.
    ///
    /// Used to encrypt errors raised before the real keys are recovered. A
    /// client cannot decrypt such a response; that is the intended outcome.
    pub fn zeroed(iv: Option<[u8; IV_SIZE]>) -> Self {
        Self { crypt_key: [0u8; KEY_SIZE], auth_key: [0u8; KEY_SIZE], iv: iv.unwrap_or_default() }
    }

    /// Split an unwrapped RSA payload into `cryptKey` and `authKey`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: payload is not exactly [`SESSION_PAYLOAD_SIZE`]
    pub fn from_payload(payload: &[u8], iv: [u8; IV_SIZE]) -> Result<Self, CryptoError> {
        if payload.len() != SESSION_PAYLOAD_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SESSION_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        let mut keys = Self::zeroed(Some(iv));
        keys.crypt_key.copy_from_slice(&payload[..KEY_SIZE]);
        keys.auth_key.copy_from_slice(&payload[KEY_SIZE..]);
        Ok(keys)
    }

    /// `cryptKey ‖ authKey`, ready to be wrapped under the server's RSA key.
    pub fn payload(&self) -> Zeroizing<Vec<u8>> {
        let mut payload = Zeroizing::new(Vec::with_capacity(SESSION_PAYLOAD_SIZE));
        payload.extend_from_slice(&self.crypt_key);
        payload.extend_from_slice(&self.auth_key);
        payload
    }

    /// AES-256 key.
    pub fn crypt_key(&self) -> &[u8; KEY_SIZE] {
        &self.crypt_key
    }

    /// HMAC-SHA256 key.
    pub fn auth_key(&self) -> &[u8; KEY_SIZE] {
        &self.auth_key
    }

    /// Initialization vector, also the request's replay nonce.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Encrypt and authenticate `plaintext`: `IV ‖ AES-CBC(pt) ‖ tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = symmetric::encrypt(plaintext, &self.crypt_key, &self.iv);
        symmetric::authenticate(&ciphertext, &self.auth_key, &self.iv)
    }

    /// Verify and decrypt a buffer produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: tag mismatch or malformed ciphertext. Both cases
    ///   report the same error.
    pub fn open(&self, authenticated: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if !symmetric::verify(authenticated, &self.auth_key) {
            return Err(CryptoError::DecryptionFailed);
        }
        symmetric::decrypt_authenticated(authenticated, &self.crypt_key)
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.crypt_key.zeroize();
        self.auth_key.zeroize();
        self.iv.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn generate_fills_all_fields() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let keys = SessionKeys::generate(&mut rng);

        assert_ne!(keys.crypt_key(), &[0u8; KEY_SIZE]);
        assert_ne!(keys.auth_key(), &[0u8; KEY_SIZE]);
        assert_ne!(keys.iv(), &[0u8; IV_SIZE]);
        assert_ne!(keys.crypt_key(), keys.auth_key());
    }

    #[test]
    fn payload_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let keys = SessionKeys::generate(&mut rng);

        let restored = SessionKeys::from_payload(&keys.payload(), *keys.iv()).unwrap();

        assert_eq!(restored.crypt_key(), keys.crypt_key());
        assert_eq!(restored.auth_key(), keys.auth_key());
        assert_eq!(restored.iv(), keys.iv());
    }

    #[test]
    fn from_payload_rejects_wrong_length() {
        let result = SessionKeys::from_payload(&[0u8; 63], [0u8; IV_SIZE]);
        assert_eq!(result.err(), Some(CryptoError::InvalidKeyLength { expected: 64, actual: 63 }));
    }

    #[test]
    fn seal_open_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let keys = SessionKeys::generate(&mut rng);

        let sealed = keys.seal(b"{\"result\":\"ok\"}");
        assert_eq!(&sealed[..IV_SIZE], keys.iv());
        assert_eq!(keys.open(&sealed).unwrap(), b"{\"result\":\"ok\"}");
    }

    #[test]
    fn open_with_other_keys_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let keys = SessionKeys::generate(&mut rng);
        let other = SessionKeys::generate(&mut rng);

        let sealed = keys.seal(b"payload");
        assert_eq!(other.open(&sealed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn zeroed_keys_keep_iv() {
        let keys = SessionKeys::zeroed(Some([9u8; IV_SIZE]));
        assert_eq!(keys.crypt_key(), &[0u8; KEY_SIZE]);
        assert_eq!(keys.iv(), &[9u8; IV_SIZE]);

        assert_eq!(SessionKeys::zeroed(None).iv(), &[0u8; IV_SIZE]);
    }

    #[test]
    fn debug_does_not_print_key_bytes() {
        let keys = SessionKeys::new([0xAA; KEY_SIZE], [0xBB; KEY_SIZE], [0xCC; IV_SIZE]);
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("170"));
        assert!(!rendered.contains("AA"));
    }
}

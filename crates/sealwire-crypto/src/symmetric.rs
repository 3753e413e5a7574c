//! AES-256-CBC encryption and HMAC-SHA256 authentication.
//!
//! The authenticated layout produced by [`authenticate`] and consumed by
//! [`verify`] and [`decrypt_authenticated`] is:
//!
//! ```text
//! ┌──────────┬──────────────────────┬───────────┐
//! │ IV (16)  │ ciphertext (n × 16)  │ tag (32)  │
//! └──────────┴──────────────────────┴───────────┘
//!   tag = HMAC-SHA256(authKey, IV ‖ ciphertext)
//! ```

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of `cryptKey` and `authKey` (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the AES block and of the IV (128 bits)
pub const IV_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag
pub const TAG_SIZE: usize = 32;

/// Encrypt `plaintext` with AES-256-CBC and PKCS#7 padding.
///
/// Output length is the plaintext length rounded up to the next multiple of
/// [`IV_SIZE`] (a full padding block is added for aligned input).
pub fn encrypt(plaintext: &[u8], crypt_key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE]) -> Vec<u8> {
    Aes256CbcEnc::new(crypt_key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt AES-256-CBC ciphertext and strip PKCS#7 padding.
///
/// # Errors
///
/// - `DecryptionFailed`: ciphertext is empty, not block-aligned, or the
///   padding is malformed. The cause is not reported.
pub fn decrypt(
    ciphertext: &[u8],
    crypt_key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    Aes256CbcDec::new(crypt_key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Prepend `iv` to `data` and append `HMAC-SHA256(auth_key, iv ‖ data)`.
pub fn authenticate(data: &[u8], auth_key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(IV_SIZE + data.len() + TAG_SIZE);
    out.extend_from_slice(iv);
    out.extend_from_slice(data);

    let tag = compute_tag(auth_key, &out);
    out.extend_from_slice(&tag);
    out
}

/// Check the trailing tag of an authenticated buffer.
///
/// The tag is recomputed over everything except the last [`TAG_SIZE`] bytes
/// and compared in constant time. Buffers too short to hold an IV and a tag
/// never verify.
pub fn verify(authenticated: &[u8], auth_key: &[u8; KEY_SIZE]) -> bool {
    if authenticated.len() < IV_SIZE + TAG_SIZE {
        return false;
    }

    let (signed, sent_tag) = authenticated.split_at(authenticated.len() - TAG_SIZE);
    let calculated = compute_tag(auth_key, signed);

    constant_time_eq(&calculated, sent_tag)
}

/// Decrypt the ciphertext section of an authenticated buffer using its own IV.
///
/// Does NOT verify the tag; call [`verify`] first.
///
/// # Errors
///
/// - `DecryptionFailed`: buffer too short or ciphertext fails to decrypt
pub fn decrypt_authenticated(
    authenticated: &[u8],
    crypt_key: &[u8; KEY_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    if authenticated.len() < IV_SIZE + TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (iv, rest) = authenticated.split_at(IV_SIZE);
    let ciphertext = &rest[..rest.len() - TAG_SIZE];

    let mut iv_bytes = [0u8; IV_SIZE];
    iv_bytes.copy_from_slice(iv);

    decrypt(ciphertext, crypt_key, &iv_bytes)
}

/// Constant-time equality for tags and nonces.
///
/// Runs in time dependent only on the lengths. Slices of different length
/// compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

fn compute_tag(auth_key: &[u8; KEY_SIZE], data: &[u8]) -> [u8; TAG_SIZE] {
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(auth_key) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };
    mac.update(data);

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRYPT_KEY: [u8; KEY_SIZE] = [0x11; KEY_SIZE];
    const AUTH_KEY: [u8; KEY_SIZE] = [0x22; KEY_SIZE];
    const IV: [u8; IV_SIZE] = [0x33; IV_SIZE];

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let plaintext = b"1700000000 GET Hello {\"name\":\"World\"}";

        let ciphertext = encrypt(plaintext, &CRYPT_KEY, &IV);
        let decrypted = decrypt(&ciphertext, &CRYPT_KEY, &IV).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_is_padded_to_block_size() {
        assert_eq!(encrypt(b"", &CRYPT_KEY, &IV).len(), 16);
        assert_eq!(encrypt(&[0u8; 15], &CRYPT_KEY, &IV).len(), 16);
        // Aligned input gains a full padding block
        assert_eq!(encrypt(&[0u8; 16], &CRYPT_KEY, &IV).len(), 32);
    }

    #[test]
    fn decrypt_rejects_unaligned_ciphertext() {
        let mut ciphertext = encrypt(b"hello", &CRYPT_KEY, &IV);
        ciphertext.pop();

        assert_eq!(decrypt(&ciphertext, &CRYPT_KEY, &IV), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn decrypt_rejects_empty_ciphertext() {
        assert_eq!(decrypt(&[], &CRYPT_KEY, &IV), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn wrong_key_does_not_yield_plaintext() {
        let plaintext = b"secret request body";
        let ciphertext = encrypt(plaintext, &CRYPT_KEY, &IV);

        // Wrong key almost always breaks the padding; if it happens to parse,
        // the output must still differ from the plaintext.
        match decrypt(&ciphertext, &[0x99; KEY_SIZE], &IV) {
            Ok(garbled) => assert_ne!(garbled, plaintext),
            Err(err) => assert_eq!(err, CryptoError::DecryptionFailed),
        }
    }

    #[test]
    fn authenticate_layout() {
        let data = [0xAB; 48];
        let authenticated = authenticate(&data, &AUTH_KEY, &IV);

        assert_eq!(authenticated.len(), IV_SIZE + data.len() + TAG_SIZE);
        assert_eq!(&authenticated[..IV_SIZE], &IV);
        assert_eq!(&authenticated[IV_SIZE..IV_SIZE + data.len()], &data);
    }

    #[test]
    fn verify_accepts_authentic_buffer() {
        let authenticated = authenticate(b"ciphertext bytes", &AUTH_KEY, &IV);
        assert!(verify(&authenticated, &AUTH_KEY));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let authenticated = authenticate(b"ciphertext bytes", &AUTH_KEY, &IV);
        assert!(!verify(&authenticated, &[0x23; KEY_SIZE]));
    }

    #[test]
    fn verify_rejects_every_single_bit_flip() {
        let authenticated = authenticate(b"0123456789abcdef", &AUTH_KEY, &IV);

        for byte in 0..authenticated.len() {
            for bit in 0..8 {
                let mut tampered = authenticated.clone();
                tampered[byte] ^= 1 << bit;
                assert!(!verify(&tampered, &AUTH_KEY), "flip at byte {byte} bit {bit} verified");
            }
        }
    }

    #[test]
    fn verify_rejects_short_buffers() {
        assert!(!verify(&[], &AUTH_KEY));
        assert!(!verify(&[0u8; IV_SIZE + TAG_SIZE - 1], &AUTH_KEY));
    }

    #[test]
    fn decrypt_authenticated_uses_embedded_iv() {
        let plaintext = b"{\"result\":\"Hello, World\"}";
        let other_iv = [0x44; IV_SIZE];

        let ciphertext = encrypt(plaintext, &CRYPT_KEY, &other_iv);
        let authenticated = authenticate(&ciphertext, &AUTH_KEY, &other_iv);

        assert!(verify(&authenticated, &AUTH_KEY));
        assert_eq!(decrypt_authenticated(&authenticated, &CRYPT_KEY).unwrap(), plaintext);
    }

    #[test]
    fn decrypt_authenticated_rejects_short_buffer() {
        assert_eq!(
            decrypt_authenticated(&[0u8; 40], &CRYPT_KEY),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn constant_time_eq_semantics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}

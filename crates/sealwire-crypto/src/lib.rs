//! Sealwire Cryptographic Primitives
//!
//! Cryptographic building blocks for the Sealwire encrypted message channel.
//! Functions are pure: callers supply randomness (any `CryptoRng + RngCore`)
//! so tests can run against a seeded generator.
//!
//! # Envelope Construction
//!
//! A client generates fresh session key material per request, wraps the two
//! symmetric keys under the server's RSA public key, and encrypts the request
//! body symmetrically:
//!
//! ```text
//! cryptKey(32) ‖ authKey(32) ─── RSA-OAEP ──► rsaCt
//!                                                  │
//! IV(16) ‖ rsaCt ‖ HMAC(authKey, IV ‖ rsaCt)  ◄────┘   EncryptedSymmetricKey
//!
//! body ── AES-256-CBC(cryptKey, IV) ──► ct
//!                                        │
//! IV(16) ‖ ct ‖ HMAC(authKey, IV ‖ ct) ◄─┘           EncryptedBody
//! ```
//!
//! Responses reuse the request's `cryptKey`, `authKey` and IV.
//!
//! # Security
//!
//! Authenticity:
//! - HMAC-SHA256 over `IV ‖ ciphertext`, encrypt-then-MAC
//! - Tags are compared in constant time
//! - Padding failures are reported without detail
//!
//! Key hygiene:
//! - [`SessionKeys`] zeroizes its buffers on drop
//! - Unwrapped RSA payloads are returned in [`zeroize::Zeroizing`] buffers
//!
//! Limitations:
//! - The key-exchange tag can only be checked after RSA decryption recovers
//!   `authKey`, so it detects forgery but does not save the RSA work

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod asymmetric;
mod error;
pub mod keys;
pub mod symmetric;

pub use asymmetric::{
    ExportedPublicKey, KeyLength, PublicKeyFormat, ServerKeyPair, encrypt_with_public_key,
    fingerprint, parse_public_key,
};
pub use error::CryptoError;
pub use keys::{SESSION_PAYLOAD_SIZE, SessionKeys};
pub use rsa::RsaPublicKey;
pub use symmetric::{IV_SIZE, KEY_SIZE, TAG_SIZE, constant_time_eq};

//! Sealwire protocol core.
//!
//! Sans-IO engine for the encrypted message channel. The host reads JSON
//! envelopes, hands them to [`MessageEngine::decode_request`], dispatches the
//! decrypted operation, and seals the result with
//! [`MessageEngine::encode_response`]. Time and randomness come from an
//! [`Environment`], so the same engine runs against the system clock in
//! production and a manual clock in tests.
//!
//! # Components
//!
//! - [`MessageEngine`]: validation pipeline and response sealing
//! - [`NonceCache`]: IV replay protection, shared across requests
//! - [`EncryptedClient`]: builds requests and opens responses

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod client;
pub mod engine;
pub mod env;
pub mod error;
pub mod nonce;

pub use client::{EncryptedClient, ResponseBody, SealedRequest};
pub use engine::{
    DEFAULT_MAX_REQUEST_AGE, DecryptedRequest, EngineConfig, MessageEngine, Rejection,
    RequestStage,
};
pub use env::{EnvRng, Environment};
pub use error::{ClientError, DecodeError, EngineError, InvalidPart};
pub use nonce::{NonceCache, NonceStatus};

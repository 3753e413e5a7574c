//! Fuzz target for the full decode pipeline
//!
//! Builds a valid envelope, applies an arbitrary mutation, and runs it
//! through the engine twice.
//!
//! # Invariants
//!
//! - The engine NEVER panics
//! - A mutated envelope is never accepted
//! - A second submission of the same envelope is never accepted
//! - Rejections before key recovery carry zero keys

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealwire_core::EngineConfig;
use sealwire_crypto::KEY_SIZE;
use sealwire_harness::{SimEnv, test_client, test_engine};
use sealwire_proto::{EncryptedMessage, KeyExchangeBlob, SymmetricBlob};

#[derive(Debug, Arbitrary)]
enum Mutation {
    None,
    FlipKeyBit { bit: usize },
    FlipBodyBit { bit: usize },
    TruncateBody { keep: usize },
    ReplaceKey { field: String },
    ReplaceBody { field: String },
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    age_secs: u16,
    body: String,
    mutation: Mutation,
}

fn flip(bytes: &[u8], bit: usize) -> Vec<u8> {
    let mut bytes = bytes.to_vec();
    let bit = bit % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
    bytes
}

// Distinct strings may decode to the same bytes (surrounding whitespace)
fn decoded_key(field: &str) -> Option<Vec<u8>> {
    KeyExchangeBlob::decode(field).ok().map(|b| b.as_bytes().to_vec())
}

fn decoded_body(field: &str) -> Option<Vec<u8>> {
    SymmetricBlob::decode(field).ok().map(|b| b.as_bytes().to_vec())
}

fuzz_target!(|input: Input| {
    let env = SimEnv::with_seed(input.seed);
    let engine = test_engine(&env, EngineConfig::default());
    let client = test_client(&env);

    let now = sealwire_core::Environment::wall_clock_secs(&env);
    let Ok(sealed) = client.seal_request_at(now - i64::from(input.age_secs), "POST", "Echo", &input.body)
    else {
        return;
    };
    let original = sealed.message;

    let (message, mutated) = match input.mutation {
        Mutation::None => (original.clone(), false),
        Mutation::FlipKeyBit { bit } => {
            let Ok(blob) = KeyExchangeBlob::decode(&original.encrypted_symmetric_key) else { return };
            let Ok(blob) = KeyExchangeBlob::from_bytes(flip(blob.as_bytes(), bit)) else { return };
            (EncryptedMessage { encrypted_symmetric_key: blob.to_base64(), ..original.clone() }, true)
        },
        Mutation::FlipBodyBit { bit } => {
            let Ok(blob) = SymmetricBlob::decode(&original.encrypted_body) else { return };
            let Ok(blob) = SymmetricBlob::from_bytes(flip(blob.as_bytes(), bit)) else { return };
            (EncryptedMessage { encrypted_body: blob.to_base64(), ..original.clone() }, true)
        },
        Mutation::TruncateBody { keep } => {
            let keep = keep % original.encrypted_body.len().max(1);
            let body = original.encrypted_body[..keep].to_string();
            (EncryptedMessage { encrypted_body: body, ..original.clone() }, true)
        },
        Mutation::ReplaceKey { field } => {
            let changed = decoded_key(&field) != decoded_key(&original.encrypted_symmetric_key);
            (EncryptedMessage { encrypted_symmetric_key: field, ..original.clone() }, changed)
        },
        Mutation::ReplaceBody { field } => {
            let changed = decoded_body(&field) != decoded_body(&original.encrypted_body);
            (EncryptedMessage { encrypted_body: field, ..original.clone() }, changed)
        },
    };

    for attempt in 0..2 {
        match engine.decode_request(&message) {
            Ok(request) => {
                assert!(!mutated, "mutated envelope accepted");
                assert_eq!(attempt, 0, "replayed envelope accepted");
                assert_eq!(request.line.body, input.body);
            },
            Err(rejection) => {
                if !rejection.stage.has_session_keys() {
                    assert_eq!(rejection.keys.crypt_key(), &[0u8; KEY_SIZE]);
                }
            },
        }
    }
});

//! Fuzz target for envelope and blob decoding
//!
//! Feeds arbitrary bytes through every decoder that touches attacker input
//! before any key is known:
//! - `EncryptedMessage::from_json` on the raw HTTP body
//! - `KeyExchangeBlob::decode` / `SymmetricBlob::decode` on the fields
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealwire_proto::{EncryptedMessage, KeyExchangeBlob, SymmetricBlob};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = EncryptedMessage::from_json(data) {
        if let Ok(blob) = KeyExchangeBlob::decode(&message.encrypted_symmetric_key) {
            let _ = (blob.iv(), blob.rsa_ciphertext(), blob.tag());
        }
        if let Ok(blob) = SymmetricBlob::decode(&message.encrypted_body) {
            assert_eq!(blob.ciphertext().len() % 16, 0);
            let _ = (blob.iv(), blob.tag());
        }
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = KeyExchangeBlob::decode(text);
        let _ = SymmetricBlob::decode(text);
    }
});

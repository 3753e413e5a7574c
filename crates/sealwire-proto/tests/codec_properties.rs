//! Property-based tests for the envelope codec.
//!
//! Decoders face attacker-controlled input, so the main property is totality:
//! any string either decodes or returns an error, and a request line always
//! hands back its JSON body byte for byte.

use proptest::prelude::*;
use sealwire_proto::{KeyExchangeBlob, ProtocolError, RequestLine, SymmetricBlob};

/// Strategy for verb/operation tokens (no whitespace).
fn token() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,15}"
}

/// Strategy for JSON-ish bodies, including embedded and trailing spaces.
fn body() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(r#"{"name": "World"}"#.to_string()),
        "[ -~]{0,64}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The body after the third space is returned verbatim.
    #[test]
    fn prop_line_body_is_verbatim(
        timestamp in any::<i64>(),
        verb in token(),
        operation in token(),
        body in body(),
    ) {
        let line = RequestLine::new(timestamp, verb.clone(), operation.clone(), body.clone())?;
        let parsed = RequestLine::parse(&line.encode())?;

        prop_assert_eq!(parsed.timestamp, timestamp);
        prop_assert_eq!(parsed.verb, verb);
        prop_assert_eq!(parsed.operation, operation);
        prop_assert_eq!(parsed.body, body);
    }

    /// Arbitrary text never panics the line parser.
    #[test]
    fn prop_line_parse_is_total(line in "\\PC{0,128}") {
        let _ = RequestLine::parse(&line);
    }

    /// Arbitrary field values never panic the blob decoders, and every
    /// accepted blob satisfies its layout invariants.
    #[test]
    fn prop_blob_decode_is_total(field in "[A-Za-z0-9+/=]{0,200}") {
        if let Ok(blob) = KeyExchangeBlob::decode(&field) {
            prop_assert!(!blob.rsa_ciphertext().is_empty());
            prop_assert_eq!(blob.tag().len(), 32);
        }

        if let Ok(blob) = SymmetricBlob::decode(&field) {
            prop_assert!(!blob.ciphertext().is_empty());
            prop_assert_eq!(blob.ciphertext().len() % 16, 0);
        }
    }

    /// Raw byte buffers are accepted exactly when long enough and aligned.
    #[test]
    fn prop_symmetric_blob_length_rule(len in 0usize..160) {
        let result = SymmetricBlob::from_bytes(vec![0u8; len]);
        let middle = len.saturating_sub(48);
        let valid = len >= 64 && middle % 16 == 0;

        prop_assert_eq!(result.is_ok(), valid);
        if let Err(err) = result {
            let is_layout_error = matches!(
                err,
                ProtocolError::TooShort { .. } | ProtocolError::Misaligned { .. }
            );
            prop_assert!(is_layout_error);
        }
    }
}

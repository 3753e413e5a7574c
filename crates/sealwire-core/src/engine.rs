//! Request decoding and response encoding.
//!
//! [`MessageEngine`] turns an [`EncryptedMessage`] into a plaintext request
//! line plus the [`SessionKeys`] needed to answer it, and seals results and
//! errors back into an [`EncryptedMessageResponse`]. It does no I/O: the
//! host reads envelopes off the wire, calls the engine, and dispatches the
//! decrypted operation.
//!
//! # Validation order
//!
//! ```text
//! Received
//!   → decode EncryptedSymmetricKey, extract IV
//!   → IV must not be a live nonce (registered here)          IvChecked
//!   → RSA-OAEP unwrap cryptKey ‖ authKey                     KeysRecovered
//!   → HMAC over the key-exchange blob                        KeyExchangeAuthenticated
//!   → HMAC over EncryptedBody                                BodyAuthenticated
//!   → AES-CBC decrypt, parse request line                    BodyDecrypted
//!   → timestamp within the freshness window, evict nonces    FreshnessChecked
//!   → hand to the dispatcher                                 Dispatched
//! ```
//!
//! The nonce is registered before the expensive RSA step, so a replayed
//! envelope is refused without touching the private key. A rejected request
//! still burns its nonce.
//!
//! # Security
//!
//! - Errors raised before keys are recovered are sealed under all-zero keys.
//!   The client cannot read them; the HTTP status is the only signal.
//! - Every rejection message is fixed text. Causes are logged at debug level
//!   and never returned to the caller.

use std::{sync::Arc, time::Duration};

use sealwire_crypto::{
    CryptoError, ExportedPublicKey, PublicKeyFormat, ServerKeyPair, SessionKeys, symmetric,
};
use sealwire_proto::{
    EncryptedMessage, EncryptedMessageResponse, ErrorResponse, KeyExchangeBlob, RequestLine,
    SymmetricBlob,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    env::{EnvRng, Environment},
    error::{DecodeError, EngineError, InvalidPart},
    nonce::{NonceCache, NonceStatus},
};

/// Default freshness window for request timestamps.
pub const DEFAULT_MAX_REQUEST_AGE: Duration = Duration::from_secs(20 * 60);

/// Tunables for [`MessageEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Oldest request timestamp accepted, relative to the server clock.
    /// Also the lifetime of a nonce cache entry.
    pub max_request_age: Duration,

    /// How far ahead of the server clock a request timestamp may be.
    /// `None` accepts any future timestamp.
    pub max_clock_skew: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_request_age: DEFAULT_MAX_REQUEST_AGE, max_clock_skew: None }
    }
}

impl EngineConfig {
    /// How long a nonce must be remembered: as long as its request could
    /// still pass the freshness check.
    pub fn nonce_ttl(&self) -> Duration {
        self.max_request_age.saturating_add(self.max_clock_skew.unwrap_or_default())
    }
}

/// Progress of a request through validation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestStage {
    /// Envelope parsed from JSON
    Received,
    /// IV extracted and registered as a nonce
    IvChecked,
    /// Session keys unwrapped with the private key
    KeysRecovered,
    /// Key-exchange tag verified
    KeyExchangeAuthenticated,
    /// Body tag verified
    BodyAuthenticated,
    /// Body decrypted and request line parsed
    BodyDecrypted,
    /// Timestamp inside the freshness window
    FreshnessChecked,
    /// Handed to the dispatcher
    Dispatched,
}

impl RequestStage {
    /// Whether keys recovered by this stage are the client's real keys.
    pub fn has_session_keys(self) -> bool {
        self >= Self::KeysRecovered
    }
}

/// A request that passed every check.
#[derive(Debug)]
pub struct DecryptedRequest {
    /// Parsed plaintext request line
    pub line: RequestLine,
    /// Keys the response must be sealed with
    pub keys: SessionKeys,
}

/// A request that failed validation.
///
/// Carries whatever keys were available when it failed: the client's keys
/// if they had been recovered, otherwise all-zero keys.
#[derive(Debug)]
pub struct Rejection {
    /// Last stage the request completed
    pub stage: RequestStage,
    /// Why it was rejected
    pub error: DecodeError,
    /// Keys to seal the error response with
    pub keys: SessionKeys,
}

impl Rejection {
    /// HTTP status for this rejection.
    pub fn status_code(&self) -> u16 {
        self.error.status_code()
    }
}

/// Decodes encrypted requests and seals responses.
///
/// Holds the server keypair and the shared nonce cache. Safe to share across
/// request handlers behind an `Arc`.
pub struct MessageEngine<E: Environment> {
    env: E,
    key_pair: Arc<ServerKeyPair>,
    nonces: Arc<NonceCache>,
    config: EngineConfig,
}

impl<E: Environment> MessageEngine<E> {
    /// Create an engine around an existing keypair and nonce cache.
    pub fn new(
        env: E,
        key_pair: Arc<ServerKeyPair>,
        nonces: Arc<NonceCache>,
        config: EngineConfig,
    ) -> Self {
        Self { env, key_pair, nonces, config }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared nonce cache.
    pub fn nonces(&self) -> &NonceCache {
        &self.nonces
    }

    /// Export the server's public key for publication.
    pub fn export_public_key(
        &self,
        format: PublicKeyFormat,
    ) -> Result<ExportedPublicKey, CryptoError> {
        self.key_pair.export_public_key(format)
    }

    /// Validate and decrypt an inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] describing the first failed check:
    ///
    /// - `InvalidMessage(SymmetricKey)`: key blob malformed, unwrap failed,
    ///   or its tag does not verify
    /// - `NonceSeen`: the IV is still live in the nonce cache
    /// - `InvalidMessage(Body)`: body malformed, tag mismatch, bad padding,
    ///   or the plaintext is not a valid request line
    /// - `RequestTooOld` / `RequestTooNew`: timestamp outside the window
    pub fn decode_request(&self, message: &EncryptedMessage) -> Result<DecryptedRequest, Rejection> {
        let now = self.env.wall_clock();

        let key_blob = match KeyExchangeBlob::decode(&message.encrypted_symmetric_key) {
            Ok(blob) => blob,
            Err(e) => {
                debug!(error = %e, "undecodable key-exchange blob");
                return Err(reject(
                    RequestStage::Received,
                    DecodeError::InvalidMessage(InvalidPart::SymmetricKey),
                    SessionKeys::zeroed(None),
                ));
            },
        };
        let iv = key_blob.iv();

        if self.nonces.check_and_register(iv, now, self.config.nonce_ttl()) == NonceStatus::Replay {
            return Err(reject(
                RequestStage::Received,
                DecodeError::NonceSeen,
                SessionKeys::zeroed(Some(iv)),
            ));
        }

        let keys = match self
            .key_pair
            .decrypt(&mut EnvRng(&self.env), key_blob.rsa_ciphertext())
            .and_then(|payload| SessionKeys::from_payload(&payload, iv))
        {
            Ok(keys) => keys,
            Err(e) => {
                debug!(error = %e, "session key unwrap failed");
                return Err(reject(
                    RequestStage::IvChecked,
                    DecodeError::InvalidMessage(InvalidPart::SymmetricKey),
                    SessionKeys::zeroed(Some(iv)),
                ));
            },
        };

        if !symmetric::verify(key_blob.as_bytes(), keys.auth_key()) {
            return Err(reject(
                RequestStage::KeysRecovered,
                DecodeError::InvalidMessage(InvalidPart::SymmetricKey),
                keys,
            ));
        }

        let body = match SymmetricBlob::decode(&message.encrypted_body) {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "undecodable body blob");
                return Err(reject(
                    RequestStage::KeyExchangeAuthenticated,
                    DecodeError::InvalidMessage(InvalidPart::Body),
                    keys,
                ));
            },
        };

        if !symmetric::verify(body.as_bytes(), keys.auth_key()) {
            return Err(reject(
                RequestStage::KeyExchangeAuthenticated,
                DecodeError::InvalidMessage(InvalidPart::Body),
                keys,
            ));
        }

        let line = match decrypt_line(&body, &keys) {
            Ok(line) => line,
            Err(reason) => {
                debug!(%reason, "undecryptable request body");
                return Err(reject(
                    RequestStage::BodyAuthenticated,
                    DecodeError::InvalidMessage(InvalidPart::Body),
                    keys,
                ));
            },
        };

        if let Err(error) = self.check_freshness(line.timestamp, now) {
            return Err(reject(RequestStage::BodyDecrypted, error, keys));
        }

        let evicted = self.nonces.evict(now);
        if evicted > 0 {
            debug!(evicted, "evicted expired nonces");
        }

        debug!(
            stage = ?RequestStage::FreshnessChecked,
            verb = %line.verb,
            operation = %line.operation,
            "request accepted"
        );
        Ok(DecryptedRequest { line, keys })
    }

    /// Serialize `result` to JSON and seal it under the request's keys.
    ///
    /// # Errors
    ///
    /// - `Serialization`: `result` has no JSON representation
    pub fn encode_response<T: Serialize + ?Sized>(
        &self,
        keys: &SessionKeys,
        result: &T,
    ) -> Result<EncryptedMessageResponse, EngineError> {
        let json = serde_json::to_vec(result)?;
        Ok(seal(keys, &json))
    }

    /// Seal an error body under `keys`.
    pub fn encode_error(&self, keys: &SessionKeys, error: &ErrorResponse) -> EncryptedMessageResponse {
        let Ok(json) = serde_json::to_vec(error) else {
            unreachable!("ErrorResponse is plain strings and always serializes")
        };
        seal(keys, &json)
    }

    /// Seal the error response for a rejected request.
    pub fn encode_rejection(&self, rejection: &Rejection) -> EncryptedMessageResponse {
        self.encode_error(&rejection.keys, &rejection.error.to_response())
    }

    fn check_freshness(&self, timestamp: i64, now: Duration) -> Result<(), DecodeError> {
        let now_secs = whole_secs(now);

        let oldest_allowed = now_secs.saturating_sub(whole_secs(self.config.max_request_age));
        if timestamp < oldest_allowed {
            return Err(DecodeError::RequestTooOld { timestamp, oldest_allowed });
        }

        if let Some(skew) = self.config.max_clock_skew {
            let newest_allowed = now_secs.saturating_add(whole_secs(skew));
            if timestamp > newest_allowed {
                return Err(DecodeError::RequestTooNew { timestamp, newest_allowed });
            }
        }

        Ok(())
    }
}

/// Whole seconds as `i64`, clamped for durations beyond the timestamp range.
fn whole_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

fn reject(stage: RequestStage, error: DecodeError, keys: SessionKeys) -> Rejection {
    debug!(?stage, code = error.error_code(), "request rejected");
    Rejection { stage, error, keys }
}

fn decrypt_line(body: &SymmetricBlob, keys: &SessionKeys) -> Result<RequestLine, String> {
    let plaintext = symmetric::decrypt_authenticated(body.as_bytes(), keys.crypt_key())
        .map_err(|e| e.to_string())?;
    let text = String::from_utf8(plaintext).map_err(|_| "plaintext is not UTF-8".to_string())?;
    RequestLine::parse(&text).map_err(|e| e.to_string())
}

fn seal(keys: &SessionKeys, json: &[u8]) -> EncryptedMessageResponse {
    let Ok(blob) = SymmetricBlob::from_bytes(keys.seal(json)) else {
        unreachable!("sealed output is IV ‖ whole blocks ‖ tag")
    };
    EncryptedMessageResponse { encrypted_body: blob.to_base64() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_twenty_minute_window() {
        let config = EngineConfig::default();
        assert_eq!(config.max_request_age, Duration::from_secs(1200));
        assert_eq!(config.max_clock_skew, None);
        assert_eq!(config.nonce_ttl(), Duration::from_secs(1200));
    }

    #[test]
    fn nonce_ttl_covers_clock_skew() {
        let config = EngineConfig {
            max_request_age: Duration::from_secs(60),
            max_clock_skew: Some(Duration::from_secs(30)),
        };
        assert_eq!(config.nonce_ttl(), Duration::from_secs(90));
    }

    #[test]
    fn whole_secs_clamps_instead_of_wrapping() {
        assert_eq!(whole_secs(Duration::from_secs(1200)), 1200);
        assert_eq!(whole_secs(Duration::from_secs(u64::MAX)), i64::MAX);
        assert_eq!(whole_secs(Duration::from_secs(1 << 63)), i64::MAX);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(RequestStage::Received < RequestStage::IvChecked);
        assert!(RequestStage::BodyDecrypted < RequestStage::FreshnessChecked);
        assert!(!RequestStage::IvChecked.has_session_keys());
        assert!(RequestStage::KeysRecovered.has_session_keys());
    }
}

//! Client side of the channel.
//!
//! [`EncryptedClient`] wraps fresh session keys under the server's published
//! public key, seals a request line, and opens the matching response. The
//! same code drives the integration tests and the server's own self-checks.

use sealwire_crypto::{
    RsaPublicKey, SessionKeys, encrypt_with_public_key, fingerprint, parse_public_key, symmetric,
};
use sealwire_proto::{
    EncryptedMessage, EncryptedMessageResponse, ErrorResponse, KeyExchangeBlob, RequestLine,
    SymmetricBlob,
};

use crate::{
    env::{EnvRng, Environment},
    error::ClientError,
};

/// An envelope ready to send, plus the keys to open its response with.
#[derive(Debug)]
pub struct SealedRequest {
    /// Envelope to POST
    pub message: EncryptedMessage,
    /// Session keys for this request only
    pub keys: SessionKeys,
}

impl SealedRequest {
    /// Open the response to this request.
    ///
    /// # Errors
    ///
    /// - `Protocol`: `EncryptedBody` is not a valid blob
    /// - `Crypto`: tag mismatch or bad padding (including zero-key errors)
    /// - `InvalidUtf8`: plaintext is not text
    pub fn open_response(
        &self,
        response: &EncryptedMessageResponse,
    ) -> Result<ResponseBody, ClientError> {
        let blob = SymmetricBlob::decode(&response.encrypted_body)?;
        let plaintext = self.keys.open(blob.as_bytes())?;
        let text = String::from_utf8(plaintext).map_err(|_| ClientError::InvalidUtf8)?;

        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(error) => Ok(ResponseBody::Error(error)),
            Err(_) => Ok(ResponseBody::Success(text)),
        }
    }
}

/// Decrypted response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// JSON result of the operation
    Success(String),
    /// Error returned by the server
    Error(ErrorResponse),
}

/// Builds encrypted requests against one server key.
#[derive(Clone)]
pub struct EncryptedClient<E: Environment> {
    env: E,
    public_key: RsaPublicKey,
}

impl<E: Environment> EncryptedClient<E> {
    /// Client for an already-parsed public key.
    pub fn new(env: E, public_key: RsaPublicKey) -> Self {
        Self { env, public_key }
    }

    /// Client for a key fetched from the public key endpoint.
    ///
    /// When `pinned` is given, the key text must hash to that fingerprint.
    ///
    /// # Errors
    ///
    /// - `FingerprintMismatch`: key does not match `pinned`
    /// - `Crypto`: key text cannot be parsed
    pub fn from_published(env: E, text: &str, pinned: Option<&str>) -> Result<Self, ClientError> {
        if let Some(expected) = pinned {
            let actual = fingerprint(text.as_bytes());
            if actual != expected {
                return Err(ClientError::FingerprintMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok(Self::new(env, parse_public_key(text)?))
    }

    /// Seal a request stamped with the environment's current time.
    pub fn seal_request(
        &self,
        verb: &str,
        operation: &str,
        body: &str,
    ) -> Result<SealedRequest, ClientError> {
        self.seal_request_at(self.env.wall_clock_secs(), verb, operation, body)
    }

    /// Seal a request with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// - `Protocol`: verb or operation is not a single token
    /// - `Crypto`: the key is too small to wrap the session payload
    pub fn seal_request_at(
        &self,
        timestamp: i64,
        verb: &str,
        operation: &str,
        body: &str,
    ) -> Result<SealedRequest, ClientError> {
        let line = RequestLine::new(timestamp, verb, operation, body)?;

        let mut rng = EnvRng(&self.env);
        let keys = SessionKeys::generate(&mut rng);

        let wrapped = encrypt_with_public_key(&mut rng, &self.public_key, &keys.payload())?;
        let key_blob = symmetric::authenticate(&wrapped, keys.auth_key(), keys.iv());
        let body_blob = keys.seal(line.encode().as_bytes());

        let message = EncryptedMessage {
            encrypted_symmetric_key: KeyExchangeBlob::from_bytes(key_blob)?.to_base64(),
            encrypted_body: SymmetricBlob::from_bytes(body_blob)?.to_base64(),
        };
        Ok(SealedRequest { message, keys })
    }
}

//! RSA key handling and OAEP key wrapping.
//!
//! The server holds one [`ServerKeyPair`] for its whole lifetime. Clients
//! fetch the exported public half, wrap `cryptKey ‖ authKey` under it with
//! RSA-OAEP, and the server unwraps with the private half.
//!
//! OAEP uses SHA-1 as its digest. That is the padding deployed clients emit,
//! so changing it would break the wire format.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{CryptoRng, RngCore};
use rsa::{
    BigUint, Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{error::CryptoError, keys::SESSION_PAYLOAD_SIZE};

/// OAEP-SHA1 overhead: two digests plus two framing bytes.
const OAEP_OVERHEAD: usize = 2 * 20 + 2;

/// Smallest modulus (in bytes) that can wrap a session payload.
pub const MIN_MODULUS_SIZE: usize = SESSION_PAYLOAD_SIZE + OAEP_OVERHEAD;

/// Supported RSA modulus sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyLength {
    /// 1024-bit modulus (tests and legacy deployments)
    Bit1024,
    /// 2048-bit modulus
    #[default]
    Bit2048,
    /// 4096-bit modulus
    Bit4096,
}

impl KeyLength {
    /// Modulus size in bits.
    pub fn bits(self) -> usize {
        match self {
            Self::Bit1024 => 1024,
            Self::Bit2048 => 2048,
            Self::Bit4096 => 4096,
        }
    }
}

impl TryFrom<usize> for KeyLength {
    type Error = CryptoError;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        match bits {
            1024 => Ok(Self::Bit1024),
            2048 => Ok(Self::Bit2048),
            4096 => Ok(Self::Bit4096),
            other => Err(CryptoError::key_material(format!(
                "unsupported RSA key length {other} (expected 1024, 2048 or 4096)"
            ))),
        }
    }
}

/// Encoding used when publishing the public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicKeyFormat {
    /// SubjectPublicKeyInfo PEM (`-----BEGIN PUBLIC KEY-----`)
    #[default]
    Pem,
    /// `<RSAKeyValue><Modulus>..</Modulus><Exponent>..</Exponent></RSAKeyValue>`
    Xml,
}

/// Exported public key plus its integrity fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPublicKey {
    /// The encoded public key
    pub encoded: String,
    /// `base64(SHA-256(encoded))`
    pub fingerprint: String,
}

/// The server's RSA keypair.
///
/// Immutable after construction. Only the public half ever leaves the
/// process.
pub struct ServerKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl ServerKeyPair {
    /// Generate a fresh keypair.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: key generation failed
    pub fn generate<R: CryptoRng + RngCore>(
        rng: &mut R,
        length: KeyLength,
    ) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(rng, length.bits())
            .map_err(|e| CryptoError::key_material(format!("RSA key generation failed: {e}")))?;
        Self::from_private_key(private)
    }

    /// Wrap an existing private key, checking it can carry a session payload.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: key fails validation or its modulus is smaller
    ///   than [`MIN_MODULUS_SIZE`]
    pub fn from_private_key(private: RsaPrivateKey) -> Result<Self, CryptoError> {
        private
            .validate()
            .map_err(|e| CryptoError::key_material(format!("RSA key failed validation: {e}")))?;

        if private.size() < MIN_MODULUS_SIZE {
            return Err(CryptoError::key_material(format!(
                "RSA modulus of {} bytes cannot wrap a {SESSION_PAYLOAD_SIZE}-byte payload",
                private.size()
            )));
        }

        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Load a private key from PKCS#8 PEM, PKCS#1 PEM, or `RSAKeyValue` XML.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: text is in none of the supported encodings
    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();

        let private = if text.starts_with("<RSAKeyValue>") {
            private_key_from_xml(text)?
        } else if text.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(text)
                .map_err(|e| CryptoError::key_material(format!("invalid PKCS#1 PEM: {e}")))?
        } else {
            RsaPrivateKey::from_pkcs8_pem(text)
                .map_err(|e| CryptoError::key_material(format!("invalid PKCS#8 PEM: {e}")))?
        };

        Self::from_private_key(private)
    }

    /// Public half of the keypair.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// Unwrap an RSA-OAEP ciphertext.
    ///
    /// The private-key operation is blinded with a factor drawn from `rng`, so
    /// its timing does not depend on the attacker-supplied ciphertext.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: ciphertext is malformed, has the wrong size, or
    ///   was produced under a different key
    pub fn decrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.private
            .decrypt_blinded(rng, Oaep::new::<Sha1>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::key_material(format!("RSA-OAEP decryption failed: {e}")))
    }

    /// Export the public half in `format`, with its fingerprint.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: PEM encoding failed
    pub fn export_public_key(
        &self,
        format: PublicKeyFormat,
    ) -> Result<ExportedPublicKey, CryptoError> {
        let encoded = match format {
            PublicKeyFormat::Pem => self
                .public
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| CryptoError::key_material(format!("PEM encoding failed: {e}")))?,
            PublicKeyFormat::Xml => public_key_to_xml(&self.public),
        };

        let fingerprint = fingerprint(encoded.as_bytes());
        Ok(ExportedPublicKey { encoded, fingerprint })
    }
}

/// `base64(SHA-256(bytes))`, used to pin an exported public key.
pub fn fingerprint(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Wrap `plaintext` under `public` with RSA-OAEP (client side).
///
/// # Errors
///
/// - `EncryptionFailed`: plaintext too long for the modulus
pub fn encrypt_with_public_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    public: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    public
        .encrypt(rng, Oaep::new::<Sha1>(), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed { reason: e.to_string() })
}

/// Parse a published public key (SPKI PEM, PKCS#1 PEM, or `RSAKeyValue` XML).
///
/// # Errors
///
/// - `InvalidKeyMaterial`: text is in none of the supported encodings
pub fn parse_public_key(text: &str) -> Result<RsaPublicKey, CryptoError> {
    let text = text.trim();

    if text.starts_with("<RSAKeyValue>") {
        let n = xml_component(text, "Modulus")?;
        let e = xml_component(text, "Exponent")?;
        return RsaPublicKey::new(n, e)
            .map_err(|e| CryptoError::key_material(format!("invalid RSA public key: {e}")));
    }

    if text.contains("BEGIN RSA PUBLIC KEY") {
        return RsaPublicKey::from_pkcs1_pem(text)
            .map_err(|e| CryptoError::key_material(format!("invalid PKCS#1 PEM: {e}")));
    }

    RsaPublicKey::from_public_key_pem(text)
        .map_err(|e| CryptoError::key_material(format!("invalid SPKI PEM: {e}")))
}

fn public_key_to_xml(public: &RsaPublicKey) -> String {
    format!(
        "<RSAKeyValue><Modulus>{}</Modulus><Exponent>{}</Exponent></RSAKeyValue>",
        STANDARD.encode(public.n().to_bytes_be()),
        STANDARD.encode(public.e().to_bytes_be()),
    )
}

fn private_key_from_xml(xml: &str) -> Result<RsaPrivateKey, CryptoError> {
    let n = xml_component(xml, "Modulus")?;
    let e = xml_component(xml, "Exponent")?;
    let d = xml_component(xml, "D")?;
    let p = xml_component(xml, "P")?;
    let q = xml_component(xml, "Q")?;

    RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| CryptoError::key_material(format!("invalid RSA private key: {e}")))
}

/// Extract and base64-decode the text of `<name>...</name>`.
fn xml_component(xml: &str, name: &str) -> Result<BigUint, CryptoError> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");

    let start = xml
        .find(&open)
        .map(|i| i + open.len())
        .ok_or_else(|| CryptoError::key_material(format!("RSAKeyValue is missing <{name}>")))?;
    let len = xml[start..]
        .find(&close)
        .ok_or_else(|| CryptoError::key_material(format!("RSAKeyValue has unclosed <{name}>")))?;

    let bytes = STANDARD
        .decode(xml[start..start + len].trim())
        .map_err(|e| CryptoError::key_material(format!("RSAKeyValue <{name}> is not base64: {e}")))?;

    Ok(BigUint::from_bytes_be(&bytes))
}

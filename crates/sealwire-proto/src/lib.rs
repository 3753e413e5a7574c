//! Sealwire wire formats.
//!
//! Everything that crosses the wire, and nothing that touches keys:
//!
//! - [`EncryptedMessage`] / [`EncryptedMessageResponse`]: JSON envelopes
//! - [`KeyExchangeBlob`]: `IV ‖ RSA ciphertext ‖ tag`, the decoded
//!   `EncryptedSymmetricKey` field
//! - [`SymmetricBlob`]: `IV ‖ AES ciphertext ‖ tag`, the decoded
//!   `EncryptedBody` field
//! - [`RequestLine`]: the decrypted plaintext,
//!   `"<unix seconds> <verb> <operation> <json>"`
//! - [`ErrorResponse`]: structured error carried inside an encrypted body
//!
//! Decoders check structure only (lengths, base64, token count). Whether a
//! blob is authentic is decided by the engine once it holds the keys.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blob;
mod envelope;
mod errors;
mod line;
mod response;

pub use blob::{KeyExchangeBlob, SymmetricBlob};
pub use envelope::{EncryptedMessage, EncryptedMessageResponse};
pub use errors::{ProtocolError, Result};
pub use line::RequestLine;
pub use response::{ErrorResponse, ResponseStatus};

//! Wiring the channel into a host.
//!
//! [`EncryptedMessagesFeature::register`] is the one-time setup step: it
//! loads or generates the server keypair, exports the public key once,
//! creates the nonce cache, and returns the router. Any key problem is fatal
//! here rather than surfacing on the first request.

use std::{fs, sync::Arc};

use axum::{Router, http::HeaderValue};
use sealwire_core::{EnvRng, Environment, MessageEngine, NonceCache};
use sealwire_crypto::ServerKeyPair;
use tracing::{info, warn};

use crate::{
    config::ServerRuntimeConfig,
    dispatch::Dispatcher,
    error::ServerError,
    routes::{self, ChannelState},
};

/// Registers the encrypted message routes.
pub struct EncryptedMessagesFeature {
    config: ServerRuntimeConfig,
    key_pair: Option<Arc<ServerKeyPair>>,
}

impl EncryptedMessagesFeature {
    /// Feature driven by `config`. The key comes from
    /// `config.private_key_path`, or is generated.
    pub fn new(config: ServerRuntimeConfig) -> Self {
        Self { config, key_pair: None }
    }

    /// Use an already-loaded keypair instead of reading or generating one.
    #[must_use]
    pub fn with_key_pair(mut self, key_pair: Arc<ServerKeyPair>) -> Self {
        self.key_pair = Some(key_pair);
        self
    }

    /// Set up the channel and return its router.
    ///
    /// # Errors
    ///
    /// - `Config`: the key file cannot be read
    /// - `Key`: the key cannot be parsed, generated or exported
    pub fn register<E: Environment>(
        self,
        env: E,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Router, ServerError> {
        let key_pair = match self.key_pair {
            Some(key_pair) => key_pair,
            None => Arc::new(load_or_generate(&self.config, &env)?),
        };

        let public_key = key_pair.export_public_key(self.config.public_key_format)?;
        let fingerprint = HeaderValue::from_str(&public_key.fingerprint)
            .map_err(|e| ServerError::Config(format!("fingerprint is not a header value: {e}")))?;

        info!(
            bits = key_pair.bits(),
            fingerprint = %public_key.fingerprint,
            public_key_path = %self.config.public_key_path,
            message_path = %self.config.message_path,
            "encrypted messages enabled"
        );

        let engine = MessageEngine::new(env, key_pair, Arc::new(NonceCache::new()), self.config.engine);
        let state = Arc::new(ChannelState { engine, dispatcher, public_key, fingerprint });

        Ok(routes::router(state, &self.config.public_key_path, &self.config.message_path))
    }
}

fn load_or_generate<E: Environment>(
    config: &ServerRuntimeConfig,
    env: &E,
) -> Result<ServerKeyPair, ServerError> {
    if let Some(path) = &config.private_key_path {
        let text = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        let key_pair = ServerKeyPair::from_text(&text)?;
        info!(path = %path.display(), "loaded server key");
        return Ok(key_pair);
    }

    warn!(
        bits = config.key_length.bits(),
        "no private key configured, generating one; clients must refetch the public key after every restart"
    );
    Ok(ServerKeyPair::generate(&mut EnvRng(env), config.key_length)?)
}

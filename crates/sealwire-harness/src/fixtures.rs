//! Shared server keys and wiring for engine tests.
//!
//! RSA key generation is slow in debug builds, so one 1024-bit keypair is
//! generated per process and shared.

use std::sync::{Arc, OnceLock};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sealwire_core::{EncryptedClient, EngineConfig, MessageEngine, NonceCache};
use sealwire_crypto::{KeyLength, ServerKeyPair};

use crate::sim_env::SimEnv;

const KEY_SEED: u64 = 0x5EA1;

/// Process-wide test keypair.
#[allow(clippy::expect_used)]
pub fn test_key_pair() -> Arc<ServerKeyPair> {
    static KEY: OnceLock<Arc<ServerKeyPair>> = OnceLock::new();
    Arc::clone(KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(KEY_SEED);
        let key = ServerKeyPair::generate(&mut rng, KeyLength::Bit1024)
            .expect("invariant: 1024-bit RSA generation succeeds with a seeded RNG");
        Arc::new(key)
    }))
}

/// Engine over the shared test key with a fresh nonce cache.
pub fn test_engine(env: &SimEnv, config: EngineConfig) -> MessageEngine<SimEnv> {
    MessageEngine::new(env.clone(), test_key_pair(), Arc::new(NonceCache::new()), config)
}

/// Client that encrypts to the shared test key.
pub fn test_client(env: &SimEnv) -> EncryptedClient<SimEnv> {
    EncryptedClient::new(env.clone(), test_key_pair().public_key().clone())
}

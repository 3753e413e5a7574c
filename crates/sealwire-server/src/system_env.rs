//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` reads the wall clock from `SystemTime` and fills buffers from
//! the OS cryptographic RNG. Production behavior is therefore
//! non-deterministic; tests use the harness `SimEnv` instead.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sealwire_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom which provides OS-level cryptographic randomness
/// (e.g., /dev/urandom on Linux, `BCryptGenRandom` on Windows). Session keys
/// and IVs on the client side, and the server keypair when none is supplied,
/// are drawn from it.
///
/// # Panics
///
/// Panics if the OS RNG fails. A server without functioning cryptographic
/// randomness cannot generate keys safely, and continuing would be worse
/// than stopping.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    // A clock set before 1970 reads as the epoch, which fails every freshness
    // check instead of crashing the server.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> Duration {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - server cannot operate securely");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_after_2020() {
        let env = SystemEnv::new();
        assert!(env.wall_clock_secs() > 1_577_836_800);
    }

    #[test]
    fn system_env_random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];

        env.random_bytes(&mut bytes1);
        env.random_bytes(&mut bytes2);

        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }
}

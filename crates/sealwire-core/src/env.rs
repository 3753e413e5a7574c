//! Environment abstraction for deterministic testing.
//!
//! Decouples the protocol engine from system resources (wall clock,
//! randomness). Production wires in the operating system; tests drive a
//! manual clock and a seeded RNG so freshness and replay scenarios are
//! reproducible.

use std::time::Duration;

use rand::{CryptoRng, RngCore};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Time elapsed since the Unix epoch.
    ///
    /// This is wall-clock time, not a monotonic clock: request timestamps are
    /// produced by a different machine and can only be compared against the
    /// calendar.
    fn wall_clock(&self) -> Duration;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall-clock time as whole Unix seconds, the unit of request timestamps.
    fn wall_clock_secs(&self) -> i64 {
        i64::try_from(self.wall_clock().as_secs()).unwrap_or(i64::MAX)
    }

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Adapts an [`Environment`] to the `rand` traits expected by key generation
/// and RSA padding.
pub struct EnvRng<'a, E>(pub &'a E);

impl<E: Environment> RngCore for EnvRng<'_, E> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.0.random_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        self.0.random_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.random_bytes(dest);
        Ok(())
    }
}

// Sound as long as the environment honours its own contract above.
impl<E: Environment> CryptoRng for EnvRng<'_, E> {}

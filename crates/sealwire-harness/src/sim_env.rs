//! Deterministic environment with a manual wall clock.
//!
//! Time only moves when a test calls [`SimEnv::advance`] or
//! [`SimEnv::set_wall_clock`]. Randomness comes from a seeded `ChaCha20`, so a
//! given seed always produces the same session keys and IVs.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sealwire_core::Environment;

/// Default simulated start time: 2023-11-14T22:13:20Z.
pub const SIM_EPOCH_SECS: u64 = 1_700_000_000;

/// Simulation environment. Clones share the clock and RNG.
#[derive(Clone)]
pub struct SimEnv {
    clock_millis: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Environment seeded with `seed`, clock at [`SIM_EPOCH_SECS`].
    pub fn with_seed(seed: u64) -> Self {
        Self::at(seed, SIM_EPOCH_SECS)
    }

    /// Environment seeded with `seed`, clock at `unix_secs`.
    pub fn at(seed: u64, unix_secs: u64) -> Self {
        Self {
            clock_millis: Arc::new(AtomicU64::new(unix_secs * 1000)),
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.clock_millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute time. May move backwards.
    pub fn set_wall_clock(&self, since_epoch: Duration) {
        self.clock_millis.store(since_epoch.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    fn wall_clock(&self) -> Duration {
        Duration::from_millis(self.clock_millis.load(Ordering::SeqCst))
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_moves_only_when_told() {
        let env = SimEnv::with_seed(1);
        assert_eq!(env.wall_clock_secs(), SIM_EPOCH_SECS as i64);

        env.advance(Duration::from_secs(90));
        assert_eq!(env.wall_clock_secs(), SIM_EPOCH_SECS as i64 + 90);

        env.set_wall_clock(Duration::from_secs(42));
        assert_eq!(env.wall_clock_secs(), 42);
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::with_seed(1);
        let other = env.clone();

        other.advance(Duration::from_secs(5));
        assert_eq!(env.wall_clock(), other.wall_clock());
    }

    #[test]
    fn same_seed_same_bytes() {
        let (a, b) = (SimEnv::with_seed(9), SimEnv::with_seed(9));
        let (mut x, mut y) = ([0u8; 32], [0u8; 32]);

        a.random_bytes(&mut x);
        b.random_bytes(&mut y);
        assert_eq!(x, y);

        let c = SimEnv::with_seed(10);
        c.random_bytes(&mut y);
        assert_ne!(x, y);
    }
}

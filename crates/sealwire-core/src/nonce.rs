//! Replay protection keyed on the request IV.
//!
//! Every request carries a fresh random IV in its key-exchange blob. The
//! server remembers each IV until the request it arrived with could no longer
//! pass the freshness check, so a captured envelope cannot be replayed while
//! it is still fresh and is rejected as stale afterwards.
//!
//! # Invariants
//!
//! - Check-and-insert is atomic: of two concurrent requests with the same IV,
//!   exactly one observes [`NonceStatus::Fresh`]
//! - An entry whose expiry has passed is treated as absent
//!
//! The cache lives in process memory. Replicas behind a load balancer each
//! keep their own and do not share replay state.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use sealwire_crypto::IV_SIZE;

/// Outcome of registering a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    /// Not seen within its lifetime; now recorded
    Fresh,
    /// Already recorded and not yet expired
    Replay,
}

/// Concurrent map from IV to expiry time (wall clock since the Unix epoch).
#[derive(Debug, Default)]
pub struct NonceCache {
    entries: Mutex<HashMap<[u8; IV_SIZE], Duration>>,
}

impl NonceCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically record `iv` unless a live entry already exists.
    ///
    /// The new entry expires at `now + ttl`. An existing entry that has
    /// already expired is overwritten and counts as fresh.
    pub fn check_and_register(&self, iv: [u8; IV_SIZE], now: Duration, ttl: Duration) -> NonceStatus {
        let expiry = now.saturating_add(ttl);
        let mut entries = self.lock();

        match entries.entry(iv) {
            Entry::Occupied(mut entry) => {
                if now > *entry.get() {
                    entry.insert(expiry);
                    NonceStatus::Fresh
                } else {
                    NonceStatus::Replay
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(expiry);
                NonceStatus::Fresh
            },
        }
    }

    /// Drop every entry that expired before `now`. Returns how many were
    /// removed.
    pub fn evict(&self, now: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, expiry| now <= *expiry);
        before - entries.len()
    }

    /// Number of tracked nonces, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<[u8; IV_SIZE], Duration>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    const TTL: Duration = Duration::from_secs(20 * 60);

    fn at(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn first_sighting_is_fresh_second_is_replay() {
        let cache = NonceCache::new();

        assert_eq!(cache.check_and_register([1; IV_SIZE], at(1000), TTL), NonceStatus::Fresh);
        assert_eq!(cache.check_and_register([1; IV_SIZE], at(1001), TTL), NonceStatus::Replay);
        assert_eq!(cache.check_and_register([2; IV_SIZE], at(1001), TTL), NonceStatus::Fresh);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entry_is_live_until_its_expiry() {
        let cache = NonceCache::new();
        cache.check_and_register([1; IV_SIZE], at(1000), TTL);

        assert_eq!(
            cache.check_and_register([1; IV_SIZE], at(1000) + TTL, TTL),
            NonceStatus::Replay
        );
    }

    #[test]
    fn expired_entry_counts_as_absent() {
        let cache = NonceCache::new();
        cache.check_and_register([1; IV_SIZE], at(1000), TTL);

        let later = at(1001) + TTL;
        assert_eq!(cache.check_and_register([1; IV_SIZE], later, TTL), NonceStatus::Fresh);
        // The overwrite pushed the expiry forward
        assert_eq!(cache.check_and_register([1; IV_SIZE], later, TTL), NonceStatus::Replay);
    }

    #[test]
    fn evict_removes_only_expired_entries() {
        let cache = NonceCache::new();
        cache.check_and_register([1; IV_SIZE], at(0), TTL);
        cache.check_and_register([2; IV_SIZE], at(600), TTL);

        assert_eq!(cache.evict(at(1201)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.check_and_register([2; IV_SIZE], at(1201), TTL), NonceStatus::Replay);

        assert_eq!(cache.evict(at(10_000)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_registration_admits_exactly_one() {
        let cache = Arc::new(NonceCache::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.check_and_register([7; IV_SIZE], at(1000), TTL))
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|status| *status == NonceStatus::Fresh)
            .count();

        assert_eq!(fresh, 1);
    }
}

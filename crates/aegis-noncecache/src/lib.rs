// Path: crates/aegis-noncecache/src/lib.rs
//! Bounded, TTL-backed nonce replay cache (§4.8).
//!
//! The envelope validator (§4.7 step 7) checks this cache early to fail
//! fast on an already-seen nonce, then commits the nonce only after every
//! later check passes (§4.7: "do not burn nonces on failures to avoid DoS
//! amplification"). That deferred-write design leaves a window between the
//! early freshness check and the late commit in which two concurrent
//! validations of the same envelope could both observe "not present" and
//! both proceed to the expensive proof check. §5 requires the cache itself
//! to close that window with an atomic test-and-insert (compare-and-swap)
//! primitive so exactly one caller's commit wins; [`NonceCache::try_insert`]
//! is that primitive. `contains`/`insert`/`sweep` are the §4.8 operation
//! names for everyday callers; `try_insert` is the race-free commit the
//! validator uses for its final step.

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

use aegis_types::config::TrustCoreConfig;
use aegis_types::error::NonceCacheError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A bounded, TTL-backed set of observed nonces (§3, §4.8).
///
/// Backed by a [`DashMap`] for sharded, lock-free-ish concurrent access plus
/// a small ordered queue used only to decide which entry to evict when the
/// hard capacity bound is reached. Entries past their TTL are treated as
/// absent by `contains`/`try_insert` without requiring an immediate sweep;
/// `sweep` reclaims their memory on whatever cadence the caller schedules.
pub struct NonceCache {
    capacity: usize,
    entries: DashMap<Vec<u8>, i64>,
    order: Mutex<VecDeque<Vec<u8>>>,
}

impl NonceCache {
    /// Creates an empty cache, sized from `config.nonce_cache_capacity`
    /// rather than a hard-coded figure (§9: components take their numeric
    /// knobs by reference instead of baking in the spec's example numbers).
    pub fn new(config: &TrustCoreConfig) -> Self {
        Self::with_capacity(config.nonce_cache_capacity)
    }

    /// Creates an empty cache bounded to at most `capacity` simultaneously
    /// tracked nonces. On overflow, the oldest inserted entry is evicted —
    /// the unavoidable replay window this opens for the displaced nonce is
    /// the documented tradeoff of a bounded cache (§4.8). Exposed directly
    /// (rather than only through [`NonceCache::new`]) so callers — chiefly
    /// tests exercising eviction behavior — can pin an exact capacity
    /// without constructing a full [`TrustCoreConfig`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Whether `nonce` is currently tracked and not yet expired, given the
    /// caller-supplied current instant (Unix seconds). Linearizable: backed
    /// directly by the map's own read.
    pub fn contains_at(&self, nonce: &[u8], now: i64) -> bool {
        match self.entries.get(nonce) {
            Some(expiry) => *expiry > now,
            None => false,
        }
    }

    /// Atomic test-and-insert (§5): if `nonce` is not currently tracked (or
    /// its prior entry has expired), inserts it with `now + ttl_secs` and
    /// returns `true` — this call is the first-time insertion and "wins".
    /// If a live entry already exists, leaves it untouched and returns
    /// `false` — some other insertion already won the race.
    ///
    /// This is the primitive the envelope validator commits through at the
    /// end of its check sequence, after every other invariant has passed.
    pub fn try_insert_at(&self, nonce: &[u8], ttl_secs: i64, now: i64) -> bool {
        let mut reinserted = false;
        let won = match self.entries.entry(nonce.to_vec()) {
            Entry::Occupied(mut slot) => {
                if *slot.get() > now {
                    false
                } else {
                    slot.insert(now + ttl_secs);
                    reinserted = true;
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now + ttl_secs);
                true
            }
        };
        if won {
            let mut order = self.order.lock();
            if reinserted {
                // An expired-but-not-yet-swept entry is being legitimately
                // reused (§4.8). Drop its stale position first so `order`
                // never carries two references to one key — otherwise
                // `evict_overflow` could later pop the live reinserted
                // entry's leftover duplicate and delete it from `entries`
                // while the cache is still under capacity.
                if let Some(pos) = order.iter().position(|n| n.as_slice() == nonce) {
                    order.remove(pos);
                }
            }
            order.push_back(nonce.to_vec());
            drop(order);
            self.evict_overflow();
            aegis_telemetry::nonce_cache_metrics().set_nonce_cache_size(self.entries.len() as u64);
        } else {
            aegis_telemetry::nonce_cache_metrics().inc_nonce_rejected();
        }
        won
    }

    /// §4.8 `contains(nonce)`, using the wall-clock current instant.
    pub fn contains(&self, nonce: &[u8]) -> bool {
        self.contains_at(nonce, now_unix())
    }

    /// §4.8 `insert(nonce, ttl)`. Idempotent-equivalent: inserting an
    /// already-present, still-live nonce is a no-op that still returns
    /// success. Callers that need to know whether *this* call performed the
    /// first-time insertion (the validator's replay-prevention commit) use
    /// [`NonceCache::try_insert_at`] instead.
    pub fn insert(&self, nonce: &[u8], ttl_secs: i64) -> Result<(), NonceCacheError> {
        self.try_insert_at(nonce, ttl_secs, now_unix());
        Ok(())
    }

    /// Evicts every entry whose TTL has elapsed as of the wall-clock
    /// current instant. Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_unix())
    }

    /// `sweep`, parameterized by the current instant for deterministic tests.
    pub fn sweep_at(&self, now: i64) -> usize {
        let expired: Vec<Vec<u8>> = self
            .entries
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| entry.key().clone())
            .collect();
        for nonce in &expired {
            self.entries.remove(nonce);
        }
        if !expired.is_empty() {
            let mut order = self.order.lock();
            order.retain(|n| !expired.contains(n));
            aegis_telemetry::nonce_cache_metrics().inc_nonce_evicted(expired.len() as u64);
            aegis_telemetry::nonce_cache_metrics().set_nonce_cache_size(self.entries.len() as u64);
            tracing::info!(target: "aegis_noncecache", evicted = expired.len(), "swept expired nonces");
        }
        expired.len()
    }

    /// The number of nonces currently tracked (including any not yet swept
    /// past their TTL).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently tracks no nonces.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&self) {
        let mut order = self.order.lock();
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins_and_second_observation_is_a_replay() {
        let cache = NonceCache::with_capacity(16);
        let nonce = b"nonce-a".to_vec();
        assert!(!cache.contains_at(&nonce, 1_000));
        assert!(cache.try_insert_at(&nonce, 600, 1_000));
        assert!(cache.contains_at(&nonce, 1_000));
        assert!(!cache.try_insert_at(&nonce, 600, 1_050));
    }

    #[test]
    fn concurrent_try_insert_has_exactly_one_winner() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let cache = Arc::new(NonceCache::with_capacity(64));
        let wins = Arc::new(AtomicUsize::new(0));
        let nonce = Arc::new(b"race-nonce".to_vec());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let wins = wins.clone();
                let nonce = nonce.clone();
                std::thread::spawn(move || {
                    if cache.try_insert_at(&nonce, 600, 1_000) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entry_can_be_reinserted() {
        let cache = NonceCache::with_capacity(16);
        let nonce = b"nonce-b".to_vec();
        assert!(cache.try_insert_at(&nonce, 10, 1_000));
        assert!(!cache.contains_at(&nonce, 1_011));
        assert!(cache.try_insert_at(&nonce, 10, 1_011));
    }

    #[test]
    fn reinserting_an_expired_nonce_does_not_leave_a_stale_eviction_slot() {
        // Capacity 2: "a" expires and is legitimately reused, then two more
        // distinct nonces are inserted. If reinsertion left a duplicate
        // stale reference to "a" in the eviction queue, the queue would
        // overflow one entry early and evict "a" itself even though the
        // cache never exceeded two live entries.
        let cache = NonceCache::with_capacity(2);
        assert!(cache.try_insert_at(b"a", 10, 1_000));
        assert!(!cache.contains_at(b"a", 1_011));
        assert!(cache.try_insert_at(b"a", 600, 1_011));

        assert!(cache.try_insert_at(b"b", 600, 1_011));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains_at(b"a", 1_011));
        assert!(cache.contains_at(b"b", 1_011));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = NonceCache::with_capacity(16);
        cache.try_insert_at(b"old", 10, 1_000);
        cache.try_insert_at(b"fresh", 10, 1_000);

        let removed = cache.sweep_at(1_011);
        assert_eq!(removed, 1);
        assert!(!cache.contains_at(b"old", 1_011));
        assert!(cache.contains_at(b"fresh", 1_011));
    }

    #[test]
    fn overflow_evicts_oldest_entry_first() {
        let cache = NonceCache::with_capacity(2);
        cache.try_insert_at(b"first", 600, 1_000);
        cache.try_insert_at(b"second", 600, 1_000);
        cache.try_insert_at(b"third", 600, 1_000);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_at(b"first", 1_000));
        assert!(cache.contains_at(b"second", 1_000));
        assert!(cache.contains_at(b"third", 1_000));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn a_live_nonce_never_wins_a_second_try_insert(
            nonce in prop::collection::vec(any::<u8>(), 1..64),
            ttl in 1i64..10_000,
            now in 0i64..1_000_000,
        ) {
            let cache = NonceCache::with_capacity(1024);
            let first = cache.try_insert_at(&nonce, ttl, now);
            let second = cache.try_insert_at(&nonce, ttl, now);
            prop_assert!(first);
            prop_assert!(!second);
            prop_assert!(cache.contains_at(&nonce, now));
        }
    }
}

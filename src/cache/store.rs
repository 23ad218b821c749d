//! LRU Store Module
//!
//! Bounded map combining HashMap storage with LRU tracking and TTL expiration.
//! Not synchronized; the in-process provider wraps it in a mutex.
//!
//! Every entry gets the same TTL and a write resets it, so write order is
//! also expiry order. A second tracker keeps write order, which lets expired
//! entries be purged from the front without scanning the map.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, LruTracker};

// == LRU Store ==
/// Capacity-bounded, TTL-aware LRU map.
#[derive(Debug)]
pub struct LruStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Write order, oldest deadline first
    writes: LruTracker,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime of every entry, zero = never expire
    ttl: Duration,
}

impl LruStore {
    // == Constructor ==
    /// Creates a store holding at most `capacity` entries, each living `ttl`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            lru: LruTracker::new(),
            writes: LruTracker::new(),
            capacity,
            ttl,
        }
    }

    // == Set ==
    /// Stores a key-value pair, resetting its TTL.
    ///
    /// Returns the live entries evicted to make room, oldest first. Expired
    /// entries are dropped before any live one is evicted and are not
    /// reported.
    pub fn set(&mut self, key: &str, value: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let now = Instant::now();
        let mut evicted = Vec::new();

        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.purge_expired_at(now);

            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.lru.evict_oldest() else {
                    break;
                };
                self.writes.remove(&oldest);
                if let Some(entry) = self.entries.remove(&oldest) {
                    evicted.push((oldest, entry.value));
                }
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new_at(value, self.ttl, now));
        self.lru.touch(key);
        self.writes.touch(key);

        evicted
    }

    // == Get ==
    /// Returns the value if present and live, refreshing its recency.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let expired = self.entries.get(key)?.is_expired_at(now);

        if expired {
            self.remove(key);
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Contains ==
    /// Reports whether a live entry exists. Does not touch recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.lru.remove(key);
        self.writes.remove(key);
        self.entries.remove(key).map(|entry| entry.value)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        while let Some(oldest) = self.writes.peek_oldest() {
            let live = self
                .entries
                .get(oldest)
                .is_some_and(|entry| !entry.is_expired_at(now));
            if live {
                break;
            }
            let key = oldest.clone();
            self.remove(&key);
            purged += 1;
        }
        purged
    }

    // == Length ==
    /// Number of stored entries, including any not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

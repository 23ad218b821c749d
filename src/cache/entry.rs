//! Cache Entry Module
//!
//! Defines the structure for individual in-process entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value plus its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Vec<u8>,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    ///
    /// A zero `ttl` means the entry never expires.
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self::new_at(value, ttl, Instant::now())
    }

    pub(crate) fn new_at(value: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now` reaches the deadline, so a TTL that has
    /// fully elapsed is never served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

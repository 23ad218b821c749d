//! Capability Contract
//!
//! The operation set every provider implements. Callers hold an
//! `Arc<dyn Cache>` and never learn which backend sits behind it.

use crate::error::Result;

// == Cache Trait ==
/// A bounded key-value cache with LRU eviction and TTL expiry.
///
/// All operations are blocking. On the networked backend each one is a
/// bounded network round trip, so async callers should move them onto a
/// blocking thread.
///
/// A miss is not an error. Backend failures during `get`, `set`, `contains`
/// and `len` are reported through the provider's logger and surface as a
/// miss, `false` or `0`.
///
/// # Eviction notifications
/// Providers call the configured [`EvictionListener`](super::EvictionListener)
/// inline with the `set` that caused the eviction. The in-process provider
/// passes the evicted value; the Redis provider passes `None`, since
/// fetching the value would cost one more round trip per evicted key.
pub trait Cache: Send + Sync {
    /// Returns the value for `key`, refreshing its recency.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: Vec<u8>);

    /// Reports whether `key` is present without touching its recency.
    fn contains(&self, key: &str) -> bool;

    /// Returns the number of live entries.
    fn len(&self) -> usize;

    /// Returns true if the cache holds no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases backend resources. Safe to call more than once.
    fn close(&self) -> Result<()>;
}

//! In-process LRU provider.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Cache, EvictionListener, LruStore};
use crate::config::ProviderConfig;
use crate::error::Result;

/// Registry name of the in-process provider.
pub const MEMORY_PROVIDER: &str = "memory";

// == Memory Cache ==
/// Bounded in-process cache. Nothing external to release, so `close` is a
/// no-op.
pub struct MemoryCache {
    store: Mutex<LruStore>,
    on_evict: Option<Arc<dyn EvictionListener>>,
}

impl MemoryCache {
    /// Registry constructor.
    pub fn construct(config: ProviderConfig) -> Result<Arc<dyn Cache>> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            ttl_ms = config.ttl.as_millis() as u64,
            "building in-process cache"
        );
        Ok(Arc::new(Self {
            store: Mutex::new(LruStore::new(config.capacity, config.ttl)),
            on_evict: config.on_evict,
        }))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        let evicted = self.store.lock().set(key, value);

        // Listeners run outside the lock so they may call back into the cache
        if let Some(listener) = &self.on_evict {
            for (key, value) in &evicted {
                listener.on_evict(key, Some(value));
            }
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.store.lock().contains(key)
    }

    fn len(&self) -> usize {
        let mut store = self.store.lock();
        store.cleanup_expired();
        store.len()
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.lock();
        f.debug_struct("MemoryCache")
            .field("len", &store.len())
            .field("capacity", &store.capacity())
            .field("has_listener", &self.on_evict.is_some())
            .finish()
    }
}

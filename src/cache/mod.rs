//! Cache Module
//!
//! The capability contract, the provider registry, and the providers that
//! implement the contract: a bounded in-process LRU and a Redis-backed LRU.

mod contract;
mod entry;
mod instrumented;
mod listener;
mod logger;
mod lru;
mod memory;
mod registry;
mod remote;
mod store;


// Re-export public types
pub use contract::Cache;
pub use entry::CacheEntry;
pub use instrumented::InstrumentedCache;
pub use listener::{EvictionListener, FanOutListener};
pub use logger::{CacheLogger, TracingLogger};
pub use lru::LruTracker;
pub use memory::{MemoryCache, MEMORY_PROVIDER};
pub use registry::{Constructor, ProviderRegistry};
pub use remote::{
    LruBackend, RedisBackend, RedisCache, CONNECT_TIMEOUT, DATA_KEY, KEY_PREFIX, LRU_KEY,
    OPERATION_TIMEOUT, REDIS_PROVIDER,
};
pub use store::LruStore;

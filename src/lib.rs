//! LRU Providers - pluggable LRU-with-TTL caches
//!
//! One capability contract ([`Cache`]) over two backends: a bounded
//! in-process map and a Redis hash plus sorted set kept in step by atomic
//! scripts. Providers are built by name through a [`ProviderRegistry`] and
//! can be instrumented per group.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, EvictionListener, ProviderRegistry};
pub use config::{Config, ProviderConfig, RedisSettings};
pub use error::{CacheError, ConfigFault};
pub use metrics::CacheMetrics;

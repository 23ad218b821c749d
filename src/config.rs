//! Configuration Module
//!
//! [`ProviderConfig`] is the bundle handed to a provider constructor.
//! [`Config`] loads the binary's settings from environment variables.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheLogger, EvictionListener, TracingLogger, MEMORY_PROVIDER};
use crate::error::{CacheError, Result};

// == Redis Settings ==
/// Connection parameters for the networked backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RedisSettings {
    /// `host:port` or a full `redis://` URL
    pub address: String,
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .finish()
    }
}

// == Provider Config ==
/// Everything a provider constructor needs.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Maximum number of entries
    pub capacity: usize,
    /// Entry lifetime, zero = never expire
    pub ttl: Duration,
    /// Receives capacity evictions
    pub on_evict: Option<Arc<dyn EvictionListener>>,
    /// Receives swallowed backend failures
    pub logger: Arc<dyn CacheLogger>,
    pub redis: RedisSettings,
    /// Metrics group label, empty = no instrumentation
    pub group: String,
}

impl ProviderConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            on_evict: None,
            logger: Arc::new(TracingLogger),
            redis: RedisSettings::default(),
            group: String::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EvictionListener>) -> Self {
        self.on_evict = Some(listener);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn CacheLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_redis(mut self, redis: RedisSettings) -> Self {
        self.redis = redis;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Rejects settings no provider can honour.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("on_evict", &self.on_evict.is_some())
            .field("redis", &self.redis)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

// == Server Config ==
/// Binary configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry name of the provider to build
    pub provider: String,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Entry TTL in seconds, 0 = never expire
    pub ttl_secs: u64,
    pub redis: RedisSettings,
    /// Metrics group label, empty disables instrumentation
    pub group: String,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PROVIDER` - Provider name (default: memory)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL` - Entry TTL in seconds (default: 300)
    /// - `REDIS_ADDR` - Redis address (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: unset)
    /// - `REDIS_DB` - Redis database index (default: 0)
    /// - `CACHE_GROUP` - Metrics group label (default: empty)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider: env::var("CACHE_PROVIDER").unwrap_or(defaults.provider),
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            ttl_secs: parse_var("CACHE_TTL").unwrap_or(defaults.ttl_secs),
            redis: RedisSettings {
                address: env::var("REDIS_ADDR").unwrap_or(defaults.redis.address),
                password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
                db: parse_var("REDIS_DB").unwrap_or(defaults.redis.db),
            },
            group: env::var("CACHE_GROUP").unwrap_or(defaults.group),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Builds the constructor bundle with the default logger and no listener.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(self.capacity, Duration::from_secs(self.ttl_secs))
            .with_redis(self.redis.clone())
            .with_group(self.group.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: MEMORY_PROVIDER.to_string(),
            capacity: 1000,
            ttl_secs: 300,
            redis: RedisSettings::default(),
            group: String::new(),
            server_port: 3000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

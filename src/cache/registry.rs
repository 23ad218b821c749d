//! Provider Registry
//!
//! Name to constructor table. Built once at startup, then shared with every
//! call site that needs to build caches.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::{
    Cache, FanOutListener, InstrumentedCache, MemoryCache, RedisCache, MEMORY_PROVIDER,
    REDIS_PROVIDER,
};
use crate::config::ProviderConfig;
use crate::error::{CacheError, ConfigFault, Result};
use crate::metrics::CacheMetrics;

/// Builds one cache from one configuration.
pub type Constructor = Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn Cache>> + Send + Sync>;

// == Provider Registry ==
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Constructor>>,
    metrics: Arc<CacheMetrics>,
}

impl ProviderRegistry {
    /// Creates an empty registry reporting into `metrics`.
    pub fn new(metrics: Arc<CacheMetrics>) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Creates a registry with the `memory` and `redis` providers.
    pub fn with_builtin_providers(metrics: Arc<CacheMetrics>) -> std::result::Result<Self, ConfigFault> {
        let registry = Self::new(metrics);
        registry.register(MEMORY_PROVIDER, MemoryCache::construct)?;
        registry.register(REDIS_PROVIDER, RedisCache::construct)?;
        Ok(registry)
    }

    // == Registration ==
    /// Registers `constructor` under `name`.
    pub fn register<F>(&self, name: &str, constructor: F) -> std::result::Result<(), ConfigFault>
    where
        F: Fn(ProviderConfig) -> Result<Arc<dyn Cache>> + Send + Sync + 'static,
    {
        self.try_register(name, Some(Arc::new(constructor)))
    }

    /// Registers a possibly absent constructor.
    ///
    /// Duplicate names and missing constructors are wiring bugs; callers
    /// should treat the fault as fatal.
    pub fn try_register(
        &self,
        name: &str,
        constructor: Option<Constructor>,
    ) -> std::result::Result<(), ConfigFault> {
        let constructor =
            constructor.ok_or_else(|| ConfigFault::MissingConstructor(name.to_string()))?;

        let mut providers = self.providers.write();
        if providers.contains_key(name) {
            return Err(ConfigFault::DuplicateProvider(name.to_string()));
        }
        providers.insert(name.to_string(), constructor);
        debug!(provider = name, "registered cache provider");
        Ok(())
    }

    /// Registers or terminates with the fault's message.
    pub fn must_register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(ProviderConfig) -> Result<Arc<dyn Cache>> + Send + Sync + 'static,
    {
        if let Err(fault) = self.register(name, constructor) {
            fault.fatal();
        }
    }

    // == Lookup ==
    /// Sorted names of every registered provider.
    pub fn registered_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds a cache with the provider registered as `name`.
    ///
    /// With a non-empty `config.group`, evictions are counted through a
    /// listener placed ahead of the caller's, and the returned cache counts
    /// hits and misses and reports its size.
    pub fn new_cache(&self, name: &str, mut config: ProviderConfig) -> Result<Arc<dyn Cache>> {
        let constructor = self.providers.read().get(name).cloned();
        let Some(constructor) = constructor else {
            return Err(CacheError::UnknownProvider {
                name: name.to_string(),
                registered: self.registered_providers(),
            });
        };

        let group = config.group.clone();
        if !group.is_empty() {
            let listener = FanOutListener::new()
                .with(self.metrics.eviction_counter(&group))
                .with_optional(config.on_evict.take());
            config.on_evict = Some(Arc::new(listener));
        }

        let cache = constructor(config)?;
        info!(provider = name, group = %group, "cache constructed");

        if group.is_empty() {
            return Ok(cache);
        }
        Ok(Arc::new(InstrumentedCache::wrap(
            cache,
            &group,
            self.metrics.clone(),
        )))
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.registered_providers())
            .finish_non_exhaustive()
    }
}

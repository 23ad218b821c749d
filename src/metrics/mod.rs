//! Cache metrics.
//!
//! Hit, miss and eviction counters plus an entries gauge, all labelled by
//! group. The gauge is observable: its value is read from each registered
//! cache's `len()` when the meter provider collects, never tracked
//! incrementally, because a Redis-backed cache shrinks on its own as fields
//! expire.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use opentelemetry::{
    metrics::{AsyncInstrument, Counter, Meter, MeterProvider, ObservableGauge},
    InstrumentationScope, KeyValue,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Cache, EvictionListener};

const METER_NAME: &str = "lru_providers";
const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const HITS_NAME: &str = "cache.hits";
pub const MISSES_NAME: &str = "cache.misses";
pub const EVICTIONS_NAME: &str = "cache.evictions";
pub const ENTRIES_NAME: &str = "cache.entries";
/// Attribute carrying the group label.
pub const GROUP_ATTRIBUTE: &str = "group";

pub fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .build(),
    )
}

fn create_counter(meter: &Meter, name: &'static str, description: &'static str) -> Counter<u64> {
    meter
        .u64_counter(name)
        .with_description(description)
        .with_unit("{event}")
        .build()
}

/// Attribute set identifying one group.
pub fn group_attributes(group: &str) -> [KeyValue; 1] {
    [KeyValue::new(GROUP_ATTRIBUTE, group.to_string())]
}

type Collectors = Arc<Mutex<HashMap<String, Arc<EntriesCollector>>>>;

// == Entries Collector ==
/// The lazily sampled entries gauge of one group.
///
/// Identity matters: unregistration only succeeds for the collector that is
/// currently registered, so a stale cache cannot remove its successor's.
pub struct EntriesCollector {
    group: String,
    attributes: [KeyValue; 1],
    cache: Arc<dyn Cache>,
}

impl EntriesCollector {
    pub fn group(&self) -> &str {
        &self.group
    }

    fn observe(&self, observer: &dyn AsyncInstrument<u64>) {
        observer.observe(self.cache.len() as u64, &self.attributes);
    }
}

impl fmt::Debug for EntriesCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntriesCollector")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

// == Cache Metrics ==
/// Instruments shared by every cache built from one registry.
pub struct CacheMetrics {
    hits: Counter<u64>,
    misses: Counter<u64>,
    evictions: Counter<u64>,
    collectors: Collectors,
    _entries: ObservableGauge<u64>,
}

impl CacheMetrics {
    pub fn new(meter: &Meter) -> Self {
        let collectors: Collectors = Arc::default();
        let sampled = collectors.clone();

        let entries = meter
            .u64_observable_gauge(ENTRIES_NAME)
            .with_description("Number of entries in the cache")
            .with_unit("{entry}")
            .with_callback(move |observer| {
                // Sample outside the lock; len() may be a network round trip
                let snapshot: Vec<Arc<EntriesCollector>> = sampled.lock().values().cloned().collect();
                for collector in snapshot {
                    collector.observe(observer);
                }
            })
            .build();

        Self {
            hits: create_counter(meter, HITS_NAME, "Cache lookups that found a value"),
            misses: create_counter(meter, MISSES_NAME, "Cache lookups that found nothing"),
            evictions: create_counter(meter, EVICTIONS_NAME, "Entries evicted to honour capacity"),
            collectors,
            _entries: entries,
        }
    }

    /// Builds the instruments from the given provider.
    pub fn from_provider(meter_provider: &dyn MeterProvider) -> Self {
        Self::new(&create_meter(meter_provider))
    }

    /// Builds the instruments from the globally installed provider, a no-op
    /// unless one has been set.
    pub fn from_global() -> Self {
        Self::new(&opentelemetry::global::meter(METER_NAME))
    }

    pub fn record_hit(&self, attributes: &[KeyValue]) {
        self.hits.add(1, attributes);
    }

    pub fn record_miss(&self, attributes: &[KeyValue]) {
        self.misses.add(1, attributes);
    }

    pub fn record_eviction(&self, attributes: &[KeyValue]) {
        self.evictions.add(1, attributes);
    }

    /// Listener that counts evictions for `group`.
    pub fn eviction_counter(self: &Arc<Self>, group: &str) -> Arc<dyn EvictionListener> {
        Arc::new(EvictionCounter {
            metrics: self.clone(),
            attributes: group_attributes(group),
        })
    }

    // == Collector Lifecycle ==
    /// Makes `cache` the entries source for `group`, replacing any previous
    /// collector in one step.
    pub fn register_entries(&self, group: &str, cache: Arc<dyn Cache>) -> Arc<EntriesCollector> {
        let collector = Arc::new(EntriesCollector {
            group: group.to_string(),
            attributes: group_attributes(group),
            cache,
        });

        let replaced = self
            .collectors
            .lock()
            .insert(group.to_string(), collector.clone());
        if replaced.is_some() {
            debug!(group, "replaced entries collector");
        }

        collector
    }

    /// Removes `collector` if it is still the active one for its group.
    ///
    /// Returns false when another collector has since taken over the group.
    pub fn unregister_entries(&self, collector: &Arc<EntriesCollector>) -> bool {
        let mut collectors = self.collectors.lock();
        match collectors.get(&collector.group) {
            Some(active) if Arc::ptr_eq(active, collector) => {
                collectors.remove(&collector.group);
                true
            }
            _ => false,
        }
    }

    /// Groups with an active entries collector, sorted.
    pub fn active_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.collectors.lock().keys().cloned().collect();
        groups.sort();
        groups
    }
}

impl fmt::Debug for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMetrics")
            .field("active_groups", &self.active_groups())
            .finish_non_exhaustive()
    }
}

struct EvictionCounter {
    metrics: Arc<CacheMetrics>,
    attributes: [KeyValue; 1],
}

impl EvictionListener for EvictionCounter {
    fn on_evict(&self, _key: &str, _value: Option<&[u8]>) {
        self.metrics.record_eviction(&self.attributes);
    }
}

#[cfg(test)]
pub(crate) mod testing;

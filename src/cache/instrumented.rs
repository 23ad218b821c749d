//! Metrics decorator over any [`Cache`].

use std::fmt;
use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::Cache;
use crate::error::Result;
use crate::metrics::{group_attributes, CacheMetrics, EntriesCollector};

// == Instrumented Cache ==
/// Counts hits and misses for a group and owns the group's entries gauge.
///
/// Evictions are counted by a listener installed before the inner cache is
/// built, so this type only observes `get`.
pub struct InstrumentedCache {
    inner: Arc<dyn Cache>,
    group: String,
    attributes: [KeyValue; 1],
    metrics: Arc<CacheMetrics>,
    collector: Mutex<Option<Arc<EntriesCollector>>>,
}

impl InstrumentedCache {
    /// Wraps `inner` and registers its entries gauge under `group`.
    pub fn wrap(inner: Arc<dyn Cache>, group: &str, metrics: Arc<CacheMetrics>) -> Self {
        let collector = metrics.register_entries(group, inner.clone());
        Self {
            inner,
            group: group.to_string(),
            attributes: group_attributes(group),
            metrics,
            collector: Mutex::new(Some(collector)),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Cache for InstrumentedCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.inner.get(key);
        if value.is_some() {
            self.metrics.record_hit(&self.attributes);
        } else {
            self.metrics.record_miss(&self.attributes);
        }
        value
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.inner.set(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn close(&self) -> Result<()> {
        if let Some(collector) = self.collector.lock().take() {
            if !self.metrics.unregister_entries(&collector) {
                debug!(group = %self.group, "entries collector already replaced");
            }
        }
        self.inner.close()
    }
}

impl fmt::Debug for InstrumentedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedCache")
            .field("group", &self.group)
            .field("registered", &self.collector.lock().is_some())
            .finish_non_exhaustive()
    }
}

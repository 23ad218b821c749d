//! Test utilities for metric assertions.

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData, ResourceMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};

use super::GROUP_ATTRIBUTE;

/// Collects metrics in memory and reads back single values.
#[derive(Debug)]
pub(crate) struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    pub fn new() -> Self {
        let in_memory = InMemoryMetricExporter::default();

        Self {
            exporter: in_memory.clone(),
            provider: SdkMeterProvider::builder()
                .with_periodic_exporter(in_memory)
                .build(),
        }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Collects now and returns the current value of `name` for `group`.
    pub fn value(&self, name: &str, group: &str) -> Option<u64> {
        self.provider.force_flush().unwrap();
        let wanted = KeyValue::new(GROUP_ATTRIBUTE, group.to_string());

        // Each flush exports the full cumulative state; only the newest matters
        let exported = self.exporter.get_finished_metrics().unwrap();
        let value = exported
            .last()
            .into_iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(|scope| scope.metrics())
            .filter(|metric| metric.name() == name)
            .filter_map(|metric| match metric.data() {
                AggregatedMetrics::U64(MetricData::Sum(sum)) => sum
                    .data_points()
                    .find(|point| point.attributes().any(|kv| *kv == wanted))
                    .map(|point| point.value()),
                AggregatedMetrics::U64(MetricData::Gauge(gauge)) => gauge
                    .data_points()
                    .find(|point| point.attributes().any(|kv| *kv == wanted))
                    .map(|point| point.value()),
                _ => None,
            })
            .last();
        value
    }
}

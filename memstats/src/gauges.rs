//! The four storage engine memory usage gauges.

use common::{FloatGauge, GaugeDescriptor, GaugeRegistry, MemoryUsage};

use crate::error::Result;

pub const MEMTABLE_TOTAL: &str = "memory_usage_memtable_total";
pub const MEMTABLE_UNFLUSHED: &str = "memory_usage_memtable_unflushed";
pub const MEMTABLE_READERS_TOTAL: &str = "memory_usage_memtable_readers_total";
pub const CACHE_TOTAL: &str = "memory_usage_cache_total";

const MEMTABLE_TOTAL_HELP: &str = "Estimated memory usage of all mem-tables in bytes";
const MEMTABLE_UNFLUSHED_HELP: &str = "Estimated memory usage of unflushed mem-tables in bytes";
const MEMTABLE_READERS_TOTAL_HELP: &str =
    "Memory usage of table readers (indexes and bloom filters) in bytes";
const CACHE_TOTAL_HELP: &str = "Memory usage of block caches in bytes";

/// Handles to the registered memory usage gauges.
///
/// Created once by [`register`](MemoryUsageGauges::register); the registry
/// keeps its own clones for scraping.
#[derive(Clone, Debug)]
pub struct MemoryUsageGauges {
    cache_total: FloatGauge,
    mem_table_total: FloatGauge,
    mem_table_unflushed: FloatGauge,
    mem_table_readers_total: FloatGauge,
}

impl MemoryUsageGauges {
    /// Creates the four gauges and registers them in a single call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMetric`](crate::Error::DuplicateMetric) if any
    /// of the names is already registered in `namespace`. Nothing is
    /// registered in that case.
    pub fn register(registry: &mut dyn GaugeRegistry, namespace: &str) -> Result<Self> {
        let gauges = Self {
            cache_total: FloatGauge::default(),
            mem_table_total: FloatGauge::default(),
            mem_table_unflushed: FloatGauge::default(),
            mem_table_readers_total: FloatGauge::default(),
        };

        registry.register_gauges(vec![
            (
                GaugeDescriptor::new(namespace, CACHE_TOTAL, CACHE_TOTAL_HELP),
                gauges.cache_total.clone(),
            ),
            (
                GaugeDescriptor::new(namespace, MEMTABLE_TOTAL, MEMTABLE_TOTAL_HELP),
                gauges.mem_table_total.clone(),
            ),
            (
                GaugeDescriptor::new(namespace, MEMTABLE_UNFLUSHED, MEMTABLE_UNFLUSHED_HELP),
                gauges.mem_table_unflushed.clone(),
            ),
            (
                GaugeDescriptor::new(
                    namespace,
                    MEMTABLE_READERS_TOTAL,
                    MEMTABLE_READERS_TOTAL_HELP,
                ),
                gauges.mem_table_readers_total.clone(),
            ),
        ])?;

        Ok(gauges)
    }

    /// Overwrites all four gauges from one snapshot.
    pub fn update(&self, usage: &MemoryUsage) {
        // Convert everything before the first store.
        let cache_total = usage.cache_total as f64;
        let mem_table_total = usage.mem_table_total as f64;
        let mem_table_unflushed = usage.mem_table_unflushed as f64;
        let mem_table_readers_total = usage.mem_table_readers_total as f64;

        self.cache_total.set(cache_total);
        self.mem_table_total.set(mem_table_total);
        self.mem_table_unflushed.set(mem_table_unflushed);
        self.mem_table_readers_total.set(mem_table_readers_total);
    }

    pub fn cache_total(&self) -> f64 {
        self.cache_total.get()
    }

    pub fn mem_table_total(&self) -> f64 {
        self.mem_table_total.get()
    }

    pub fn mem_table_unflushed(&self) -> f64 {
        self.mem_table_unflushed.get()
    }

    pub fn mem_table_readers_total(&self) -> f64 {
        self.mem_table_readers_total.get()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use common::metrics::check_batch;
    use common::{PrometheusRegistry, RegistryError};

    use super::*;
    use crate::error::Error;

    /// Registry that records every accepted descriptor.
    #[derive(Default)]
    struct RecordingRegistry {
        registered: HashSet<String>,
        descriptors: Vec<GaugeDescriptor>,
        calls: usize,
    }

    impl GaugeRegistry for RecordingRegistry {
        fn register_gauges(
            &mut self,
            gauges: Vec<(GaugeDescriptor, FloatGauge)>,
        ) -> std::result::Result<(), RegistryError> {
            self.calls += 1;
            let names = check_batch(&self.registered, &gauges)?;
            self.registered.extend(names);
            self.descriptors.extend(gauges.into_iter().map(|(d, _)| d));
            Ok(())
        }
    }

    #[test]
    fn should_register_four_gauges_in_one_call() {
        // given
        let mut registry = RecordingRegistry::default();

        // when
        MemoryUsageGauges::register(&mut registry, "storage-engine").unwrap();

        // then
        assert_eq!(registry.calls, 1);
        let names: Vec<&str> = registry
            .descriptors
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                CACHE_TOTAL,
                MEMTABLE_TOTAL,
                MEMTABLE_UNFLUSHED,
                MEMTABLE_READERS_TOTAL
            ]
        );
        assert!(
            registry
                .descriptors
                .iter()
                .all(|d| d.namespace == "storage-engine" && !d.help.is_empty())
        );
    }

    #[test]
    fn should_fail_with_duplicate_metric_on_second_registration() {
        // given
        let mut registry = RecordingRegistry::default();
        MemoryUsageGauges::register(&mut registry, "storage-engine").unwrap();

        // when
        let result = MemoryUsageGauges::register(&mut registry, "storage-engine");

        // then
        assert_eq!(
            result.unwrap_err(),
            Error::DuplicateMetric {
                namespace: "storage-engine".to_string(),
                name: CACHE_TOTAL.to_string(),
            }
        );
        assert_eq!(registry.descriptors.len(), 4);
    }

    #[test]
    fn should_register_same_names_in_distinct_namespaces() {
        // given
        let mut registry = PrometheusRegistry::new();
        MemoryUsageGauges::register(&mut registry, "storage-engine").unwrap();

        // when
        let result = MemoryUsageGauges::register(&mut registry, "index-engine");

        // then
        assert!(result.is_ok());
        assert!(registry.contains("index_engine_memory_usage_cache_total"));
    }

    #[test]
    fn should_start_at_zero() {
        // given/when
        let gauges =
            MemoryUsageGauges::register(&mut PrometheusRegistry::new(), "storage-engine").unwrap();

        // then
        assert_eq!(gauges.cache_total(), 0.0);
        assert_eq!(gauges.mem_table_total(), 0.0);
        assert_eq!(gauges.mem_table_unflushed(), 0.0);
        assert_eq!(gauges.mem_table_readers_total(), 0.0);
    }

    #[test]
    fn should_update_all_gauges_from_snapshot() {
        // given
        let mut registry = PrometheusRegistry::new();
        let gauges = MemoryUsageGauges::register(&mut registry, "storage-engine").unwrap();
        let usage = MemoryUsage {
            cache_total: 1000,
            mem_table_total: 5000,
            mem_table_unflushed: 2000,
            mem_table_readers_total: 300,
        };

        // when
        gauges.update(&usage);

        // then
        assert_eq!(gauges.cache_total(), 1000.0);
        assert_eq!(gauges.mem_table_total(), 5000.0);
        assert_eq!(gauges.mem_table_unflushed(), 2000.0);
        assert_eq!(gauges.mem_table_readers_total(), 300.0);
    }

    #[test]
    fn should_convert_values_up_to_max_safe_integer_losslessly() {
        // given
        let gauges =
            MemoryUsageGauges::register(&mut PrometheusRegistry::new(), "storage-engine").unwrap();
        let max_safe = (1u64 << 53) - 1;

        // when
        gauges.update(&MemoryUsage {
            cache_total: max_safe,
            ..Default::default()
        });

        // then
        assert_eq!(gauges.cache_total() as u64, max_safe);
    }
}

//! Shared building blocks for publishing storage engine statistics.
//!
//! - [`storage`]: the engine-facing side. Engines implement
//!   [`MemoryUsageSource`] and [`approximate_memory_usage_by_type`] folds any
//!   number of them into one [`MemoryUsage`] snapshot.
//! - [`metrics`]: the registry-facing side. Gauges are registered once
//!   through [`GaugeRegistry`]; [`PrometheusRegistry`] serves them to
//!   scrapers in the Prometheus text format.

pub mod metrics;
pub mod storage;

pub use metrics::{FloatGauge, GaugeDescriptor, GaugeRegistry, PrometheusRegistry, RegistryError};
pub use storage::in_memory::InMemoryUsageSource;
pub use storage::stats::{
    CacheUsage, EngineMemoryUsage, MemoryUsage, MemoryUsageSource, approximate_memory_usage_by_type,
};
pub use storage::{StorageError, StorageResult};

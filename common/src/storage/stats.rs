//! Backend-agnostic interface for querying storage engine memory usage.
//!
//! Engines report what they hold in memory per instance. The query in this
//! module folds any number of instances into a single [`MemoryUsage`]
//! snapshot suitable for publishing as Prometheus gauges.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::StorageResult;

/// A point-in-time read of storage engine memory usage, in bytes.
///
/// Produced by one call to [`approximate_memory_usage_by_type`] and consumed
/// as a unit. All four figures come from the same query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Memory held by block caches.
    pub cache_total: u64,
    /// Memory held by all mem-tables, flushed or not.
    pub mem_table_total: u64,
    /// Memory held by mem-tables not yet flushed.
    pub mem_table_unflushed: u64,
    /// Memory held by table readers (indexes and bloom filters).
    pub mem_table_readers_total: u64,
}

/// Usage of a single cache. Caches may be shared between engine instances,
/// so `id` identifies the cache and not the instance reporting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheUsage {
    pub id: u64,
    pub usage: u64,
}

/// Memory usage as reported by one engine instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineMemoryUsage {
    pub mem_table_total: u64,
    pub mem_table_unflushed: u64,
    pub mem_table_readers_total: u64,
    /// Caches used by this instance.
    pub caches: Vec<CacheUsage>,
}

/// A handle to a storage engine instance that can report its memory usage.
#[async_trait]
pub trait MemoryUsageSource: Send + Sync {
    /// Returns the instance's current memory usage.
    async fn memory_usage(&self) -> StorageResult<EngineMemoryUsage>;
}

/// Queries every engine and folds the results into one snapshot.
///
/// Mem-table figures are summed across engines. Cache usage is counted once
/// per distinct cache id, whether the cache was reported by an engine or
/// passed in `caches`. With no engines and no caches the snapshot is all
/// zeros. The first failing engine fails the whole query.
#[tracing::instrument(level = "trace", skip_all, fields(engines = engines.len()))]
pub async fn approximate_memory_usage_by_type(
    engines: &[Arc<dyn MemoryUsageSource>],
    caches: &[CacheUsage],
) -> StorageResult<MemoryUsage> {
    let mut usage = MemoryUsage::default();
    let mut seen_caches = HashSet::new();

    for engine in engines {
        let reported = engine.memory_usage().await?;
        usage.mem_table_total = usage.mem_table_total.saturating_add(reported.mem_table_total);
        usage.mem_table_unflushed = usage
            .mem_table_unflushed
            .saturating_add(reported.mem_table_unflushed);
        usage.mem_table_readers_total = usage
            .mem_table_readers_total
            .saturating_add(reported.mem_table_readers_total);

        for cache in &reported.caches {
            if seen_caches.insert(cache.id) {
                usage.cache_total = usage.cache_total.saturating_add(cache.usage);
            }
        }
    }

    for cache in caches {
        if seen_caches.insert(cache.id) {
            usage.cache_total = usage.cache_total.saturating_add(cache.usage);
        }
    }

    Ok(usage)
}

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::stats::{EngineMemoryUsage, MemoryUsageSource};
use super::{StorageError, StorageResult};

/// In-memory implementation of [`MemoryUsageSource`].
///
/// Reports whatever usage was last set, or fails with the injected error
/// until a new usage is set. Counts every query it answers, including
/// failed ones. Useful for tests and for hosts embedding an engine that
/// does not expose its own memory statistics.
pub struct InMemoryUsageSource {
    state: RwLock<StorageResult<EngineMemoryUsage>>,
    queries: AtomicU64,
}

impl InMemoryUsageSource {
    /// Creates a source reporting `usage`.
    pub fn new(usage: EngineMemoryUsage) -> Self {
        Self {
            state: RwLock::new(Ok(usage)),
            queries: AtomicU64::new(0),
        }
    }

    /// Replaces the reported usage, clearing any injected failure.
    pub fn set(&self, usage: EngineMemoryUsage) {
        self.replace(Ok(usage));
    }

    /// Makes every subsequent query fail with `error`.
    pub fn fail_with(&self, error: StorageError) {
        self.replace(Err(error));
    }

    /// Number of queries answered so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn replace(&self, state: StorageResult<EngineMemoryUsage>) {
        // a poisoned lock still holds a complete value, overwrite it
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = state;
    }
}

impl Default for InMemoryUsageSource {
    fn default() -> Self {
        Self::new(EngineMemoryUsage::default())
    }
}

#[async_trait]
impl MemoryUsageSource for InMemoryUsageSource {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn memory_usage(&self) -> StorageResult<EngineMemoryUsage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let state = self
            .state
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::stats::CacheUsage;

    fn usage(total: u64) -> EngineMemoryUsage {
        EngineMemoryUsage {
            mem_table_total: total,
            mem_table_unflushed: total / 2,
            mem_table_readers_total: 3,
            caches: vec![CacheUsage { id: 1, usage: 10 }],
        }
    }

    #[tokio::test]
    async fn should_report_configured_usage() {
        // given
        let source = InMemoryUsageSource::new(usage(100));

        // when
        let reported = source.memory_usage().await.unwrap();

        // then
        assert_eq!(reported, usage(100));
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test]
    async fn should_fail_until_usage_is_set_again() {
        // given
        let source = InMemoryUsageSource::default();
        source.fail_with(StorageError::Storage("busy".to_string()));

        // when
        let failed = source.memory_usage().await;
        source.set(usage(42));
        let recovered = source.memory_usage().await;

        // then
        assert_eq!(failed, Err(StorageError::Storage("busy".to_string())));
        assert_eq!(recovered, Ok(usage(42)));
        assert_eq!(source.query_count(), 2);
    }
}

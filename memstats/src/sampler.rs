//! Background loop sampling storage engine memory usage into gauges.

use std::sync::Arc;
use std::time::Duration;

use common::{MemoryUsage, MemoryUsageSource, approximate_memory_usage_by_type};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::gauges::MemoryUsageGauges;

/// Periodically queries the engines and publishes the result.
///
/// The sampler never registers anything; it only sets values on gauges that
/// were registered by [`MemoryUsageGauges::register`]. A failed query leaves
/// the gauges at their last value and is retried on the next tick only.
pub struct MemoryUsageSampler {
    gauges: MemoryUsageGauges,
    engines: Vec<Arc<dyn MemoryUsageSource>>,
    interval: Duration,
    consecutive_failures: u64,
}

impl MemoryUsageSampler {
    pub fn new(
        gauges: MemoryUsageGauges,
        engines: Vec<Arc<dyn MemoryUsageSource>>,
        interval: Duration,
    ) -> Self {
        Self {
            gauges,
            engines,
            interval,
            consecutive_failures: 0,
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// The first sample is taken one interval after the call. A sample that
    /// is already in progress when `shutdown` fires completes before the
    /// loop exits.
    pub async fn run(mut self, shutdown: CancellationToken) {
        // Start the interval in the future to avoid immediate first tick
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("shutdown signalled, stopping memory usage sampler");
                    return;
                }

                _ = ticker.tick() => {
                    self.sample_once().await;
                }
            }
        }
    }

    /// Takes one sample and publishes it, or logs the failure.
    pub async fn sample_once(&mut self) {
        match self.query().await {
            Ok(usage) => {
                self.gauges.update(&usage);
                if self.consecutive_failures > 0 {
                    info!(
                        failures = self.consecutive_failures,
                        "memory usage sampling recovered"
                    );
                    self.consecutive_failures = 0;
                }
                debug!(
                    cache_total = usage.cache_total,
                    mem_table_total = usage.mem_table_total,
                    mem_table_unflushed = usage.mem_table_unflushed,
                    mem_table_readers_total = usage.mem_table_readers_total,
                    "sampled storage engine memory usage"
                );
            }
            Err(e) => {
                self.consecutive_failures += 1;
                error!(
                    error = %e,
                    consecutive_failures = self.consecutive_failures,
                    "Error getting storage engine memory usage"
                );
            }
        }
    }

    async fn query(&self) -> Result<MemoryUsage> {
        Ok(approximate_memory_usage_by_type(&self.engines, &[]).await?)
    }
}

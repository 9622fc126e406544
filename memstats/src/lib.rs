//! Storage engine memory usage sampler.
//!
//! Publishes a storage engine's memory usage as four Prometheus gauges:
//! block cache, all mem-tables, unflushed mem-tables and table readers.
//! A single background task samples the engine on a fixed interval and
//! stops when the engine's shutdown token is cancelled.
//!
//! # Architecture
//!
//! - **Gauges**: [`MemoryUsageGauges::register`] creates the gauges and
//!   registers them with the process registry exactly once. A duplicate name
//!   fails startup with [`Error::DuplicateMetric`].
//! - **Sampler**: [`MemoryUsageSampler`] waits on the ticker or the shutdown
//!   token, queries the engines, and overwrites all four gauges from one
//!   snapshot. A failed query is logged and the gauges keep their last value.
//!
//! # Example
//!
//! ```ignore
//! use common::PrometheusRegistry;
//! use memstats::SamplerConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut registry = PrometheusRegistry::new();
//! let shutdown = CancellationToken::new();
//! let handle = memstats::start(
//!     &mut registry,
//!     vec![engine],
//!     &SamplerConfig::default(),
//!     shutdown.clone(),
//! )?;
//!
//! // on engine close
//! shutdown.cancel();
//! handle.await?;
//! ```

mod config;
mod error;
mod gauges;
mod sampler;

use std::sync::Arc;

use common::{GaugeRegistry, MemoryUsageSource};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use config::{DEFAULT_NAMESPACE, DEFAULT_SAMPLE_INTERVAL, SamplerConfig};
pub use error::{Error, Result};
pub use gauges::{
    CACHE_TOTAL, MEMTABLE_READERS_TOTAL, MEMTABLE_TOTAL, MEMTABLE_UNFLUSHED, MemoryUsageGauges,
};
pub use sampler::MemoryUsageSampler;

/// Registers the memory usage gauges and spawns the sampler.
///
/// Must be called from within a tokio runtime. The sampler runs until
/// `shutdown` is cancelled; the returned handle completes shortly after.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an invalid `config` and
/// [`Error::DuplicateMetric`] if the gauges are already registered. No task
/// is spawned in either case.
pub fn start(
    registry: &mut dyn GaugeRegistry,
    engines: Vec<Arc<dyn MemoryUsageSource>>,
    config: &SamplerConfig,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>> {
    config.validate()?;
    let gauges = MemoryUsageGauges::register(registry, &config.namespace)?;
    tracing::info!(
        namespace = %config.namespace,
        interval = ?config.interval,
        engines = engines.len(),
        "starting storage engine memory usage sampler"
    );
    let sampler = MemoryUsageSampler::new(gauges, engines, config.interval);
    Ok(tokio::spawn(sampler.run(shutdown)))
}

//! Configuration for the memory usage sampler.

use std::time::Duration;

use common::metrics::is_valid_metric_name;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Namespace the memory usage gauges are registered under.
pub const DEFAULT_NAMESPACE: &str = "storage-engine";

/// How often the storage engine is sampled.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for [`start`](crate::start).
///
/// The defaults give the fixed behavior: `storage-engine` namespace, one
/// sample every 60 seconds.
///
/// # Example
///
/// ```ignore
/// let config: SamplerConfig = serde_json::from_str(r#"{"interval": "30s"}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Namespace prefixed to every gauge name.
    pub namespace: String,
    /// Time between two samples. Missed ticks are skipped, not replayed.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::InvalidConfig("namespace must not be empty".to_string()));
        }
        // `-` is normalized to `_` when the gauges are exposed
        if !is_valid_metric_name(&self.namespace.replace('-', "_")) {
            return Err(Error::InvalidConfig(format!(
                "namespace {:?} does not form a valid metric name",
                self.namespace
            )));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "sample interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

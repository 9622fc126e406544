//! Gauge registration against a pull-based metrics registry.
//!
//! Samplers publish engine statistics as gauges that a scraper reads on its
//! own schedule. Registration goes through the [`GaugeRegistry`] trait so
//! the process-wide registry is an explicit collaborator that tests can
//! replace. [`PrometheusRegistry`] is the prometheus-client backed
//! implementation served on `/metrics`.
//!
//! Gauges hold `f64` values in an `AtomicU64`, so every `set()` is a single
//! atomic store and a concurrent scrape never observes a torn value.

use std::collections::HashSet;
use std::sync::atomic::AtomicU64;

use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Floating point gauge shared between a sampler and the registry.
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// Identity and help text of a gauge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaugeDescriptor {
    pub namespace: String,
    pub name: String,
    pub help: String,
}

impl GaugeDescriptor {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            help: help.into(),
        }
    }

    /// Name the gauge is exposed under, e.g. `storage-engine` +
    /// `memory_usage_cache_total` -> `storage_engine_memory_usage_cache_total`.
    pub fn exposition_name(&self) -> String {
        let name = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.namespace, self.name)
        };
        name.replace('-', "_")
    }
}

/// Whether `name` is a valid Prometheus metric name,
/// i.e. matches `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Error type for gauge registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A gauge with the same exposition name is already registered.
    DuplicateMetric { namespace: String, name: String },
    /// The descriptor cannot be registered as given.
    InvalidDescriptor(String),
}

impl std::error::Error for RegistryError {}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateMetric { namespace, name } => {
                write!(f, "Duplicate metric: {}/{} is already registered", namespace, name)
            }
            RegistryError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
        }
    }
}

/// A registry that gauges are registered with exactly once.
pub trait GaugeRegistry {
    /// Registers all `gauges` or none of them.
    ///
    /// Fails with [`RegistryError::DuplicateMetric`] if any exposition name
    /// is already registered or appears twice in `gauges`, and with
    /// [`RegistryError::InvalidDescriptor`] if an exposition name is not a
    /// valid metric name. The existing registration is left untouched.
    fn register_gauges(
        &mut self,
        gauges: Vec<(GaugeDescriptor, FloatGauge)>,
    ) -> Result<(), RegistryError>;
}

/// Checks a batch against already registered names without mutating
/// anything. Returns the exposition names in batch order.
pub fn check_batch(
    registered: &HashSet<String>,
    gauges: &[(GaugeDescriptor, FloatGauge)],
) -> Result<Vec<String>, RegistryError> {
    let mut batch = HashSet::new();
    let mut names = Vec::with_capacity(gauges.len());
    for (descriptor, _) in gauges {
        if descriptor.name.is_empty() {
            return Err(RegistryError::InvalidDescriptor(
                "gauge name must not be empty".to_string(),
            ));
        }
        if descriptor.help.is_empty() {
            return Err(RegistryError::InvalidDescriptor(format!(
                "gauge {} has no help text",
                descriptor.name
            )));
        }
        let name = descriptor.exposition_name();
        if !is_valid_metric_name(&name) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "{:?} is not a valid metric name",
                name
            )));
        }
        if registered.contains(&name) || !batch.insert(name.clone()) {
            return Err(RegistryError::DuplicateMetric {
                namespace: descriptor.namespace.clone(),
                name: descriptor.name.clone(),
            });
        }
        names.push(name);
    }
    Ok(names)
}

/// [`GaugeRegistry`] backed by a prometheus-client [`Registry`].
///
/// prometheus-client accepts the same name twice and would expose both, so
/// registered names are tracked here and collisions rejected up front.
#[derive(Default)]
pub struct PrometheusRegistry {
    registry: Registry,
    registered: HashSet<String>,
}

impl PrometheusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access to the underlying registry for metrics registered elsewhere.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Whether a gauge with this exposition name has been registered.
    pub fn contains(&self, exposition_name: &str) -> bool {
        self.registered.contains(exposition_name)
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl GaugeRegistry for PrometheusRegistry {
    fn register_gauges(
        &mut self,
        gauges: Vec<(GaugeDescriptor, FloatGauge)>,
    ) -> Result<(), RegistryError> {
        let names = check_batch(&self.registered, &gauges)?;
        for (name, (descriptor, gauge)) in names.into_iter().zip(gauges) {
            tracing::debug!(metric = %name, "registering gauge");
            self.registry.register(name.clone(), descriptor.help, gauge);
            self.registered.insert(name);
        }
        Ok(())
    }
}

//! Error types for the memory usage sampler.

use common::{RegistryError, StorageError};

/// Error type for memory usage sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A gauge was registered twice. Startup must abort, this is a wiring bug.
    DuplicateMetric { namespace: String, name: String },

    /// The storage engine failed to report its memory usage. Transient; the
    /// sampler logs it and waits for the next tick.
    SnapshotQuery(String),

    /// Invalid sampler configuration.
    InvalidConfig(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateMetric { namespace, name } => {
                write!(f, "Duplicate metric: {}/{} is already registered", namespace, name)
            }
            Error::SnapshotQuery(msg) => write!(f, "Memory usage query failed: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateMetric { namespace, name } => {
                Error::DuplicateMetric { namespace, name }
            }
            RegistryError::InvalidDescriptor(msg) => Error::InvalidConfig(msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::SnapshotQuery(err.to_string())
    }
}

/// Result type alias for sampler operations.
pub type Result<T> = std::result::Result<T, Error>;

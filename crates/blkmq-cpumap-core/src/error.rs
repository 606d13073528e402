//! Error types for blkmq-cpumap-core.

use thiserror::Error;

/// Errors that can occur while building a CPU to queue map.
#[derive(Debug, Error)]
pub enum Error {
    /// Backing storage for the mapping table could not be obtained.
    #[error("resource exhaustion: cannot allocate table of {requested} entries")]
    ResourceExhaustion {
        /// Number of table entries requested.
        requested: usize,
    },

    /// The topology snapshot or the queue parameters cannot produce a map.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Input data (cpulist, config value) is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error (sysfs or config file access).
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error reports an allocation failure rather than a bad
    /// topology or bad parameters.
    #[must_use]
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::ResourceExhaustion { .. })
    }

    /// Whether this error reports an unusable topology or queue count.
    #[must_use]
    pub fn is_invalid_topology(&self) -> bool {
        matches!(self, Self::InvalidTopology(_))
    }
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Queue set configuration.

use crate::alloc::NumaNode;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/blkmq-cpumap.toml";

/// Parameters of one mapping build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueSetConfig {
    /// Number of hardware dispatch queues.
    pub nr_hw_queues: u32,

    /// Memory-domain hint for the mapping table.
    #[serde(default)]
    pub numa_node: NumaNode,
}

impl QueueSetConfig {
    /// Queue set with `nr_hw_queues` queues and no placement preference.
    #[must_use]
    pub fn new(nr_hw_queues: u32) -> Self {
        Self {
            nr_hw_queues,
            numa_node: NumaNode::ANY,
        }
    }

    /// Prefer `node` for the table.
    #[must_use]
    pub fn with_numa_node(mut self, node: NumaNode) -> Self {
        self.numa_node = node;
        self
    }
}

/// A named queue set, e.g. one per block device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedQueueSet {
    /// Device or queue set name.
    pub name: String,

    /// Build parameters.
    #[serde(flatten)]
    pub queues: QueueSetConfig,
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Sysfs mount point used for topology discovery.
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Queue sets to build maps for.
    #[serde(default)]
    pub queue_sets: Vec<NamedQueueSet>,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            queue_sets: Vec::new(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Look up a queue set by name.
    #[must_use]
    pub fn queue_set(&self, name: &str) -> Option<&NamedQueueSet> {
        self.queue_sets.iter().find(|set| set.name == name)
    }
}

/// Load configuration from `path`, or defaults if the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
    Config::from_toml(&content)
}

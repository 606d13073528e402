//! Backing storage for mapping tables.
//!
//! The assigner never allocates on its own. It asks a [`TableAllocator`]
//! for a zeroed table and passes the caller's NUMA node hint through
//! untouched, so embedders can place the table wherever their readers live.

use crate::{Error, QueueId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque memory-domain hint for table placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumaNode(
    /// Node number; negative means any node.
    pub i32,
);

impl NumaNode {
    /// No placement preference.
    pub const ANY: Self = Self(-1);

    /// Whether a specific node was requested.
    #[must_use]
    pub fn is_specific(self) -> bool {
        self.0 >= 0
    }
}

impl Default for NumaNode {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for NumaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_specific() {
            write!(f, "node{}", self.0)
        } else {
            f.write_str("any")
        }
    }
}

/// Source of zeroed mapping tables.
pub trait TableAllocator {
    /// Allocate `len` zeroed entries, preferably on `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`] if storage cannot be obtained.
    fn alloc_zeroed(&self, len: usize, node: NumaNode) -> Result<Vec<QueueId>>;
}

impl<A: TableAllocator + ?Sized> TableAllocator for &A {
    fn alloc_zeroed(&self, len: usize, node: NumaNode) -> Result<Vec<QueueId>> {
        (**self).alloc_zeroed(len, node)
    }
}

/// Global heap allocator; the node hint is advisory and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl TableAllocator for HeapAllocator {
    fn alloc_zeroed(&self, len: usize, _node: NumaNode) -> Result<Vec<QueueId>> {
        let mut table = Vec::new();
        table
            .try_reserve_exact(len)
            .map_err(|_| Error::ResourceExhaustion { requested: len })?;
        table.resize(len, 0);
        Ok(table)
    }
}

/// Heap allocator that refuses tables longer than a fixed limit.
#[derive(Debug, Clone, Copy)]
pub struct BoundedAllocator {
    max_entries: usize,
}

impl BoundedAllocator {
    /// Refuse tables with more than `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Configured limit.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl TableAllocator for BoundedAllocator {
    fn alloc_zeroed(&self, len: usize, node: NumaNode) -> Result<Vec<QueueId>> {
        if len > self.max_entries {
            tracing::warn!(
                requested = len,
                limit = self.max_entries,
                "Refusing mapping table allocation"
            );
            return Err(Error::ResourceExhaustion { requested: len });
        }
        HeapAllocator.alloc_zeroed(len, node)
    }
}

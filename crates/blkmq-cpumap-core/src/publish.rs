//! Publication of mapping tables to concurrent readers.
//!
//! Readers take an `Arc<QueueMap>` and use it without further locking.
//! A rebuild always fills a fresh table and swaps the pointer afterwards, so
//! a table a reader already holds is never modified.

use crate::alloc::{HeapAllocator, TableAllocator};
use crate::assign::build_queue_map;
use crate::config::QueueSetConfig;
use crate::map::QueueMap;
use crate::topology::CpuTopology;
use crate::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared handle to the current map of one queue set.
pub struct QueueMapHandle<A = HeapAllocator> {
    config: QueueSetConfig,
    allocator: A,
    current: RwLock<Arc<QueueMap>>,
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl QueueMapHandle<HeapAllocator> {
    /// Build the first map for `config` on the heap.
    pub fn build<T: CpuTopology + ?Sized>(topo: &T, config: QueueSetConfig) -> Result<Self> {
        Self::build_with(topo, config, HeapAllocator)
    }
}

impl<A: TableAllocator> QueueMapHandle<A> {
    /// Build the first map for `config` with a custom allocator.
    ///
    /// Nothing is published if the build fails.
    pub fn build_with<T: CpuTopology + ?Sized>(
        topo: &T,
        config: QueueSetConfig,
        allocator: A,
    ) -> Result<Self> {
        let map = build_queue_map(topo, &config, &allocator)?;
        tracing::info!(
            nr_hw_queues = config.nr_hw_queues,
            numa_node = %config.numa_node,
            nr_cpus = map.summary().nr_cpus,
            policy = %map.policy(),
            "Published initial CPU to queue map"
        );
        Ok(Self {
            config,
            allocator,
            current: RwLock::new(Arc::new(map)),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        })
    }

    /// Snapshot of the currently published map.
    #[must_use]
    pub fn current(&self) -> Arc<QueueMap> {
        Arc::clone(&self.current.read())
    }

    /// Queue parameters this handle builds with.
    #[must_use]
    pub fn config(&self) -> QueueSetConfig {
        self.config
    }

    /// Number of maps published so far, starting at 1.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuild from a new topology snapshot, typically after CPU hotplug.
    ///
    /// Concurrent rebuilds are serialized. On error the previously
    /// published map stays current and is returned untouched to readers.
    pub fn rebuild<T: CpuTopology + ?Sized>(&self, topo: &T) -> Result<Arc<QueueMap>> {
        let _guard = self.build_lock.lock();

        let map = match build_queue_map(topo, &self.config, &self.allocator) {
            Ok(map) => Arc::new(map),
            Err(e) => {
                tracing::warn!(error = %e, "CPU to queue map rebuild failed, keeping previous map");
                return Err(e);
            }
        };

        *self.current.write() = Arc::clone(&map);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(
            generation,
            nr_cpus = map.summary().nr_cpus,
            policy = %map.policy(),
            "Published rebuilt CPU to queue map"
        );
        Ok(map)
    }

    /// Queue for `cpu` in the current map.
    #[must_use]
    pub fn queue_for(&self, cpu: usize) -> Option<crate::QueueId> {
        self.current.read().queue_for(cpu)
    }
}

impl<A> std::fmt::Debug for QueueMapHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueMapHandle")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

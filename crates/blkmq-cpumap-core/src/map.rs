//! Immutable CPU to queue mapping tables.

use crate::alloc::NumaNode;
use crate::assign::MapPolicy;
use crate::summary::TopologySummary;
use crate::topology::CpuTopology;
use crate::{CpuId, QueueId};
use serde::Serialize;
use std::fmt;

/// Completed CPU to hardware queue map.
///
/// Entry `cpu` holds the queue that work submitted from `cpu` goes to.
/// Offline CPUs hold `0`, which is a placeholder rather than an assignment.
/// Once built the table never changes; a topology change produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueMap {
    map: Box<[QueueId]>,
    nr_queues: QueueId,
    numa_node: NumaNode,
    summary: TopologySummary,
    policy: MapPolicy,
}

impl QueueMap {
    pub(crate) fn from_parts(
        map: Vec<QueueId>,
        nr_queues: QueueId,
        numa_node: NumaNode,
        summary: TopologySummary,
        policy: MapPolicy,
    ) -> Self {
        Self {
            map: map.into_boxed_slice(),
            nr_queues,
            numa_node,
            summary,
            policy,
        }
    }

    /// Queue for `cpu`, or `None` if `cpu` is not a valid id.
    #[must_use]
    pub fn queue_for(&self, cpu: CpuId) -> Option<QueueId> {
        self.map.get(cpu).copied()
    }

    /// The raw table, indexed by CPU id.
    #[must_use]
    pub fn as_slice(&self) -> &[QueueId] {
        &self.map
    }

    /// Number of entries (CPU ids).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of hardware queues the map was built for.
    #[must_use]
    pub fn nr_queues(&self) -> QueueId {
        self.nr_queues
    }

    /// Placement hint the table was allocated with.
    #[must_use]
    pub fn numa_node(&self) -> NumaNode {
        self.numa_node
    }

    /// CPU counts the map was built from.
    #[must_use]
    pub fn summary(&self) -> TopologySummary {
        self.summary
    }

    /// Assignment rule used.
    #[must_use]
    pub fn policy(&self) -> MapPolicy {
        self.policy
    }

    /// Online CPUs of `topo` that submit to `queue`, ascending.
    pub fn cpus_for_queue<T: CpuTopology + ?Sized>(&self, queue: QueueId, topo: &T) -> Vec<CpuId> {
        self.map
            .iter()
            .enumerate()
            .filter(|&(cpu, &q)| q == queue && topo.is_online(cpu))
            .map(|(cpu, _)| cpu)
            .collect()
    }

    /// Online CPUs per queue, indexed by queue.
    ///
    /// Suitable for pinning one worker per queue to the CPUs feeding it.
    /// Queues at or above the online CPU count can never receive a CPU and
    /// are left out; other queues nothing maps to get an empty list.
    pub fn queue_affinity<T: CpuTopology + ?Sized>(&self, topo: &T) -> Vec<Vec<CpuId>> {
        let len = (self.nr_queues as usize).min(self.summary.nr_cpus);
        let mut per_queue = vec![Vec::new(); len];
        for (cpu, &queue) in self.map.iter().enumerate() {
            if topo.is_online(cpu) {
                if let Some(cpus) = per_queue.get_mut(queue as usize) {
                    cpus.push(cpu);
                }
            }
        }
        per_queue
    }

    /// Operator-facing listing of the online part of the map.
    pub fn show<'a, T: CpuTopology + ?Sized>(&'a self, topo: &'a T) -> ShowMap<'a, T> {
        ShowMap { map: self, topo }
    }
}

/// `Display` adapter printing one `CPU -> Queue` line per online CPU.
pub struct ShowMap<'a, T: ?Sized> {
    map: &'a QueueMap,
    topo: &'a T,
}

impl<T: CpuTopology + ?Sized> fmt::Display for ShowMap<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "blk-mq: CPU -> queue map")?;
        for (cpu, queue) in self.map.map.iter().enumerate() {
            if self.topo.is_online(cpu) {
                writeln!(f, "  CPU{cpu:2} -> Queue {queue}")?;
            }
        }
        Ok(())
    }
}

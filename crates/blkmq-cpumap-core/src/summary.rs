//! Online CPU and physical core counting.

use crate::cpumask::CpuMask;
use crate::topology::CpuTopology;
use serde::Serialize;

/// Counts derived from one pass over the online CPUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TopologySummary {
    /// Number of online CPUs.
    pub nr_cpus: usize,
    /// Number of physical cores with at least one online thread.
    pub nr_uniq_cpus: usize,
}

impl TopologySummary {
    /// Count online CPUs and distinct sibling groups.
    ///
    /// A core is counted the first time one of its threads is visited whose
    /// representative has not been marked yet. Marking the current CPU
    /// rather than the representative is sound because CPUs are visited in
    /// ascending order and an online representative is never larger than its
    /// siblings, so it is always the first member reached. An offline
    /// representative is never marked, and each online thread of its core
    /// counts on its own.
    pub fn collect<T: CpuTopology + ?Sized>(topo: &T) -> Self {
        let n = topo.nr_cpu_ids();
        let mut seen = CpuMask::new(n);
        let mut summary = Self::default();

        for cpu in (0..n).filter(|&cpu| topo.is_online(cpu)) {
            summary.nr_cpus += 1;
            if !seen.test(topo.first_sibling(cpu)) {
                summary.nr_uniq_cpus += 1;
            }
            seen.set(cpu);
        }

        summary
    }

    /// Whether at least one core has more than one online thread.
    #[must_use]
    pub fn has_smt_siblings(&self) -> bool {
        self.nr_cpus != self.nr_uniq_cpus
    }

    /// Whether there is nothing to map.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nr_cpus == 0
    }
}

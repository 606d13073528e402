//! In-memory topology snapshots.

use super::{CpuTopology, MAX_CPU_IDS};
use crate::cpumask::CpuMask;
use crate::{CpuId, Error, Result};

/// How SMT threads are numbered in a synthetic topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtLayout {
    /// Threads of a core have consecutive ids (`0,1` share core 0).
    #[default]
    Adjacent,
    /// First thread of every core, then second thread of every core
    /// (`0,4` share core 0 on a 4-core part), as most x86 firmware does.
    Interleaved,
}

/// Immutable topology snapshot.
///
/// Representatives are the lowest online member of each sibling group, so
/// an online CPU's representative is always online and never larger than
/// the CPU itself. Offline CPUs represent themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTopology {
    possible: CpuMask,
    online: CpuMask,
    representative: Vec<CpuId>,
}

impl StaticTopology {
    /// Start building a topology with `nr_cpu_ids` CPU ids, all possible,
    /// all online and without siblings.
    #[must_use]
    pub fn builder(nr_cpu_ids: usize) -> TopologyBuilder {
        TopologyBuilder::new(nr_cpu_ids)
    }

    /// Synthetic machine with `cores` physical cores of `threads` threads each.
    pub fn uniform(cores: usize, threads: usize, layout: SmtLayout) -> Result<Self> {
        TopologyBuilder::uniform(cores, threads, layout).build()
    }

}

impl CpuTopology for StaticTopology {
    fn nr_cpu_ids(&self) -> usize {
        self.representative.len()
    }

    fn is_possible(&self, cpu: CpuId) -> bool {
        self.possible.test(cpu)
    }

    fn is_online(&self, cpu: CpuId) -> bool {
        self.online.test(cpu)
    }

    fn representative_of(&self, cpu: CpuId) -> CpuId {
        self.representative.get(cpu).copied().unwrap_or(cpu)
    }

    fn nr_online(&self) -> usize {
        self.online.weight()
    }
}

/// Builder for [`StaticTopology`].
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    nr_cpu_ids: usize,
    possible: Option<Vec<CpuId>>,
    online: Option<Vec<CpuId>>,
    offline: Vec<CpuId>,
    groups: Vec<Vec<CpuId>>,
    oversized: Option<(usize, usize)>,
}

impl TopologyBuilder {
    /// All `nr_cpu_ids` CPUs possible and online, no siblings.
    #[must_use]
    pub fn new(nr_cpu_ids: usize) -> Self {
        Self {
            nr_cpu_ids,
            possible: None,
            online: None,
            offline: Vec::new(),
            groups: Vec::new(),
            oversized: None,
        }
    }

    /// `cores` x `threads` machine laid out per `layout`.
    ///
    /// A machine with more than [`MAX_CPU_IDS`] CPUs is reported by
    /// [`build`](Self::build).
    #[must_use]
    pub fn uniform(cores: usize, threads: usize, layout: SmtLayout) -> Self {
        let n = match cores.checked_mul(threads) {
            Some(n) if n <= MAX_CPU_IDS => n,
            _ => {
                let mut builder = Self::new(0);
                builder.oversized = Some((cores, threads));
                return builder;
            }
        };
        let mut builder = Self::new(n);
        if threads > 1 {
            for core in 0..cores {
                let group = (0..threads)
                    .map(|t| match layout {
                        SmtLayout::Adjacent => core * threads + t,
                        SmtLayout::Interleaved => t * cores + core,
                    })
                    .collect();
                builder.groups.push(group);
            }
        }
        builder
    }

    /// Restrict the possible set. Defaults to every id.
    #[must_use]
    pub fn possible(mut self, cpus: &[CpuId]) -> Self {
        self.possible = Some(cpus.to_vec());
        self
    }

    /// Set the online set. Defaults to every possible CPU.
    #[must_use]
    pub fn online(mut self, cpus: &[CpuId]) -> Self {
        self.online = Some(cpus.to_vec());
        self
    }

    /// Take CPUs offline.
    #[must_use]
    pub fn offline(mut self, cpus: &[CpuId]) -> Self {
        self.offline.extend_from_slice(cpus);
        self
    }

    /// Declare CPUs sharing one physical core.
    #[must_use]
    pub fn siblings(mut self, cpus: &[CpuId]) -> Self {
        self.groups.push(cpus.to_vec());
        self
    }

    /// Validate and freeze the topology.
    pub fn build(self) -> Result<StaticTopology> {
        if let Some((cores, threads)) = self.oversized {
            return Err(Error::InvalidTopology(format!(
                "{cores} cores x {threads} threads exceeds {MAX_CPU_IDS} CPU ids"
            )));
        }
        let n = self.nr_cpu_ids;
        if n > MAX_CPU_IDS {
            return Err(Error::InvalidTopology(format!(
                "{n} CPU ids exceeds limit of {MAX_CPU_IDS}"
            )));
        }
        let check = |cpu: CpuId, what: &str| {
            if cpu < n {
                Ok(())
            } else {
                Err(Error::InvalidTopology(format!(
                    "{what} cpu {cpu} out of range (nr_cpu_ids = {n})"
                )))
            }
        };

        let possible = match &self.possible {
            Some(cpus) => {
                for &cpu in cpus {
                    check(cpu, "possible")?;
                }
                CpuMask::from_cpus(n, cpus)
            }
            None => CpuMask::from_cpus(n, &(0..n).collect::<Vec<_>>()),
        };

        let mut online = match &self.online {
            Some(cpus) => {
                for &cpu in cpus {
                    check(cpu, "online")?;
                    if !possible.test(cpu) {
                        return Err(Error::InvalidTopology(format!(
                            "cpu {cpu} is online but not possible"
                        )));
                    }
                }
                CpuMask::from_cpus(n, cpus)
            }
            None => possible.clone(),
        };
        for &cpu in &self.offline {
            check(cpu, "offline")?;
            online.clear(cpu);
        }

        let mut representative: Vec<CpuId> = (0..n).collect();
        let mut grouped = CpuMask::new(n);
        for group in &self.groups {
            for &cpu in group {
                check(cpu, "sibling")?;
                if grouped.test(cpu) {
                    return Err(Error::InvalidTopology(format!(
                        "cpu {cpu} belongs to more than one sibling group"
                    )));
                }
                grouped.set(cpu);
            }
            if let Some(rep) = group.iter().copied().filter(|&c| online.test(c)).min() {
                for &cpu in group.iter().filter(|&&c| online.test(c)) {
                    representative[cpu] = rep;
                }
            }
        }

        Ok(StaticTopology {
            possible,
            online,
            representative,
        })
    }
}

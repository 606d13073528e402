//! Fixed-size CPU bitmask.

use crate::CpuId;

const BITS: usize = u64::BITS as usize;

/// Bitset over CPU ids `[0, nr_cpu_ids)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMask {
    words: Vec<u64>,
    nr_cpu_ids: usize,
}

impl CpuMask {
    /// Create an empty mask able to hold `nr_cpu_ids` CPUs.
    #[must_use]
    pub fn new(nr_cpu_ids: usize) -> Self {
        Self {
            words: vec![0; nr_cpu_ids.div_ceil(BITS)],
            nr_cpu_ids,
        }
    }

    /// Create a mask with the given CPUs set. Out-of-range ids are ignored.
    #[must_use]
    pub fn from_cpus(nr_cpu_ids: usize, cpus: &[CpuId]) -> Self {
        let mut mask = Self::new(nr_cpu_ids);
        for &cpu in cpus {
            mask.set(cpu);
        }
        mask
    }

    /// Mark `cpu`. Ids outside the mask are ignored.
    pub fn set(&mut self, cpu: CpuId) {
        if cpu < self.nr_cpu_ids {
            self.words[cpu / BITS] |= 1 << (cpu % BITS);
        }
    }

    /// Unmark `cpu`.
    pub fn clear(&mut self, cpu: CpuId) {
        if cpu < self.nr_cpu_ids {
            self.words[cpu / BITS] &= !(1 << (cpu % BITS));
        }
    }

    /// Whether `cpu` is marked. Out-of-range ids are never marked.
    #[must_use]
    pub fn test(&self, cpu: CpuId) -> bool {
        cpu < self.nr_cpu_ids && self.words[cpu / BITS] & (1 << (cpu % BITS)) != 0
    }

    /// Number of marked CPUs.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

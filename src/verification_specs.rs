//! Formal Verification Specifications for blkmq-cpumap
//!
//! Design-by-contract specifications using Verus-style pre/postconditions,
//! with executable checks usable from tests.
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::verification_specs::partition_contracts;
//! assert!(partition_contracts::in_range(5, 2, 4));
//! ```
//!
//! ```rust,ignore
//! use crate::verification_specs::map_contracts;
//! assert!(map_contracts::holds(&map, &topo));
//! ```

/// Partition helper invariants
///
/// #[requires(total > 0 && nr_queues > 0)]
/// #[ensures(k < total ==> result < nr_queues)]
/// #[ensures(k1 <= k2 ==> result(k1) <= result(k2))]
pub mod partition_contracts {
    use blkmq_cpumap_core::{cpu_to_queue_index, QueueId};

    /// #[requires(total > 0 && nr_queues > 0 && k < total)]
    /// #[ensures(result == true)]
    #[must_use]
    pub fn in_range(total: usize, nr_queues: QueueId, k: usize) -> bool {
        cpu_to_queue_index(total, nr_queues, k) < nr_queues
    }

    /// #[requires(total > 0 && nr_queues > 0)]
    /// #[ensures(result == true)]
    /// #[decreases(total - k)]
    #[must_use]
    pub fn monotonic_and_contiguous(total: usize, nr_queues: QueueId) -> bool {
        (1..total).all(|k| {
            let prev = cpu_to_queue_index(total, nr_queues, k - 1);
            let next = cpu_to_queue_index(total, nr_queues, k);
            next == prev || next == prev + 1
        })
    }
}

/// Mapping table invariants
///
/// #[invariant(forall cpu: online(cpu) ==> map[cpu] < nr_queues)]
/// #[invariant(forall cpu: !online(cpu) ==> map[cpu] == 0)]
/// #[invariant(forall cpu: grouped && online(rep(cpu)) ==> map[cpu] == map[rep(cpu)])]
pub mod map_contracts {
    use blkmq_cpumap_core::{CpuTopology, MapPolicy, QueueMap};

    /// #[ensures(result == true ==> map.len() == topo.nr_cpu_ids())]
    #[must_use]
    pub fn covers_every_cpu<T: CpuTopology + ?Sized>(map: &QueueMap, topo: &T) -> bool {
        map.len() == topo.nr_cpu_ids()
    }

    /// #[ensures(result == true ==> forall cpu: online(cpu) ==> map[cpu] < nr_queues)]
    #[must_use]
    pub fn online_in_range<T: CpuTopology + ?Sized>(map: &QueueMap, topo: &T) -> bool {
        map.as_slice()
            .iter()
            .enumerate()
            .all(|(cpu, &q)| !topo.is_online(cpu) || q < map.nr_queues())
    }

    /// #[ensures(result == true ==> forall cpu: !online(cpu) ==> map[cpu] == 0)]
    #[must_use]
    pub fn offline_is_sentinel<T: CpuTopology + ?Sized>(map: &QueueMap, topo: &T) -> bool {
        map.as_slice()
            .iter()
            .enumerate()
            .all(|(cpu, &q)| topo.is_online(cpu) || q == 0)
    }

    /// #[requires(map.policy() == SiblingGrouped)]
    /// #[ensures(result == true ==> siblings share a queue)]
    #[must_use]
    pub fn siblings_share_queue<T: CpuTopology + ?Sized>(map: &QueueMap, topo: &T) -> bool {
        if map.policy() != MapPolicy::SiblingGrouped {
            return true;
        }
        (0..map.len()).filter(|&cpu| topo.is_online(cpu)).all(|cpu| {
            let rep = topo.first_sibling(cpu);
            !topo.is_online(rep) || map.queue_for(cpu) == map.queue_for(rep)
        })
    }

    /// All table invariants at once.
    #[must_use]
    pub fn holds<T: CpuTopology + ?Sized>(map: &QueueMap, topo: &T) -> bool {
        covers_every_cpu(map, topo)
            && online_in_range(map, topo)
            && offline_is_sentinel(map, topo)
            && siblings_share_queue(map, topo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blkmq_cpumap_core::topology::{SmtLayout, StaticTopology};
    use blkmq_cpumap_core::{build_queue_map, HeapAllocator, QueueSetConfig};

    #[test]
    fn test_partition_in_range() {
        assert!(partition_contracts::in_range(5, 2, 4));
        assert!(partition_contracts::in_range(1, 1, 0));
        assert!(partition_contracts::in_range(3, 64, 2));
    }

    #[test]
    fn test_partition_monotonic() {
        for total in 1..64 {
            for nr_queues in 1..16 {
                assert!(partition_contracts::monotonic_and_contiguous(total, nr_queues));
            }
        }
    }

    #[test]
    fn test_map_contracts_hold() {
        let topo = StaticTopology::uniform(4, 2, SmtLayout::Interleaved).unwrap();
        let map = build_queue_map(&topo, &QueueSetConfig::new(3), &HeapAllocator).unwrap();
        assert!(map_contracts::holds(&map, &topo));
    }

    #[test]
    fn test_map_contracts_detect_foreign_topology() {
        let topo = StaticTopology::builder(4).build().unwrap();
        let map = build_queue_map(&topo, &QueueSetConfig::new(4), &HeapAllocator).unwrap();
        let bigger = StaticTopology::builder(8).build().unwrap();
        assert!(!map_contracts::covers_every_cpu(&map, &bigger));
    }
}

// ─── Kani Proof Stubs ────────────────────────────────────────────
// Model-checking proofs for critical invariants
// Requires: cargo install --locked kani-verifier

#[cfg(kani)]
mod kani_proofs {
    use blkmq_cpumap_core::cpu_to_queue_index;

    #[kani::proof]
    fn verify_partition_in_range() {
        let total: usize = kani::any();
        let nr_queues: u32 = kani::any();
        let k: usize = kani::any();
        kani::assume(total > 0 && total <= 4096);
        kani::assume(nr_queues > 0 && nr_queues <= 1024);
        kani::assume(k < total);
        assert!(cpu_to_queue_index(total, nr_queues, k) < nr_queues);
    }

    #[kani::proof]
    fn verify_block_size_nonzero() {
        let total: usize = kani::any();
        let nr_queues: usize = kani::any();
        kani::assume(total > 0 && total <= 4096);
        kani::assume(nr_queues > 0 && nr_queues <= 1024);
        assert!(total.div_ceil(nr_queues) > 0);
    }
}

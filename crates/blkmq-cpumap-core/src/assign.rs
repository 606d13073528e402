//! CPU to hardware queue assignment.
//!
//! Every CPU id is visited once in ascending order while a running counter
//! `k` numbers the CPUs (or cores) that receive a fresh assignment:
//!
//! ```text
//! offline cpu            -> 0                      (k unchanged)
//! Sequential             -> k / ceil(nr_cpus / Q)  (k += 1)
//! SiblingGrouped, rep    -> k / ceil(nr_uniq / Q)  (k += 1)
//! SiblingGrouped, thread -> map[rep]
//! ```
//!
//! Sibling grouping only kicks in when there are fewer queues than online
//! CPUs and at least one core has several online threads; otherwise CPUs
//! are dealt out in contiguous near-equal blocks.

use crate::alloc::TableAllocator;
use crate::config::QueueSetConfig;
use crate::map::QueueMap;
use crate::summary::TopologySummary;
use crate::topology::CpuTopology;
use crate::{Error, QueueId, Result};
use serde::Serialize;
use std::fmt;

/// Which assignment rule a build used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapPolicy {
    /// One-to-one, or contiguous blocks of CPUs per queue.
    Sequential,
    /// Contiguous blocks of cores per queue; threads follow their core.
    SiblingGrouped,
}

impl MapPolicy {
    /// Pick the policy for `summary` and `nr_queues`.
    #[must_use]
    pub fn select(summary: &TopologySummary, nr_queues: QueueId) -> Self {
        if nr_queues as usize >= summary.nr_cpus || !summary.has_smt_siblings() {
            Self::Sequential
        } else {
            Self::SiblingGrouped
        }
    }
}

impl fmt::Display for MapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::SiblingGrouped => f.write_str("sibling-grouped"),
        }
    }
}

/// Bucket of the `k`-th of `total` items split into `nr_queues` contiguous
/// blocks of `ceil(total / nr_queues)` items.
///
/// `nr_queues` and `total` must be non-zero. The result is below
/// `nr_queues` whenever `k < total`.
#[must_use]
pub fn cpu_to_queue_index(total: usize, nr_queues: QueueId, k: usize) -> QueueId {
    let per_queue = total.div_ceil(nr_queues as usize);
    // per_queue >= 1 and k < total keep the quotient below nr_queues
    (k / per_queue) as QueueId
}

/// Fill `map` with the queue of every CPU id of `topo`.
///
/// Preconditions are checked before any entry is written: at least one
/// queue, at least one online CPU, room for every CPU id, and no online
/// CPU's representative above the CPU. On error `map` is left untouched.
/// Entries past `nr_cpu_ids` are not touched either.
///
/// An online CPU whose representative is offline leads its own group, the
/// same way the summarizer counts it.
pub fn update_queue_map<T: CpuTopology + ?Sized>(
    map: &mut [QueueId],
    nr_queues: QueueId,
    topo: &T,
) -> Result<(TopologySummary, MapPolicy)> {
    let n = topo.nr_cpu_ids();
    let summary = TopologySummary::collect(topo);
    validate(topo, &summary, nr_queues, map.len())?;

    let policy = MapPolicy::select(&summary, nr_queues);
    let mut k = 0;
    for cpu in 0..n {
        if !topo.is_online(cpu) {
            map[cpu] = 0;
            continue;
        }

        match policy {
            MapPolicy::Sequential => {
                map[cpu] = cpu_to_queue_index(summary.nr_cpus, nr_queues, k);
                k += 1;
            }
            MapPolicy::SiblingGrouped => {
                let first = topo.first_sibling(cpu);
                if first == cpu || !topo.is_online(first) {
                    map[cpu] = cpu_to_queue_index(summary.nr_uniq_cpus, nr_queues, k);
                    k += 1;
                } else {
                    map[cpu] = map[first];
                }
            }
        }
    }

    tracing::debug!(
        nr_cpu_ids = n,
        nr_cpus = summary.nr_cpus,
        nr_uniq_cpus = summary.nr_uniq_cpus,
        nr_queues,
        %policy,
        "Updated CPU to queue map"
    );

    Ok((summary, policy))
}

fn validate<T: CpuTopology + ?Sized>(
    topo: &T,
    summary: &TopologySummary,
    nr_queues: QueueId,
    map_len: usize,
) -> Result<()> {
    if nr_queues == 0 {
        return Err(Error::InvalidTopology(
            "queue set has zero hardware queues".to_string(),
        ));
    }
    if summary.is_empty() {
        return Err(Error::InvalidTopology("no online CPUs".to_string()));
    }

    let n = topo.nr_cpu_ids();
    if map_len < n {
        return Err(Error::InvalidTopology(format!(
            "map has {map_len} entries but topology has {n} CPU ids"
        )));
    }

    for cpu in (0..n).filter(|&cpu| topo.is_online(cpu)) {
        let rep = topo.first_sibling(cpu);
        if rep > cpu {
            return Err(Error::InvalidTopology(format!(
                "cpu {cpu}: representative {rep} is not the lowest sibling"
            )));
        }
    }

    Ok(())
}

/// Allocate and fill a complete map for `config` from a topology snapshot.
///
/// The table is only handed out once every entry is written; allocation
/// failures surface as [`Error::ResourceExhaustion`] and invalid parameters
/// as [`Error::InvalidTopology`].
pub fn build_queue_map<T, A>(topo: &T, config: &QueueSetConfig, allocator: &A) -> Result<QueueMap>
where
    T: CpuTopology + ?Sized,
    A: TableAllocator + ?Sized,
{
    let mut table = allocator.alloc_zeroed(topo.nr_cpu_ids(), config.numa_node)?;
    let (summary, policy) = update_queue_map(&mut table, config.nr_hw_queues, topo)?;
    Ok(QueueMap::from_parts(
        table,
        config.nr_hw_queues,
        config.numa_node,
        summary,
        policy,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{BoundedAllocator, HeapAllocator, NumaNode};
    use crate::topology::{SmtLayout, StaticTopology, TopologyBuilder};

    fn map_for(topo: &StaticTopology, nr_queues: QueueId) -> Vec<QueueId> {
        let mut map = vec![0; topo.nr_cpu_ids()];
        update_queue_map(&mut map, nr_queues, topo).unwrap();
        map
    }

    #[test]
    fn test_cpu_to_queue_index() {
        assert_eq!(cpu_to_queue_index(4, 4, 0), 0);
        assert_eq!(cpu_to_queue_index(4, 4, 3), 3);
        assert_eq!(cpu_to_queue_index(5, 2, 2), 0);
        assert_eq!(cpu_to_queue_index(5, 2, 3), 1);
        assert_eq!(cpu_to_queue_index(3, 8, 2), 2);
        assert_eq!(cpu_to_queue_index(7, 1, 6), 0);
    }

    #[test]
    fn test_cpu_to_queue_index_stays_in_range() {
        for total in 1..40 {
            for nr_queues in 1..12 {
                for k in 0..total {
                    assert!(cpu_to_queue_index(total, nr_queues, k) < nr_queues);
                }
            }
        }
    }

    #[test]
    fn test_policy_selection() {
        let smt = TopologySummary {
            nr_cpus: 8,
            nr_uniq_cpus: 4,
        };
        let flat = TopologySummary {
            nr_cpus: 8,
            nr_uniq_cpus: 8,
        };
        assert_eq!(MapPolicy::select(&smt, 2), MapPolicy::SiblingGrouped);
        assert_eq!(MapPolicy::select(&smt, 8), MapPolicy::Sequential);
        assert_eq!(MapPolicy::select(&smt, 16), MapPolicy::Sequential);
        assert_eq!(MapPolicy::select(&flat, 2), MapPolicy::Sequential);
    }

    #[test]
    fn test_one_to_one() {
        let topo = StaticTopology::builder(4).build().unwrap();
        assert_eq!(map_for(&topo, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_more_queues_than_cpus() {
        let topo = StaticTopology::builder(3).build().unwrap();
        assert_eq!(map_for(&topo, 8), vec![0, 1, 2]);
    }

    #[test]
    fn test_contiguous_blocks() {
        let topo = StaticTopology::builder(5).build().unwrap();
        assert_eq!(map_for(&topo, 2), vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_two_cores_two_threads_two_queues() {
        let topo = StaticTopology::uniform(2, 2, SmtLayout::Adjacent).unwrap();
        let mut map = vec![0; 4];
        let (summary, policy) = update_queue_map(&mut map, 2, &topo).unwrap();
        assert_eq!(summary.nr_uniq_cpus, 2);
        assert_eq!(policy, MapPolicy::SiblingGrouped);
        assert_eq!(map, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_two_cores_two_threads_one_queue() {
        let topo = StaticTopology::uniform(2, 2, SmtLayout::Adjacent).unwrap();
        assert_eq!(map_for(&topo, 1), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_interleaved_siblings_share_queue() {
        let topo = StaticTopology::uniform(4, 2, SmtLayout::Interleaved).unwrap();
        let map = map_for(&topo, 2);
        assert_eq!(map, vec![0, 0, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_offline_cpus_get_sentinel() {
        let topo = StaticTopology::builder(6).offline(&[1, 4]).build().unwrap();
        let map = map_for(&topo, 2);
        assert_eq!(map, vec![0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_offline_entries_overwritten_with_zero() {
        let topo = StaticTopology::builder(4).offline(&[2]).build().unwrap();
        let mut map = vec![7; 4];
        update_queue_map(&mut map, 4, &topo).unwrap();
        assert_eq!(map[2], 0);
    }

    #[test]
    fn test_partially_offline_core() {
        let topo = TopologyBuilder::uniform(3, 2, SmtLayout::Adjacent)
            .offline(&[0])
            .build()
            .unwrap();
        // cores {1}, {2,3}, {4,5} split two and one over the queues
        assert_eq!(map_for(&topo, 2), vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_zero_queues_rejected() {
        let topo = StaticTopology::builder(4).build().unwrap();
        let mut map = vec![9; 4];
        let err = update_queue_map(&mut map, 0, &topo).unwrap_err();
        assert!(err.is_invalid_topology());
        assert_eq!(map, vec![9; 4]);
    }

    #[test]
    fn test_no_online_cpus_rejected() {
        let topo = StaticTopology::builder(4).online(&[]).build().unwrap();
        let mut map = vec![9; 4];
        let err = update_queue_map(&mut map, 2, &topo).unwrap_err();
        assert!(err.to_string().contains("no online CPUs"));
        assert_eq!(map, vec![9; 4]);
    }

    #[test]
    fn test_short_map_rejected() {
        let topo = StaticTopology::builder(4).build().unwrap();
        let mut map = vec![0; 3];
        assert!(update_queue_map(&mut map, 2, &topo).is_err());
    }

    struct HighRepTopology;

    impl CpuTopology for HighRepTopology {
        fn nr_cpu_ids(&self) -> usize {
            4
        }
        fn is_possible(&self, _cpu: usize) -> bool {
            true
        }
        fn is_online(&self, _cpu: usize) -> bool {
            true
        }
        fn representative_of(&self, cpu: usize) -> usize {
            // pairs {0,1} and {2,3}, represented by their highest member
            cpu | 1
        }
    }

    #[test]
    fn test_non_minimal_representative_rejected() {
        let mut map = vec![0; 4];
        let err = update_queue_map(&mut map, 2, &HighRepTopology).unwrap_err();
        assert!(err.to_string().contains("not the lowest sibling"));
    }

    struct OutOfRangeRepTopology;

    impl CpuTopology for OutOfRangeRepTopology {
        fn nr_cpu_ids(&self) -> usize {
            3
        }
        fn is_possible(&self, _cpu: usize) -> bool {
            true
        }
        fn is_online(&self, _cpu: usize) -> bool {
            true
        }
        fn representative_of(&self, _cpu: usize) -> usize {
            usize::MAX
        }
    }

    #[test]
    fn test_out_of_range_representative_falls_back_to_self() {
        let mut map = vec![0; 3];
        let (summary, _) = update_queue_map(&mut map, 3, &OutOfRangeRepTopology).unwrap();
        assert_eq!(summary.nr_uniq_cpus, 3);
        assert_eq!(map, vec![0, 1, 2]);
    }

    /// Cores of `threads` adjacent ids whose lowest thread is offline.
    struct OfflineRepTopology {
        nr_cpu_ids: usize,
        threads: usize,
    }

    impl CpuTopology for OfflineRepTopology {
        fn nr_cpu_ids(&self) -> usize {
            self.nr_cpu_ids
        }
        fn is_possible(&self, cpu: usize) -> bool {
            cpu < self.nr_cpu_ids
        }
        fn is_online(&self, cpu: usize) -> bool {
            cpu != 0 && cpu < self.nr_cpu_ids
        }
        fn representative_of(&self, cpu: usize) -> usize {
            cpu - cpu % self.threads
        }
    }

    #[test]
    fn test_offline_representative_leads_own_group() {
        let topo = OfflineRepTopology {
            nr_cpu_ids: 4,
            threads: 2,
        };
        let mut map = vec![9; 4];
        let (summary, policy) = update_queue_map(&mut map, 2, &topo).unwrap();
        assert_eq!(summary.nr_cpus, 3);
        assert_eq!(summary.nr_uniq_cpus, 2);
        assert_eq!(policy, MapPolicy::SiblingGrouped);
        assert_eq!(map, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_offline_representative_of_wide_core() {
        // core {0,1,2} with cpu 0 offline counts 1 and 2 separately
        let topo = OfflineRepTopology {
            nr_cpu_ids: 6,
            threads: 3,
        };
        let map = build_queue_map(&topo, &QueueSetConfig::new(2), &HeapAllocator).unwrap();
        assert_eq!(map.summary().nr_uniq_cpus, 3);
        assert_eq!(map.as_slice(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_build_queue_map() {
        let topo = StaticTopology::uniform(2, 2, SmtLayout::Adjacent).unwrap();
        let config = QueueSetConfig::new(2).with_numa_node(NumaNode(1));
        let map = build_queue_map(&topo, &config, &HeapAllocator).unwrap();
        assert_eq!(map.as_slice(), &[0, 0, 1, 1]);
        assert_eq!(map.nr_queues(), 2);
        assert_eq!(map.numa_node(), NumaNode(1));
        assert_eq!(map.policy(), MapPolicy::SiblingGrouped);
    }

    #[test]
    fn test_build_queue_map_allocation_failure() {
        let topo = StaticTopology::builder(16).build().unwrap();
        let err = build_queue_map(&topo, &QueueSetConfig::new(4), &BoundedAllocator::new(8))
            .unwrap_err();
        assert!(err.is_resource_exhaustion());
    }

    #[test]
    fn test_build_is_idempotent() {
        let topo = StaticTopology::uniform(6, 2, SmtLayout::Interleaved).unwrap();
        let config = QueueSetConfig::new(4);
        let a = build_queue_map(&topo, &config, &HeapAllocator).unwrap();
        let b = build_queue_map(&topo, &config, &HeapAllocator).unwrap();
        assert_eq!(a, b);
    }
}

//! CPU topology views.
//!
//! The mapping algorithm only ever sees a [`CpuTopology`]: which CPU ids
//! exist, which are online, and which CPU represents each SMT sibling group.
//! How that information is discovered is up to the implementation:
//!
//! - [`StaticTopology`] is an immutable in-memory snapshot, built by hand
//!   with [`TopologyBuilder`].
//! - [`SysfsTopology`] reads `/sys/devices/system/cpu` once and hands back a
//!   [`StaticTopology`], so a build never observes a CPU going on- or
//!   offline halfway through.

mod static_topology;
mod sysfs;

pub use static_topology::{SmtLayout, StaticTopology, TopologyBuilder};
pub use sysfs::SysfsTopology;

use crate::{CpuId, Error, Result};

/// Largest number of CPU ids a topology may describe.
///
/// Matches the biggest `NR_CPUS` the kernel can be configured with.
pub const MAX_CPU_IDS: usize = 8192;

/// Read-only topology capability consumed by the summarizer and assigner.
pub trait CpuTopology {
    /// Number of CPU ids, `N`. Valid ids are `[0, N)`.
    fn nr_cpu_ids(&self) -> usize;

    /// Whether `cpu` can ever be brought online on this machine.
    fn is_possible(&self, cpu: CpuId) -> bool;

    /// Whether `cpu` is currently schedulable. Only possible CPUs may be
    /// reported online.
    fn is_online(&self, cpu: CpuId) -> bool;

    /// First thread sibling of `cpu`.
    ///
    /// A CPU without siblings is its own representative.
    fn representative_of(&self, cpu: CpuId) -> CpuId;

    /// Representative of `cpu`, falling back to `cpu` itself when the
    /// reported representative is not a valid id.
    fn first_sibling(&self, cpu: CpuId) -> CpuId {
        let rep = self.representative_of(cpu);
        if rep < self.nr_cpu_ids() {
            rep
        } else {
            cpu
        }
    }

    /// Number of online CPUs.
    fn nr_online(&self) -> usize {
        (0..self.nr_cpu_ids()).filter(|&cpu| self.is_online(cpu)).count()
    }
}

impl<T: CpuTopology + ?Sized> CpuTopology for &T {
    fn nr_cpu_ids(&self) -> usize {
        (**self).nr_cpu_ids()
    }

    fn is_possible(&self, cpu: CpuId) -> bool {
        (**self).is_possible(cpu)
    }

    fn is_online(&self, cpu: CpuId) -> bool {
        (**self).is_online(cpu)
    }

    fn representative_of(&self, cpu: CpuId) -> CpuId {
        (**self).representative_of(cpu)
    }
}

/// Parse a kernel cpulist such as `0-3,8,10-11`.
///
/// Whitespace around the list and around entries is ignored; an empty list
/// yields no CPUs. The result is sorted and deduplicated. Ids at or above
/// [`MAX_CPU_IDS`] are rejected before any range is expanded.
pub fn parse_cpulist(list: &str) -> Result<Vec<CpuId>> {
    let list = list.trim();
    let mut cpus = Vec::new();
    if list.is_empty() {
        return Ok(cpus);
    }

    for entry in list.split(',') {
        let entry = entry.trim();
        if let Some((lo, hi)) = entry.split_once('-') {
            let lo = parse_cpu(lo)?;
            let hi = parse_cpu(hi)?;
            if lo > hi {
                return Err(Error::InvalidInput(format!(
                    "descending cpulist range: {entry}"
                )));
            }
            cpus.extend(lo..=hi);
        } else {
            cpus.push(parse_cpu(entry)?);
        }
    }

    cpus.sort_unstable();
    cpus.dedup();
    Ok(cpus)
}

fn parse_cpu(s: &str) -> Result<CpuId> {
    let cpu: CpuId = s
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid cpu id in cpulist: {s:?}")))?;
    if cpu >= MAX_CPU_IDS {
        return Err(Error::InvalidInput(format!(
            "cpu id {cpu} in cpulist exceeds limit of {MAX_CPU_IDS}"
        )));
    }
    Ok(cpu)
}

/// Format CPU ids as a kernel cpulist, collapsing consecutive runs.
pub fn format_cpulist(cpus: &[CpuId]) -> String {
    let mut sorted = cpus.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    parts.join(",")
}

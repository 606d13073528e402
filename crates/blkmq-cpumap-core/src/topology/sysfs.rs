//! Topology discovery from sysfs.

use super::{parse_cpulist, StaticTopology, TopologyBuilder};
use crate::{CpuId, Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Reads CPU topology from `<root>/devices/system/cpu`.
#[derive(Debug, Clone)]
pub struct SysfsTopology {
    root: PathBuf,
}

impl Default for SysfsTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsTopology {
    /// Topology of the running machine (`/sys`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("/sys")
    }

    /// Topology below an alternative sysfs mount.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn cpu_dir(&self) -> PathBuf {
        self.root.join("devices/system/cpu")
    }

    /// Whether the cpu directory exists under the configured root.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.cpu_dir().join("possible").exists()
    }

    /// Read the current topology into an immutable snapshot.
    ///
    /// CPUs without a readable `thread_siblings_list` (offline CPUs do not
    /// expose one) are treated as having no siblings. Siblings that are not
    /// online are dropped from the groups.
    pub fn snapshot(&self) -> Result<StaticTopology> {
        let cpu_dir = self.cpu_dir();
        let possible = read_cpulist(&cpu_dir.join("possible"))?;
        let online = read_cpulist(&cpu_dir.join("online"))?;

        let Some(&max) = possible.last() else {
            return Err(Error::InvalidTopology(format!(
                "{} lists no possible CPUs",
                cpu_dir.display()
            )));
        };
        let nr_cpu_ids = max + 1;

        let mut groups: BTreeSet<Vec<CpuId>> = BTreeSet::new();
        for &cpu in &online {
            let path = cpu_dir.join(format!("cpu{cpu}/topology/thread_siblings_list"));
            if !path.exists() {
                continue;
            }
            let mut siblings: Vec<CpuId> = read_cpulist(&path)?
                .into_iter()
                .filter(|c| online.binary_search(c).is_ok())
                .collect();
            if !siblings.contains(&cpu) {
                siblings.push(cpu);
                siblings.sort_unstable();
            }
            if siblings.len() > 1 {
                groups.insert(siblings);
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            nr_cpu_ids,
            online = online.len(),
            smt_groups = groups.len(),
            "Read CPU topology from sysfs"
        );

        let mut builder = TopologyBuilder::new(nr_cpu_ids)
            .possible(&possible)
            .online(&online);
        for group in &groups {
            builder = builder.siblings(group);
        }
        builder.build()
    }
}

fn read_cpulist(path: &Path) -> Result<Vec<CpuId>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
    parse_cpulist(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::CpuTopology;
    use std::fs;

    fn write_cpu_tree(root: &Path, possible: &str, online: &str, siblings: &[(usize, &str)]) {
        let cpu_dir = root.join("devices/system/cpu");
        fs::create_dir_all(&cpu_dir).unwrap();
        fs::write(cpu_dir.join("possible"), format!("{possible}\n")).unwrap();
        fs::write(cpu_dir.join("online"), format!("{online}\n")).unwrap();
        for (cpu, list) in siblings {
            let topo_dir = cpu_dir.join(format!("cpu{cpu}/topology"));
            fs::create_dir_all(&topo_dir).unwrap();
            fs::write(topo_dir.join("thread_siblings_list"), format!("{list}\n")).unwrap();
        }
    }

    #[test]
    fn test_snapshot_two_cores_two_threads() {
        let dir = tempfile::tempdir().unwrap();
        write_cpu_tree(
            dir.path(),
            "0-3",
            "0-3",
            &[(0, "0-1"), (1, "0-1"), (2, "2-3"), (3, "2-3")],
        );

        let topo = SysfsTopology::with_root(dir.path()).snapshot().unwrap();
        assert_eq!(topo.nr_cpu_ids(), 4);
        assert_eq!(topo.nr_online(), 4);
        assert_eq!(topo.representative_of(1), 0);
        assert_eq!(topo.representative_of(3), 2);
    }

    #[test]
    fn test_snapshot_offline_cpu_without_topology_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_cpu_tree(
            dir.path(),
            "0-3",
            "0-2",
            &[(0, "0,2"), (1, "1"), (2, "0,2")],
        );

        let topo = SysfsTopology::with_root(dir.path()).snapshot().unwrap();
        assert!(!topo.is_online(3));
        assert!(topo.is_possible(3));
        assert_eq!(topo.representative_of(2), 0);
        assert_eq!(topo.representative_of(1), 1);
        assert_eq!(topo.representative_of(3), 3);
    }

    #[test]
    fn test_snapshot_drops_offline_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write_cpu_tree(dir.path(), "0-3", "1-3", &[(1, "0-1"), (2, "2-3"), (3, "2-3")]);

        let topo = SysfsTopology::with_root(dir.path()).snapshot().unwrap();
        assert_eq!(topo.representative_of(1), 1);
        assert_eq!(topo.representative_of(3), 2);
    }

    #[test]
    fn test_snapshot_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let sysfs = SysfsTopology::with_root(dir.path().join("nope"));
        assert!(!sysfs.is_available());
        let err = sysfs.snapshot().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_snapshot_malformed_online() {
        let dir = tempfile::tempdir().unwrap();
        write_cpu_tree(dir.path(), "0-3", "zero", &[]);
        let err = SysfsTopology::with_root(dir.path()).snapshot().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_snapshot_empty_possible() {
        let dir = tempfile::tempdir().unwrap();
        write_cpu_tree(dir.path(), "", "", &[]);
        let err = SysfsTopology::with_root(dir.path()).snapshot().unwrap_err();
        assert!(err.is_invalid_topology());
    }

    #[test]
    fn test_live_sysfs() {
        let sysfs = SysfsTopology::new();
        if !sysfs.is_available() {
            eprintln!("Skipping: no sysfs cpu topology");
            return;
        }
        let Ok(topo) = sysfs.snapshot() else {
            eprintln!("Skipping: unreadable sysfs cpu topology");
            return;
        };
        assert!(topo.nr_online() > 0);
        assert!((0..topo.nr_cpu_ids())
            .filter(|&cpu| topo.is_online(cpu))
            .all(|cpu| topo.is_possible(cpu)));
    }
}

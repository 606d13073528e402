//! Show command for the running machine.

use crate::output::{print_map, OutputFormat};
use blkmq_cpumap_core::topology::SysfsTopology;
use blkmq_cpumap_core::{build_queue_map, CpuTopology, HeapAllocator, NumaNode, QueueSetConfig};
use clap::Args;
use std::path::PathBuf;

/// Arguments for show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Number of hardware queues.
    #[arg(short, long)]
    pub queues: u32,

    /// NUMA node to place the table on (-1 for any).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub node: i32,

    /// Sysfs mount point.
    #[arg(long, default_value = "/sys")]
    pub sysfs_root: PathBuf,
}

/// Build and print the map for the live CPU topology.
pub fn show(args: &ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let topo = SysfsTopology::with_root(&args.sysfs_root).snapshot()?;
    let config = QueueSetConfig::new(args.queues).with_numa_node(NumaNode(args.node));

    tracing::info!(
        sysfs_root = %args.sysfs_root.display(),
        nr_cpu_ids = topo.nr_cpu_ids(),
        nr_online = topo.nr_online(),
        nr_hw_queues = args.queues,
        "Building CPU to queue map"
    );

    let map = build_queue_map(&topo, &config, &HeapAllocator)?;
    print_map(None, &map, &topo, format)
}

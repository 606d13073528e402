//! Route command - which queue a CPU submits to.

use crate::output::OutputFormat;
use anyhow::Context;
use blkmq_cpumap_core::topology::SysfsTopology;
use blkmq_cpumap_core::{build_queue_map, CpuId, CpuTopology, HeapAllocator, QueueSetConfig};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for route command.
#[derive(Args)]
pub struct RouteArgs {
    /// Number of hardware queues.
    #[arg(short, long)]
    pub queues: u32,

    /// CPU to look up (defaults to the CPU this command runs on).
    #[arg(long)]
    pub cpu: Option<CpuId>,

    /// Sysfs mount point.
    #[arg(long, default_value = "/sys")]
    pub sysfs_root: PathBuf,
}

#[derive(Debug, Serialize)]
struct RouteOutput {
    cpu: CpuId,
    queue: u32,
    online: bool,
}

/// Print the queue `args.cpu` is routed to.
pub fn route(args: &RouteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let cpu = match args.cpu {
        Some(cpu) => cpu,
        None => current_cpu().context("cannot determine current CPU, pass --cpu")?,
    };

    let topo = SysfsTopology::with_root(&args.sysfs_root).snapshot()?;
    let map = build_queue_map(&topo, &QueueSetConfig::new(args.queues), &HeapAllocator)?;
    let queue = map
        .queue_for(cpu)
        .with_context(|| format!("cpu {cpu} does not exist (nr_cpu_ids = {})", map.len()))?;

    let out = RouteOutput {
        cpu,
        queue,
        online: topo.is_online(cpu),
    };

    match format {
        OutputFormat::Table => {
            if out.online {
                println!("CPU{} -> Queue {}", out.cpu, out.queue);
            } else {
                println!("CPU{} is offline (placeholder queue {})", out.cpu, out.queue);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out)?),
        OutputFormat::Raw => println!("{} {}", out.cpu, out.queue),
    }
    Ok(())
}

/// CPU the calling thread is running on.
#[cfg(target_os = "linux")]
fn current_cpu() -> Option<CpuId> {
    nix::sched::sched_getcpu().ok()
}

/// CPU the calling thread is running on (non-Linux stub).
#[cfg(not(target_os = "linux"))]
fn current_cpu() -> Option<CpuId> {
    None
}

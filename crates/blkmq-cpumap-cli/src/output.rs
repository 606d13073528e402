//! Output formatting for CLI.

use blkmq_cpumap_core::topology::format_cpulist;
use blkmq_cpumap_core::{CpuId, CpuTopology, QueueMap};
use clap::ValueEnum;
use serde::Serialize;

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output.
    Json,
    /// Raw `cpu queue` pairs (for scripting).
    Raw,
}

/// Serializable map report for JSON output.
#[derive(Debug, Serialize)]
pub struct MapReport<'a> {
    /// Queue set name, when built from a config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    /// The table itself.
    pub map: &'a QueueMap,
    /// Online CPUs per queue, as cpulists.
    pub queues: Vec<QueueReport>,
}

/// CPUs feeding one queue.
#[derive(Debug, Serialize)]
pub struct QueueReport {
    /// Queue index.
    pub queue: u32,
    /// Online CPUs mapped to it.
    pub cpus: String,
}

impl<'a> MapReport<'a> {
    /// Collect the per-queue view of `map`.
    pub fn new<T: CpuTopology + ?Sized>(name: Option<&'a str>, map: &'a QueueMap, topo: &T) -> Self {
        let queues = map
            .queue_affinity(topo)
            .iter()
            .zip(0u32..)
            .map(|(cpus, queue)| QueueReport {
                queue,
                cpus: format_cpulist(cpus),
            })
            .collect();
        Self { name, map, queues }
    }
}

/// Print `map` in the requested format.
pub fn print_map<T: CpuTopology + ?Sized>(
    name: Option<&str>,
    map: &QueueMap,
    topo: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(name, map, topo),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&MapReport::new(name, map, topo))?
            );
        }
        OutputFormat::Raw => {
            for cpu in online_cpus(topo) {
                if let Some(queue) = map.queue_for(cpu) {
                    println!("{cpu} {queue}");
                }
            }
        }
    }
    Ok(())
}

fn print_table<T: CpuTopology + ?Sized>(name: Option<&str>, map: &QueueMap, topo: &T) {
    let summary = map.summary();
    if let Some(name) = name {
        println!("{name}:");
    }
    println!(
        "{} online CPUs, {} cores, {} queues, {} policy, table on {}",
        summary.nr_cpus,
        summary.nr_uniq_cpus,
        map.nr_queues(),
        map.policy(),
        map.numa_node()
    );
    print!("{}", map.show(topo));

    println!("{:>6} {:>6}  CPUS", "QUEUE", "COUNT");
    for (queue, cpus) in map.queue_affinity(topo).iter().enumerate() {
        println!("{queue:>6} {:>6}  {}", cpus.len(), format_cpulist(cpus));
    }
}

fn online_cpus<T: CpuTopology + ?Sized>(topo: &T) -> impl Iterator<Item = CpuId> + '_ {
    (0..topo.nr_cpu_ids()).filter(move |&cpu| topo.is_online(cpu))
}

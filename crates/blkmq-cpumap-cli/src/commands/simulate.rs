//! Simulate command for synthetic topologies.

use crate::output::{print_map, OutputFormat};
use blkmq_cpumap_core::topology::{parse_cpulist, SmtLayout, TopologyBuilder};
use blkmq_cpumap_core::{build_queue_map, HeapAllocator, QueueSetConfig};
use clap::{Args, ValueEnum};

/// SMT thread numbering.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum Layout {
    /// Threads of a core have consecutive ids.
    #[default]
    Adjacent,
    /// First thread of every core, then the second, and so on.
    Interleaved,
}

impl Layout {
    fn to_smt_layout(self) -> SmtLayout {
        match self {
            Layout::Adjacent => SmtLayout::Adjacent,
            Layout::Interleaved => SmtLayout::Interleaved,
        }
    }
}

/// Arguments for simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Physical cores.
    #[arg(short, long)]
    pub cores: usize,

    /// Threads per core.
    #[arg(short, long, default_value = "1")]
    pub threads: usize,

    /// Thread numbering.
    #[arg(long, value_enum, default_value = "adjacent")]
    pub layout: Layout,

    /// Offline CPUs as a cpulist (e.g. 3,6-7).
    #[arg(long)]
    pub offline: Option<String>,

    /// Number of hardware queues.
    #[arg(short, long)]
    pub queues: u32,
}

/// Build and print the map for a synthetic machine.
pub fn simulate(args: &SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let offline = args
        .offline
        .as_deref()
        .map(parse_cpulist)
        .transpose()?
        .unwrap_or_default();

    let topo = TopologyBuilder::uniform(args.cores, args.threads, args.layout.to_smt_layout())
        .offline(&offline)
        .build()?;

    tracing::debug!(
        cores = args.cores,
        threads = args.threads,
        layout = ?args.layout,
        offline = offline.len(),
        "Simulating topology"
    );

    let map = build_queue_map(&topo, &QueueSetConfig::new(args.queues), &HeapAllocator)?;
    print_map(None, &map, &topo, format)
}

//! Apply command - build maps for every configured queue set.

use crate::output::{print_map, MapReport, OutputFormat};
use blkmq_cpumap_core::config::{load_config, DEFAULT_CONFIG_PATH};
use blkmq_cpumap_core::topology::SysfsTopology;
use blkmq_cpumap_core::{build_queue_map, HeapAllocator};
use clap::Args;
use std::path::PathBuf;

/// Arguments for apply command.
#[derive(Args)]
pub struct ApplyArgs {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Build the map of every queue set against one topology snapshot.
pub fn apply(args: &ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    if config.queue_sets.is_empty() {
        tracing::warn!(config = %args.config.display(), "No queue sets configured");
        return Ok(());
    }

    let topo = SysfsTopology::with_root(&config.sysfs_root).snapshot()?;

    let mut maps = Vec::with_capacity(config.queue_sets.len());
    for set in &config.queue_sets {
        let map = build_queue_map(&topo, &set.queues, &HeapAllocator)
            .map_err(|e| anyhow::anyhow!("queue set {}: {e}", set.name))?;
        maps.push((set.name.as_str(), map));
    }

    if let OutputFormat::Json = format {
        let reports: Vec<MapReport<'_>> = maps
            .iter()
            .map(|(name, map)| MapReport::new(Some(*name), map, &topo))
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for (name, map) in &maps {
        print_map(Some(*name), map, &topo, format)?;
    }
    Ok(())
}

//! blkmq-cpumap CLI - inspect and simulate CPU to hardware queue maps.

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]

mod commands;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// blkmq-cpumap: topology-aware CPU to hardware queue mapping
#[derive(Parser)]
#[command(name = "blkmq-cpumap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the map for this machine's CPU topology
    Show(commands::ShowArgs),

    /// Build the map for a synthetic topology
    Simulate(commands::SimulateArgs),

    /// Show which queue a CPU submits to
    Route(commands::RouteArgs),

    /// Build maps for every queue set in a config file
    Apply(commands::ApplyArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show(args) => commands::show(&args, cli.format),
        Commands::Simulate(args) => commands::simulate(&args, cli.format),
        Commands::Route(args) => commands::route(&args, cli.format),
        Commands::Apply(args) => commands::apply(&args, cli.format),
    }
}

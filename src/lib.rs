//! # blkmq-cpumap
//!
//! Topology-aware CPU to hardware queue mapping for multi-queue block I/O.
//!
//! This is the workspace root crate that re-exports core functionality.
//! For direct usage, depend on individual sub-crates:
//!
//! - [`blkmq-cpumap-core`] - Topology views, summarizer, queue assigner
//! - [`blkmq-cpumap-cli`] - CLI tool (`blkmq-cpumap` binary)

pub use blkmq_cpumap_core::*;

pub mod verification_specs;

//! Topology-aware CPU to hardware queue mapping for multi-queue block I/O.
//!
//! Every CPU id of the machine is assigned one hardware dispatch queue so
//! that I/O submitted from that CPU lands on a queue close to it. When there
//! are fewer queues than online CPUs and the machine runs SMT, all threads of
//! a physical core are sent to the same queue; otherwise CPUs are dealt out
//! in contiguous, near-equal blocks.
//!
//! # Example
//!
//! ```
//! use blkmq_cpumap_core::{build_queue_map, HeapAllocator, QueueSetConfig};
//! use blkmq_cpumap_core::topology::{SmtLayout, StaticTopology};
//!
//! // two cores with two threads each
//! let topo = StaticTopology::uniform(2, 2, SmtLayout::Adjacent).unwrap();
//! let map = build_queue_map(&topo, &QueueSetConfig::new(2), &HeapAllocator).unwrap();
//!
//! assert_eq!(map.as_slice(), &[0, 0, 1, 1]);
//! ```

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod alloc;
mod assign;
pub mod config;
pub mod cpumask;
mod error;
mod map;
mod publish;
mod summary;
pub mod topology;

pub use alloc::{BoundedAllocator, HeapAllocator, NumaNode, TableAllocator};
pub use assign::{build_queue_map, cpu_to_queue_index, update_queue_map, MapPolicy};
pub use config::QueueSetConfig;
pub use error::{Error, Result};
pub use map::{QueueMap, ShowMap};
pub use publish::QueueMapHandle;
pub use summary::TopologySummary;
pub use topology::CpuTopology;

/// CPU id in `[0, nr_cpu_ids)`.
pub type CpuId = usize;

/// Hardware queue index in `[0, nr_hw_queues)`.
pub type QueueId = u32;

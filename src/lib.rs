//! Network decomposition and parallel dispatch core for a river-routing driver.
//!
//! The crate is organized in modules that depend as little as possible on each other.
//!
//! **Graph Store**: the [`segment`] module holds the segment→downstream mapping and per-segment
//! scalar parameters, and validates graph integrity at construction time.
//!
//! **Topology**: the [`topology`] module derives the reverse graph and partitions the segment set
//! into independent networks.
//!
//! **Decomposition**: the [`reach`] module breaks each independent network into linear reaches,
//! and the [`subnetwork`] and [`cluster`] modules group those reaches into order-ranked,
//! size-bounded work units.
//!
//! **Scheduling**: the [`scheduler`] module drives an injected [`kernel::ReachKernel`] across
//! those work units wave by wave, respecting the dependency order between subnetworks.
//!
//! **Assembly**: the [`assemble`] module concatenates per-unit kernel results into one table.
//!
//! # Example
//!
//! ```
//! use reachnet_core::config::{Config, Mode};
//! use reachnet_core::kernel::IdentityKernel;
//! use reachnet_core::segment::{Graph, SegmentId, SegmentRecord};
//! use reachnet_core::scheduler::Scheduler;
//! use std::collections::HashMap;
//!
//! let records = vec![
//!     SegmentRecord::new(SegmentId::new(1), SegmentId::new(2), [0.1, 2.0, 3.0, 1.0, 100.0, 0.03, 0.05, 1.5, 0.001]),
//!     SegmentRecord::new(SegmentId::new(2), SegmentId::new(0), [0.1, 2.0, 3.0, 1.0, 100.0, 0.03, 0.05, 1.5, 0.001]),
//! ];
//! let graph = Graph::from_records(records).unwrap();
//! let nts = 3;
//! let qlat: HashMap<_, _> = graph.segment_ids().map(|s| (s, vec![10.0_f32; nts])).collect();
//! let q0: HashMap<_, _> = graph.segment_ids().map(|s| (s, [0.0_f32; 3])).collect();
//!
//! let config = Config::new(10, 0.65, 1, Mode::Sequential).normalize();
//! let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
//! let table = scheduler.run(nts, &qlat, &q0).unwrap();
//! assert_eq!(table.segment_ids().count(), 2);
//! ```

#![forbid(unsafe_code)]

pub mod assemble;
pub mod cluster;
pub mod config;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod reach;
pub mod scheduler;
pub mod segment;
pub mod subnetwork;
pub mod topology;

pub use error::{RunError, Stage};
pub use segment::SegmentId;

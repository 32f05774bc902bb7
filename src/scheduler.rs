//! The Scheduler: drives the injected kernel across work units wave by wave.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::debug_span;

use crate::assemble::{assemble, Table};
use crate::cluster::{pack_clusters, Cluster};
use crate::config::{Config, Mode};
use crate::error::{RunError, Stage};
use crate::kernel::{BoundaryInput, KernelInput, ReachKernel};
use crate::logging::stage_span;
use crate::reach::{decompose_network, Reach};
use crate::segment::{Graph, SegmentId, PARAM_COLUMNS};
use crate::subnetwork::{partition_subnetworks, Subnetwork};
use crate::topology::{partition_networks, IndependentNetwork, ReverseGraph};

/// The Boundary Flow Table: segment id to (flow, velocity, depth) series, valid for one wave.
type BoundaryFlowTable = HashMap<SegmentId, Vec<[f32; 3]>>;

/// One dispatchable work unit: a whole network, a bare subnetwork, or a packed cluster.
struct Unit {
    order: u32,
    tailwaters: Vec<SegmentId>,
    reaches: Vec<Reach>,
}

impl From<Subnetwork> for Unit {
    fn from(subnetwork: Subnetwork) -> Self {
        Unit {
            order: subnetwork.order,
            tailwaters: vec![subnetwork.tailwater],
            reaches: subnetwork.reaches,
        }
    }
}

impl From<Cluster> for Unit {
    fn from(cluster: Cluster) -> Self {
        Unit {
            order: cluster.order,
            tailwaters: cluster.tailwaters,
            reaches: cluster.reaches,
        }
    }
}

struct UnitResult {
    native_rows: Vec<(SegmentId, Vec<[f32; 3]>)>,
    tailwater_rows: Vec<(SegmentId, Vec<[f32; 3]>)>,
}

/// Drives a [`ReachKernel`] across a graph's work units, in the dispatch style its [`Config`]
/// selects.
pub struct Scheduler<'g, K: ReachKernel> {
    graph: &'g Graph,
    reverse: ReverseGraph,
    config: Config,
    kernel: K,
}

impl<'g, K: ReachKernel> Scheduler<'g, K> {
    /// Builds a scheduler over `graph`, driven by `config`, invoking `kernel` for every unit.
    pub fn new(graph: &'g Graph, config: &Config, kernel: K) -> Self {
        let reverse = ReverseGraph::build(graph);
        Scheduler {
            graph,
            reverse,
            config: *config,
            kernel,
        }
    }

    /// Runs the full decomposition-and-dispatch pipeline, returning the assembled result table.
    ///
    /// `qlat` and `q0` need only cover the segments actually present in `graph`; missing entries
    /// are treated as all-zero.
    pub fn run(
        &self,
        nts: usize,
        qlat: &HashMap<SegmentId, Vec<f32>>,
        q0: &HashMap<SegmentId, [f32; 3]>,
    ) -> Result<Table, RunError> {
        let networks = partition_networks(self.graph, &self.reverse);
        match self.config.mode {
            Mode::Sequential => self.run_sequential(&networks, nts, qlat, q0),
            Mode::ByNetwork => self.run_by_network(&networks, nts, qlat, q0),
            Mode::BySubnetwork => self.run_waves(&networks, nts, qlat, q0, false),
            Mode::BySubnetworkClustered => self.run_waves(&networks, nts, qlat, q0, true),
        }
    }

    fn run_sequential(
        &self,
        networks: &[IndependentNetwork],
        nts: usize,
        qlat: &HashMap<SegmentId, Vec<f32>>,
        q0: &HashMap<SegmentId, [f32; 3]>,
    ) -> Result<Table, RunError> {
        let _guard = stage_span(Stage::Scheduling).entered();
        let boundary_table = BoundaryFlowTable::new();
        let mut native_accumulator = Vec::new();
        for network in networks {
            let unit = Unit {
                order: 0,
                tailwaters: vec![network.tailwater],
                reaches: decompose_network(network, &self.reverse),
            };
            let result = self.dispatch_unit(&unit, nts, qlat, q0, &boundary_table)?;
            native_accumulator.extend(result.native_rows);
        }
        Ok(assemble(native_accumulator))
    }

    fn run_by_network(
        &self,
        networks: &[IndependentNetwork],
        nts: usize,
        qlat: &HashMap<SegmentId, Vec<f32>>,
        q0: &HashMap<SegmentId, [f32; 3]>,
    ) -> Result<Table, RunError> {
        let _guard = stage_span(Stage::Scheduling).entered();
        let boundary_table = BoundaryFlowTable::new();
        let units: Vec<Unit> = networks
            .iter()
            .map(|network| Unit {
                order: 0,
                tailwaters: vec![network.tailwater],
                reaches: decompose_network(network, &self.reverse),
            })
            .collect();

        let pool = self.build_pool()?;
        let results: Vec<Result<UnitResult, RunError>> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| self.dispatch_unit(unit, nts, qlat, q0, &boundary_table))
                .collect()
        });

        let mut native_accumulator = Vec::new();
        for result in results {
            native_accumulator.extend(result?.native_rows);
        }
        Ok(assemble(native_accumulator))
    }

    /// Builds a `rayon` thread pool bounded to the configured worker count, so a unit's
    /// `par_iter()` dispatch observes `Config::workers` instead of running on rayon's ambient
    /// global pool.
    fn build_pool(&self) -> Result<ThreadPool, RunError> {
        ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|error| RunError::WorkerPool {
                workers: self.config.workers,
                message: error.to_string(),
            })
    }

    fn run_waves(
        &self,
        networks: &[IndependentNetwork],
        nts: usize,
        qlat: &HashMap<SegmentId, Vec<f32>>,
        q0: &HashMap<SegmentId, [f32; 3]>,
        clustered: bool,
    ) -> Result<Table, RunError> {
        let _guard = stage_span(Stage::Scheduling).entered();
        let target = self.config.target_size();
        let mut subnetworks = Vec::new();
        for network in networks {
            let reaches = decompose_network(network, &self.reverse);
            subnetworks.extend(partition_subnetworks(&reaches, &self.reverse, target));
        }

        let units: Vec<Unit> = if clustered {
            pack_clusters(subnetworks, target, self.config.theta)
                .into_iter()
                .map(Unit::from)
                .collect()
        } else {
            subnetworks.into_iter().map(Unit::from).collect()
        };

        let mut by_order: HashMap<u32, Vec<Unit>> = HashMap::new();
        for unit in units {
            by_order.entry(unit.order).or_default().push(unit);
        }
        let mut orders: Vec<u32> = by_order.keys().copied().collect();
        orders.sort_unstable_by(|a, b| b.cmp(a));

        let pool = self.build_pool()?;
        let mut native_accumulator = Vec::new();
        let mut boundary_table = BoundaryFlowTable::new();

        for order in orders {
            let span = debug_span!("wave", order);
            let _guard = span.enter();
            // `order` was just drawn from `by_order.keys()` above and each key is only ever
            // consumed once per loop iteration, so it is always still present here.
            let wave_units = by_order.remove(&order).unwrap();

            let results: Vec<Result<UnitResult, RunError>> = pool.install(|| {
                wave_units
                    .par_iter()
                    .map(|unit| self.dispatch_unit(unit, nts, qlat, q0, &boundary_table))
                    .collect()
            });

            // A fresh table per wave: stale boundary values from an earlier order cannot leak
            // into a later one.
            let mut next_boundary = BoundaryFlowTable::new();
            for result in results {
                let unit_result = result?;
                native_accumulator.extend(unit_result.native_rows);
                next_boundary.extend(unit_result.tailwater_rows);
            }
            boundary_table = next_boundary;
        }

        Ok(assemble(native_accumulator))
    }

    fn dispatch_unit(
        &self,
        unit: &Unit,
        nts: usize,
        qlat: &HashMap<SegmentId, Vec<f32>>,
        q0: &HashMap<SegmentId, [f32; 3]>,
        boundary_table: &BoundaryFlowTable,
    ) -> Result<UnitResult, RunError> {
        let native: HashSet<SegmentId> = unit
            .reaches
            .iter()
            .flat_map(|r| r.segments().iter().copied())
            .collect();

        let mut off_network = HashSet::new();
        for &segment in &native {
            for &upstream in self.reverse.upstreams_of(segment) {
                if !native.contains(&upstream) {
                    off_network.insert(upstream);
                }
            }
        }

        let extended: Vec<SegmentId> = native.iter().copied().chain(off_network.iter().copied()).sorted().collect();
        let extended_set: HashSet<SegmentId> = extended.iter().copied().collect();

        let mut params = Vec::with_capacity(extended.len());
        let mut qlat_rows = Vec::with_capacity(extended.len());
        let mut q0_rows = Vec::with_capacity(extended.len());
        for &segment in &extended {
            let segment_params = self.graph.params_of(segment).ok_or_else(|| RunError::ParamSchema {
                segment,
                message: "segment missing from parameter table".to_string(),
            })?;
            params.push(segment_params.0);
            qlat_rows.push(qlat.get(&segment).cloned().unwrap_or_else(|| vec![0.0; nts]));
            q0_rows.push(q0.get(&segment).copied().unwrap_or([0.0; 3]));
        }

        let mut boundary_inputs = HashMap::new();
        for &segment in &off_network {
            if let Some(series) = boundary_table.get(&segment) {
                let position_index = extended
                    .binary_search(&segment)
                    .expect("off-network segment is always present in the extended set");
                boundary_inputs.insert(
                    segment,
                    BoundaryInput {
                        position_index,
                        results: series.clone(),
                    },
                );
            }
        }

        let mut upstreams = HashMap::with_capacity(extended.len());
        for &segment in &extended {
            let restricted: Vec<SegmentId> = self
                .reverse
                .upstreams_of(segment)
                .iter()
                .copied()
                .filter(|u| extended_set.contains(u))
                .collect();
            upstreams.insert(segment, restricted);
        }

        let input = KernelInput {
            nts,
            reaches: &unit.reaches,
            upstreams: &upstreams,
            segment_ids: &extended,
            param_columns: &PARAM_COLUMNS,
            params: &params,
            qlat: &qlat_rows,
            q0: &q0_rows,
            boundary_inputs: &boundary_inputs,
        };

        let output = self.kernel.compute(input).map_err(|error| RunError::Kernel {
            tailwaters: unit.tailwaters.clone(),
            message: error.0,
        })?;

        let mut native_rows = Vec::with_capacity(native.len());
        let mut tailwater_rows = Vec::new();
        for (index, &segment) in output.segment_ids.iter().enumerate() {
            if !native.contains(&segment) {
                continue;
            }
            let series = output.fvd[index].clone();
            if unit.tailwaters.contains(&segment) {
                tailwater_rows.push((segment, series.clone()));
            }
            native_rows.push((segment, series));
        }

        Ok(UnitResult {
            native_rows,
            tailwater_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::IdentityKernel;
    use crate::segment::SegmentRecord;

    fn rec(id: u64, down: u64) -> SegmentRecord {
        SegmentRecord::new(SegmentId::new(id), SegmentId::new(down), [0.0; 9])
    }

    fn flat_inputs(graph: &Graph, nts: usize) -> (HashMap<SegmentId, Vec<f32>>, HashMap<SegmentId, [f32; 3]>) {
        let qlat = graph.segment_ids().map(|s| (s, vec![10.0_f32; nts])).collect();
        let q0 = graph.segment_ids().map(|s| (s, [0.0_f32; 3])).collect();
        (qlat, q0)
    }

    #[test]
    fn two_segment_chain_runs_under_every_mode() {
        let graph = Graph::from_records(vec![rec(1, 2), rec(2, 0)]).unwrap();
        let (qlat, q0) = flat_inputs(&graph, 3);

        for mode in [Mode::Sequential, Mode::ByNetwork, Mode::BySubnetwork, Mode::BySubnetworkClustered] {
            let config = Config::new(10, 0.65, 2, mode).normalize();
            let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
            let table = scheduler.run(3, &qlat, &q0).unwrap();
            assert_eq!(table.segment_ids().count(), 2);
        }
    }

    #[test]
    fn modes_agree_bitwise_on_a_y_junction() {
        let graph = Graph::from_records(vec![rec(1, 3), rec(2, 3), rec(3, 0)]).unwrap();
        let (qlat, q0) = flat_inputs(&graph, 2);

        let mut tables = Vec::new();
        for mode in [Mode::Sequential, Mode::ByNetwork, Mode::BySubnetworkClustered] {
            let config = Config::new(1, 0.65, 3, mode).normalize();
            let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
            tables.push(scheduler.run(2, &qlat, &q0).unwrap());
        }

        for segment in graph.segment_ids() {
            let baseline = tables[0].series_of(segment).unwrap();
            for table in &tables[1..] {
                assert_eq!(table.series_of(segment).unwrap(), baseline);
            }
        }
    }

    #[test]
    fn two_disjoint_trees_dispatch_independently() {
        let graph = Graph::from_records(vec![rec(1, 2), rec(2, 0), rec(3, 4), rec(4, 0)]).unwrap();
        let (qlat, q0) = flat_inputs(&graph, 1);
        let config = Config::new(10, 0.65, 2, Mode::ByNetwork).normalize();
        let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
        let table = scheduler.run(1, &qlat, &q0).unwrap();
        assert_eq!(table.segment_ids().count(), 4);
    }

    #[test]
    fn cross_order_boundary_feeds_downstream_unit() {
        // 1 -> 2 -> 0, target 1 splits at the only junction-free chain boundary we can force:
        // a Y with a long downstream leg so the downstream subnetwork (order 0) needs the
        // upstream subnetwork's (order 1) tailwater series as a boundary input.
        let graph = Graph::from_records(vec![rec(1, 3), rec(2, 3), rec(3, 0)]).unwrap();
        let (qlat, q0) = flat_inputs(&graph, 2);
        let config = Config::new(1, 1.0, 2, Mode::BySubnetwork).normalize();
        let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
        let table = scheduler.run(2, &qlat, &q0).unwrap();
        assert_eq!(table.segment_ids().count(), 3);
        // Every segment's series equals its own (qu0, qd0, h0), as the identity kernel echoes it
        // (whether computed natively or relayed through a boundary handoff).
        for segment in graph.segment_ids() {
            assert_eq!(table.series_of(segment).unwrap(), &[[0.0, 0.0, 0.0]; 2]);
        }
    }
}

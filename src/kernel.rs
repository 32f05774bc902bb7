//! The injected compute kernel's contract: the single external dependency of this crate.

use std::collections::HashMap;

use crate::error::KernelError;
use crate::reach::Reach;
use crate::segment::{SegmentId, PARAM_COLUMNS};

/// A previously computed time series for an off-network upstream boundary segment.
#[derive(Debug, Clone)]
pub struct BoundaryInput {
    /// This boundary segment's row index in the unit's sorted segment vector.
    pub position_index: usize,
    /// The boundary segment's (flow, velocity, depth) series, one row per timestep.
    pub results: Vec<[f32; 3]>,
}

/// Everything one kernel invocation needs to compute flow/velocity/depth for one work unit.
///
/// `segment_ids` is sorted ascending; `params`, `qlat`, and `q0` are indexed in lockstep with it.
/// Rows belonging to an off-network upstream boundary are placeholders in `qlat`/`q0` — their real
/// values live in `boundary_inputs`, keyed by segment id.
pub struct KernelInput<'a> {
    /// The number of timesteps to compute.
    pub nts: usize,
    /// The unit's reaches, in decomposition order.
    pub reaches: &'a [Reach],
    /// Upstream adjacency restricted to this unit's extended segment set.
    pub upstreams: &'a HashMap<SegmentId, Vec<SegmentId>>,
    /// This unit's segment ids, sorted ascending.
    pub segment_ids: &'a [SegmentId],
    /// The fixed parameter column labels, in the order `params` rows use.
    pub param_columns: &'static [&'static str],
    /// Per-segment scalar parameters, indexed in lockstep with `segment_ids`.
    pub params: &'a [[f32; PARAM_COLUMNS.len()]],
    /// Per-segment lateral inflow over time, indexed in lockstep with `segment_ids`.
    pub qlat: &'a [Vec<f32>],
    /// Per-segment initial (upstream flow, downstream flow, depth), indexed in lockstep with
    /// `segment_ids`.
    pub q0: &'a [[f32; 3]],
    /// Precomputed time series for this unit's off-network upstream boundaries.
    pub boundary_inputs: &'a HashMap<SegmentId, BoundaryInput>,
}

/// One kernel invocation's result: segment ids and their (flow, velocity, depth) series.
///
/// `segment_ids` must be returned in the same sorted order the kernel received them in.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    /// The segment ids this result covers, sorted ascending (matching the input order).
    pub segment_ids: Vec<SegmentId>,
    /// Per-segment (flow, velocity, depth) series, indexed in lockstep with `segment_ids`; each
    /// inner vector has one row per timestep.
    pub fvd: Vec<Vec<[f32; 3]>>,
}

/// The hydraulic compute kernel, injected so the rest of the crate never depends on a particular
/// routing model. Implementations are expected to be pure functions of their input slice.
pub trait ReachKernel: Send + Sync {
    /// Computes flow/velocity/depth for every segment in `input`.
    fn compute(&self, input: KernelInput<'_>) -> Result<KernelOutput, KernelError>;
}

/// A reference kernel with no hydraulics: it echoes each segment's initial state across every
/// timestep, or a boundary's supplied series where one was provided.
///
/// Used to exercise topology, partitioning, and scheduling independently of any real routing
/// model; its output is a pure function of its input slice, which the scenario tests rely on for
/// the bitwise-identical-across-modes property.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityKernel;

impl ReachKernel for IdentityKernel {
    fn compute(&self, input: KernelInput<'_>) -> Result<KernelOutput, KernelError> {
        let mut fvd = Vec::with_capacity(input.segment_ids.len());
        for (index, &segment) in input.segment_ids.iter().enumerate() {
            let row = if let Some(boundary) = input.boundary_inputs.get(&segment) {
                let mut series = boundary.results.clone();
                series.resize(input.nts, boundary.results.last().copied().unwrap_or([0.0; 3]));
                series
            } else {
                vec![input.q0[index]; input.nts]
            };
            fvd.push(row);
        }
        Ok(KernelOutput {
            segment_ids: input.segment_ids.to_vec(),
            fvd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_kernel_echoes_initial_state() {
        let segment_ids = vec![SegmentId::new(1), SegmentId::new(2)];
        let params = vec![[0.0; PARAM_COLUMNS.len()]; 2];
        let qlat = vec![vec![0.0; 3]; 2];
        let q0 = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let upstreams = HashMap::new();
        let boundary_inputs = HashMap::new();
        let reaches = Vec::new();

        let input = KernelInput {
            nts: 3,
            reaches: &reaches,
            upstreams: &upstreams,
            segment_ids: &segment_ids,
            param_columns: &PARAM_COLUMNS,
            params: &params,
            qlat: &qlat,
            q0: &q0,
            boundary_inputs: &boundary_inputs,
        };

        let output = IdentityKernel.compute(input).unwrap();
        assert_eq!(output.segment_ids, segment_ids);
        assert_eq!(output.fvd[0], vec![[1.0, 2.0, 3.0]; 3]);
        assert_eq!(output.fvd[1], vec![[4.0, 5.0, 6.0]; 3]);
    }

    #[test]
    fn identity_kernel_uses_boundary_series_when_supplied() {
        let segment_ids = vec![SegmentId::new(1)];
        let params = vec![[0.0; PARAM_COLUMNS.len()]; 1];
        let qlat = vec![vec![0.0; 2]; 1];
        let q0 = vec![[0.0, 0.0, 0.0]];
        let upstreams = HashMap::new();
        let mut boundary_inputs = HashMap::new();
        boundary_inputs.insert(
            SegmentId::new(1),
            BoundaryInput {
                position_index: 0,
                results: vec![[9.0, 9.0, 9.0]],
            },
        );
        let reaches = Vec::new();

        let input = KernelInput {
            nts: 2,
            reaches: &reaches,
            upstreams: &upstreams,
            segment_ids: &segment_ids,
            param_columns: &PARAM_COLUMNS,
            params: &params,
            qlat: &qlat,
            q0: &q0,
            boundary_inputs: &boundary_inputs,
        };

        let output = IdentityKernel.compute(input).unwrap();
        assert_eq!(output.fvd[0], vec![[9.0, 9.0, 9.0]; 2]);
    }
}

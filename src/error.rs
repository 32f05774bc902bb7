//! The tagged failure type shared by every stage of the core.

use crate::segment::SegmentId;

/// Which stage of the pipeline raised a [`RunError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reverse-graph construction and reachability partitioning.
    Topology,
    /// Junction-split reach decomposition.
    Decomposition,
    /// Subnetwork and cluster partitioning.
    Partition,
    /// Wave scheduling and boundary bookkeeping.
    Scheduling,
    /// The injected compute kernel itself.
    Kernel,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Topology => "topology",
            Stage::Decomposition => "decomposition",
            Stage::Partition => "partition",
            Stage::Scheduling => "scheduling",
            Stage::Kernel => "kernel",
        };
        f.write_str(name)
    }
}

/// The tagged failure value that surfaces to the driver.
///
/// No variant is retried: kernel failures are assumed deterministic, and graph/schema errors are
/// fatal at load, before any kernel invocation occurs.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A cycle was detected while validating the forward graph.
    #[error("cycle detected in forward graph at segment {segment}")]
    CycleDetected {
        /// A segment on the cycle.
        segment: SegmentId,
    },

    /// A non-sentinel downstream pointed at a segment absent from the input.
    #[error("segment {segment} has dangling downstream {downstream}")]
    DanglingDownstream {
        /// The segment whose downstream is dangling.
        segment: SegmentId,
        /// The missing downstream id.
        downstream: SegmentId,
    },

    /// The same segment id appeared twice in the input records.
    #[error("duplicate segment id {segment} in input records")]
    DuplicateSegment {
        /// The duplicated id.
        segment: SegmentId,
    },

    /// A parameter record was missing a required column or had the wrong shape.
    #[error("parameter schema mismatch for segment {segment}: {message}")]
    ParamSchema {
        /// The segment whose parameters are malformed.
        segment: SegmentId,
        /// A human-readable description of the mismatch.
        message: String,
    },

    /// The kernel signalled a numerical or shape error for one work unit.
    #[error("kernel failed for unit with tailwaters {tailwaters:?}: {message}")]
    Kernel {
        /// The tailwater segments of the unit that failed, identifying it to the caller.
        tailwaters: Vec<SegmentId>,
        /// The kernel's own error message.
        message: String,
    },

    /// The configured worker pool could not be initialized (e.g. the OS refused to spawn its
    /// threads).
    #[error("failed to initialize a worker pool of size {workers}: {message}")]
    WorkerPool {
        /// The configured worker-pool size that failed to initialize.
        workers: usize,
        /// The underlying error message.
        message: String,
    },
}

impl RunError {
    /// The stage that raised this error.
    pub fn stage(&self) -> Stage {
        match self {
            RunError::CycleDetected { .. }
            | RunError::DanglingDownstream { .. }
            | RunError::DuplicateSegment { .. } => Stage::Topology,
            RunError::ParamSchema { .. } => Stage::Topology,
            RunError::Kernel { .. } => Stage::Kernel,
            RunError::WorkerPool { .. } => Stage::Scheduling,
        }
    }
}

/// The error a [`crate::kernel::ReachKernel`] implementation returns.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct KernelError(pub String);

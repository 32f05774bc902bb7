//! The external configuration surface: target subnetwork size, cluster threshold, worker-pool
//! size, and dispatch mode.

use tracing::warn;

/// How the scheduler dispatches work units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every unit runs sequentially on the calling thread, in arbitrary order. No parallelism,
    /// no partitioning.
    Sequential,
    /// Each independent network is one unit; networks run in parallel, with no subnetwork
    /// partitioning within them.
    ByNetwork,
    /// Each independent network is partitioned into subnetworks, dispatched wave by wave in
    /// order-descending order, one subnetwork per work unit.
    BySubnetwork,
    /// As [`Mode::BySubnetwork`], but subnetworks of the same order are packed into clusters
    /// before dispatch.
    BySubnetworkClustered,
}

/// The four external knobs of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Target subnetwork size. `<= 0` means no partitioning (normalized to 1).
    pub target: i64,
    /// Cluster packing threshold fraction, nominally in `(0, 1]`.
    pub theta: f64,
    /// The worker-pool size used for parallel modes.
    pub workers: usize,
    /// The dispatch mode.
    pub mode: Mode,
}

impl Config {
    /// Constructs a config from its raw, possibly out-of-range values.
    pub fn new(target: i64, theta: f64, workers: usize, mode: Mode) -> Self {
        Config {
            target,
            theta,
            workers,
            mode,
        }
    }

    /// Returns a copy with out-of-range values clamped to their documented defaults, logging a
    /// `warn` event for each field that needed adjustment.
    ///
    /// `target <= 0` becomes `1` (no batching); `theta` outside `(0, 1]` becomes `1.0`; a
    /// `workers` of `0` becomes `1`.
    pub fn normalize(mut self) -> Self {
        if self.target <= 0 {
            warn!(target = self.target, "non-positive target subnetwork size; normalizing to 1");
            self.target = 1;
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            warn!(theta = self.theta, "cluster threshold out of (0, 1]; normalizing to 1.0");
            self.theta = 1.0;
        }
        if self.workers == 0 {
            warn!("worker-pool size of 0; normalizing to 1");
            self.workers = 1;
        }
        self
    }

    /// The target subnetwork size as a `usize`, assuming this config has been [`normalize`]d (or
    /// guarding defensively if not: non-positive values are treated as `1`).
    ///
    /// [`normalize`]: Config::normalize
    pub fn target_size(&self) -> usize {
        self.target.max(1) as usize
    }
}

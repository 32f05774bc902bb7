//! The Cluster Packer: concatenates adjacent same-order subnetworks into coarser work units.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Stage;
use crate::logging::stage_span;
use crate::reach::Reach;
use crate::segment::SegmentId;
use crate::subnetwork::Subnetwork;

/// A packed group of same-order subnetworks executed as one work unit.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// The order shared by every subnetwork folded into this cluster.
    pub order: u32,
    /// The internal tailwaters of the subnetworks folded into this cluster, in accumulation order.
    pub tailwaters: Vec<SegmentId>,
    /// The reaches of every subnetwork folded into this cluster, concatenated in accumulation order.
    pub reaches: Vec<Reach>,
}

impl Cluster {
    /// Every segment contained in this cluster, in no particular order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.reaches.iter().flat_map(|r| r.segments().iter().copied())
    }

    /// The total number of segments in this cluster.
    pub fn len(&self) -> usize {
        self.reaches.iter().map(|r| r.segments().len()).sum()
    }

    /// Whether this cluster contains no segments.
    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }
}

/// Packs subnetworks into clusters, grouped by order and never crossing an order boundary.
///
/// Within each order, subnetworks are accumulated into the current cluster in their given order
/// until the cluster's segment count reaches `theta * target` and at least one subnetwork of that
/// order remains unaccumulated; the cluster is then sealed and a new one opened. The final
/// subnetwork of each order is always flushed into whatever cluster is open, even if undersized.
/// `theta` is clamped to `(0, 1]` and `target` to at least 1, mirroring [`crate::config::Config`]'s
/// own normalization so this function is safe to call with raw, unnormalized values.
pub fn pack_clusters(subnetworks: Vec<Subnetwork>, target: usize, theta: f64) -> Vec<Cluster> {
    let _guard = stage_span(Stage::Partition).entered();
    let target = target.max(1);
    let theta = if theta > 0.0 && theta <= 1.0 { theta } else { 1.0 };
    let threshold = ((target as f64) * theta).ceil() as usize;
    let threshold = threshold.max(1);

    let mut by_order: HashMap<u32, Vec<Subnetwork>> = HashMap::new();
    for subnetwork in subnetworks {
        by_order.entry(subnetwork.order).or_default().push(subnetwork);
    }

    let mut orders: Vec<u32> = by_order.keys().copied().collect();
    orders.sort_unstable();

    let mut clusters = Vec::new();
    for order in orders {
        // `order` was just drawn from `by_order.keys()` above and each key is only ever
        // consumed once per loop iteration, so it is always still present here.
        let group = by_order.remove(&order).unwrap();
        clusters.extend(pack_order(order, group, threshold));
    }
    clusters
}

fn pack_order(order: u32, subnetworks: Vec<Subnetwork>, threshold: usize) -> Vec<Cluster> {
    let mut out = Vec::new();
    let mut tailwaters = Vec::new();
    let mut reaches = Vec::new();
    let mut size = 0usize;

    let count = subnetworks.len();
    for (index, subnetwork) in subnetworks.into_iter().enumerate() {
        size += subnetwork.len();
        tailwaters.push(subnetwork.tailwater);
        reaches.extend(subnetwork.reaches);

        let is_last = index + 1 == count;
        if is_last || size >= threshold {
            debug!(order, size, units = tailwaters.len(), "sealed cluster");
            out.push(Cluster {
                order,
                tailwaters: std::mem::take(&mut tailwaters),
                reaches: std::mem::take(&mut reaches),
            });
            size = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reach::Reach;

    fn subnetwork(order: u32, tailwater: u64, size: usize) -> Subnetwork {
        let segments: Vec<SegmentId> = (0..size as u64).map(|i| SegmentId::new(tailwater * 100 + i)).collect();
        Subnetwork {
            tailwater: SegmentId::new(tailwater),
            order,
            reaches: vec![Reach(segments)],
        }
    }

    #[test]
    fn threshold_clustering_matches_worked_example() {
        // Sizes [3, 3, 2, 2], T = 5, theta = 0.65 => threshold = ceil(3.25) = 4.
        // Running sizes: 3 (< 4), 3+3=6 (>= 4, seal [3,3]), 2 (< 4), 2+2=4 (>= 4 or last, seal [2,2]).
        let subnetworks = vec![
            subnetwork(0, 1, 3),
            subnetwork(0, 2, 3),
            subnetwork(0, 3, 2),
            subnetwork(0, 4, 2),
        ];
        let clusters = pack_clusters(subnetworks, 5, 0.65);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 6);
        assert_eq!(clusters[1].len(), 4);
    }

    #[test]
    fn final_subnetwork_always_flushes() {
        let subnetworks = vec![subnetwork(0, 1, 1), subnetwork(0, 2, 1), subnetwork(0, 3, 1)];
        let clusters = pack_clusters(subnetworks, 100, 0.65);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn clusters_never_cross_order_boundaries() {
        let subnetworks = vec![subnetwork(0, 1, 5), subnetwork(1, 2, 5)];
        let clusters = pack_clusters(subnetworks, 1, 1.0);
        assert_eq!(clusters.len(), 2);
        assert_ne!(clusters[0].order, clusters[1].order);
    }

    #[test]
    fn out_of_range_theta_is_treated_as_one() {
        let subnetworks = vec![subnetwork(0, 1, 3), subnetwork(0, 2, 3)];
        let clusters = pack_clusters(subnetworks, 5, 0.0);
        // theta <= 0 falls back to 1.0, so threshold = 5: first subnetwork alone (3 < 5) doesn't
        // seal, second pushes to 6 >= 5 and is also the last, sealing one cluster.
        assert_eq!(clusters.len(), 1);
    }
}

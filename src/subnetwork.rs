//! The Subnetwork Partitioner: groups reaches into order-ranked, size-bounded subnetworks.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Stage;
use crate::logging::stage_span;
use crate::reach::Reach;
use crate::segment::SegmentId;
use crate::topology::ReverseGraph;

/// A connected subset of an independent network, sized near a target segment count, with an
/// assigned order (subnetwork-hop distance from the network's outlet).
#[derive(Debug, Clone)]
pub struct Subnetwork {
    /// The segment through which this subnetwork drains into a higher-rank subnetwork (or the
    /// network outlet, for order 0): the downstream-most segment it contains.
    pub tailwater: SegmentId,
    /// Distance, in subnetwork hops, from the network's outlet. Order 0 is the outlet subnetwork.
    pub order: u32,
    /// The whole reaches making up this subnetwork, in decomposition order.
    pub reaches: Vec<Reach>,
}

impl Subnetwork {
    /// Every segment contained in this subnetwork, in no particular order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.reaches.iter().flat_map(|r| r.segments().iter().copied())
    }

    /// The total number of segments in this subnetwork.
    pub fn len(&self) -> usize {
        self.reaches.iter().map(|r| r.segments().len()).sum()
    }

    /// Whether this subnetwork contains no segments (never true for a subnetwork built by
    /// [`partition_subnetworks`], but useful for generic callers).
    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }
}

/// Partitions one independent network's reaches into order-ranked subnetworks.
///
/// `reaches` must be the full, in-order decomposition of a single network (as returned by
/// [`crate::reach::decompose_network`]); its first element is assumed to start at the network's
/// tailwater, per that function's contract. `target` is normalized to at least 1.
///
/// The walk mirrors the junction-split reach decomposition, but only splits into a new subnetwork
/// at a junction whose accumulated subnetwork size has already reached `target` — otherwise it
/// keeps pulling whole child reaches into the current subnetwork and continues past the junction.
/// Because splits only ever happen at reach boundaries, every subnetwork is a union of whole
/// reaches, never a partial one.
pub fn partition_subnetworks(reaches: &[Reach], reverse: &ReverseGraph, target: usize) -> Vec<Subnetwork> {
    if reaches.is_empty() {
        return Vec::new();
    }
    let _guard = stage_span(Stage::Partition).entered();
    let target = target.max(1);

    let mut by_entry = HashMap::with_capacity(reaches.len());
    for (index, reach) in reaches.iter().enumerate() {
        by_entry.insert(reach.entry(), index);
    }

    let mut out = Vec::new();
    build_subnetwork(0, 0, reaches, &by_entry, reverse, target, &mut out);
    out
}

fn build_subnetwork(
    root_index: usize,
    order: u32,
    reaches: &[Reach],
    by_entry: &HashMap<SegmentId, usize>,
    reverse: &ReverseGraph,
    target: usize,
    out: &mut Vec<Subnetwork>,
) {
    let mut included = vec![root_index];
    let mut queue = vec![root_index];
    let mut size = reaches[root_index].segments().len();

    while let Some(current) = queue.pop() {
        let exit = reaches[current].exit();
        let branching = reverse.branching_factor(exit);
        if branching == 0 {
            continue;
        }
        debug_assert!(branching >= 2, "a reach always exits at a headwater or a junction");

        if size >= target {
            for &upstream in reverse.upstreams_of(exit) {
                let child = by_entry[&upstream];
                build_subnetwork(child, order + 1, reaches, by_entry, reverse, target, out);
            }
        } else {
            for &upstream in reverse.upstreams_of(exit) {
                let child = by_entry[&upstream];
                included.push(child);
                size += reaches[child].segments().len();
                queue.push(child);
            }
        }
    }

    let tailwater = reaches[root_index].entry();
    let member_reaches = included.into_iter().map(|i| reaches[i].clone()).collect();
    debug!(tailwater = %tailwater, order, size, "closed subnetwork");
    out.push(Subnetwork {
        tailwater,
        order,
        reaches: member_reaches,
    });
}

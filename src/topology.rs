//! The Topology Builder: reverse-graph construction and reachability partitioning.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use tracing::debug;

use crate::error::Stage;
use crate::logging::stage_span;
use crate::segment::{Graph, SegmentId};

/// Most segments have 0-2 upstreams (a headwater or a simple confluence); this inline capacity
/// avoids a heap allocation for the overwhelmingly common case.
type Upstreams = SmallVec<[SegmentId; 2]>;

/// The reverse (downstream→upstreams) adjacency of a [`Graph`].
///
/// Derived once from the forward graph and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReverseGraph {
    upstreams: HashMap<SegmentId, Upstreams>,
}

impl ReverseGraph {
    /// Builds the reverse graph in `O(N)` by inserting each segment into its downstream's
    /// upstream list.
    pub fn build(graph: &Graph) -> ReverseGraph {
        let mut upstreams: HashMap<SegmentId, Upstreams> = HashMap::new();
        for segment in graph.segment_ids() {
            if let Some(downstream) = graph.downstream_of(segment) {
                if !downstream.is_terminal() {
                    upstreams.entry(downstream).or_default().push(segment);
                }
            }
        }
        for list in upstreams.values_mut() {
            list.sort_unstable();
        }
        ReverseGraph { upstreams }
    }

    /// The upstreams of `segment`, smallest id first, or an empty slice if it is a source.
    pub fn upstreams_of(&self, segment: SegmentId) -> &[SegmentId] {
        self.upstreams
            .get(&segment)
            .map(SmallVec::as_slice)
            .unwrap_or(&[])
    }

    /// The number of immediate upstreams of `segment`.
    pub fn branching_factor(&self, segment: SegmentId) -> usize {
        self.upstreams_of(segment).len()
    }
}

/// A maximal set of segments sharing a tailwater, with no edges to any other such set.
#[derive(Debug, Clone)]
pub struct IndependentNetwork {
    /// The outlet segment of this network.
    pub tailwater: SegmentId,
    /// Every segment reachable upstream of the tailwater, including the tailwater itself.
    pub members: HashSet<SegmentId>,
}

/// Partitions a graph into independent networks, one per tailwater.
///
/// Each tailwater's closure is computed by a BFS through the reverse graph. Closures are
/// pairwise disjoint and their union is the full segment set, since every non-terminal segment
/// has exactly one downstream and forward walks are acyclic (validated at [`Graph`] construction).
pub fn partition_networks(graph: &Graph, reverse: &ReverseGraph) -> Vec<IndependentNetwork> {
    let _guard = stage_span(Stage::Topology).entered();
    let mut networks = Vec::new();
    for tailwater in graph.tailwaters() {
        let mut members = HashSet::new();
        let mut frontier = vec![tailwater];
        members.insert(tailwater);
        while let Some(node) = frontier.pop() {
            for &upstream in reverse.upstreams_of(node) {
                if members.insert(upstream) {
                    frontier.push(upstream);
                }
            }
        }
        debug!(tailwater = %tailwater, size = members.len(), "partitioned independent network");
        networks.push(IndependentNetwork { tailwater, members });
    }
    networks
}

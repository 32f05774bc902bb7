//! The Reach Decomposer: junction-split depth-first decomposition into linear reaches.

use crate::segment::SegmentId;
use crate::topology::{IndependentNetwork, ReverseGraph};

/// A maximal linear chain of segments from a downstream boundary to the next junction or
/// headwater source.
///
/// The sequence runs from the downstream-most segment ([`Reach::entry`], index 0 — the network
/// tailwater for the reach that starts there, or the upstream branch handed down from a parent
/// junction otherwise) to the upstream-most segment ([`Reach::exit`], the last index — a node
/// whose upstream branching factor is never exactly 1, since the traversal only stops at a
/// headwater source or a junction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reach(pub Vec<SegmentId>);

impl Reach {
    /// The segments of this reach, downstream-most first.
    pub fn segments(&self) -> &[SegmentId] {
        &self.0
    }

    /// The downstream-most segment of this reach: where it connects toward the network outlet.
    pub fn entry(&self) -> SegmentId {
        *self.0.first().expect("a reach always has at least one segment")
    }

    /// The upstream-most segment of this reach: a headwater source (0 upstreams) or a junction
    /// (≥2 upstreams), where this reach's upstream branches, if any, begin their own reaches.
    pub fn exit(&self) -> SegmentId {
        *self.0.last().expect("a reach always has at least one segment")
    }
}

/// Decomposes one independent network into an ordered list of reaches.
///
/// The traversal starts at the network's tailwater and walks upstream. A reach is emitted (and
/// closed) as soon as its upstream-most node turns out to have zero or ≥2 upstreams; the
/// algorithm then recurses into each upstream branch, smallest [`SegmentId`] first. Because a
/// junction's own reach is emitted before its branches are recursed into, and within a branch its
/// own sub-reaches are emitted before the function returns to the next sibling, the resulting
/// order satisfies the decomposer's output contract: for reaches A, B in the same network, if A's
/// exit segment is an upstream of some segment in B, A appears before B. The first reach in the
/// returned list always starts at the network's tailwater.
pub fn decompose_network(network: &IndependentNetwork, reverse: &ReverseGraph) -> Vec<Reach> {
    let mut reaches = Vec::new();
    decompose_from(network.tailwater, reverse, &mut reaches);
    reaches
}

fn decompose_from(start: SegmentId, reverse: &ReverseGraph, out: &mut Vec<Reach>) {
    let mut buffer = Vec::new();
    let mut current = start;
    loop {
        buffer.push(current);
        let upstreams = reverse.upstreams_of(current);
        match upstreams.len() {
            0 => {
                out.push(Reach(buffer));
                return;
            }
            1 => {
                current = upstreams[0];
            }
            _ => {
                out.push(Reach(buffer));
                // `upstreams_of` is sorted ascending by `ReverseGraph::build`.
                for &upstream in upstreams {
                    decompose_from(upstream, reverse, out);
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Graph, SegmentRecord};
    use crate::topology::partition_networks;

    fn rec(id: u64, down: u64) -> SegmentRecord {
        SegmentRecord::new(SegmentId::new(id), SegmentId::new(down), [0.0; 9])
    }

    fn only_network(graph: &Graph, reverse: &ReverseGraph) -> IndependentNetwork {
        let mut networks = partition_networks(graph, reverse);
        assert_eq!(networks.len(), 1);
        networks.pop().unwrap()
    }

    #[test]
    fn chain_produces_a_single_reach() {
        let graph = Graph::from_records(vec![rec(1, 2), rec(2, 0)]).unwrap();
        let reverse = ReverseGraph::build(&graph);
        let network = only_network(&graph, &reverse);
        let reaches = decompose_network(&network, &reverse);
        assert_eq!(reaches.len(), 1);
        assert_eq!(reaches[0].segments(), &[SegmentId::new(2), SegmentId::new(1)]);
    }

    #[test]
    fn y_junction_produces_three_reaches_in_contract_order() {
        let graph = Graph::from_records(vec![rec(1, 3), rec(2, 3), rec(3, 0)]).unwrap();
        let reverse = ReverseGraph::build(&graph);
        let network = only_network(&graph, &reverse);
        let reaches = decompose_network(&network, &reverse);
        assert_eq!(reaches.len(), 3);
        assert_eq!(reaches[0].segments(), &[SegmentId::new(3)]);
        assert_eq!(reaches[1].segments(), &[SegmentId::new(1)]);
        assert_eq!(reaches[2].segments(), &[SegmentId::new(2)]);
    }

    #[test]
    fn every_reach_exit_has_branching_factor_other_than_one() {
        let graph = Graph::from_records(vec![
            rec(1, 2),
            rec(2, 5),
            rec(3, 4),
            rec(4, 5),
            rec(5, 0),
        ])
        .unwrap();
        let reverse = ReverseGraph::build(&graph);
        let network = only_network(&graph, &reverse);
        let reaches = decompose_network(&network, &reverse);
        for reach in &reaches {
            assert_ne!(
                reverse.branching_factor(reach.exit()),
                1,
                "reach {:?} should end at a headwater or a junction",
                reach
            );
        }
        assert_eq!(reaches[0].entry(), network.tailwater);
    }

    #[test]
    fn star_graph_with_k_leaves_yields_k_plus_one_reaches() {
        let k = 4;
        let mut records = vec![rec(100, 0)];
        for leaf in 1..=k {
            records.push(rec(leaf, 100));
        }
        let graph = Graph::from_records(records).unwrap();
        let reverse = ReverseGraph::build(&graph);
        let network = only_network(&graph, &reverse);
        let reaches = decompose_network(&network, &reverse);
        assert_eq!(reaches.len(), k as usize + 1);
    }
}

//! The Graph Store: the segment→downstream mapping and per-segment scalar parameters.
//!
//! Immutable after construction. [`Graph::from_records`] is the only way to build one, and it
//! performs the graph-integrity validation of the error taxonomy (duplicate ids, dangling
//! downstreams, cycles) before anything downstream ever sees the graph.

use std::collections::HashMap;

use crate::error::RunError;

/// An opaque, network-wide unique segment identifier.
///
/// `0` is the sentinel denoting "no downstream / terminal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SegmentId(pub u64);

impl SegmentId {
    /// The sentinel id meaning "terminal, no downstream".
    pub const TERMINAL: SegmentId = SegmentId(0);

    /// Constructs a segment id from a raw integer.
    pub fn new(id: u64) -> Self {
        SegmentId(id)
    }

    /// Whether this is the terminal sentinel.
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed per-segment parameter schema: `dt, bw, tw, twcc, dx, n, ncc, cs, s0` (all `f32`).
pub const PARAM_COLUMNS: [&str; 9] = ["dt", "bw", "tw", "twcc", "dx", "n", "ncc", "cs", "s0"];

/// Per-segment scalar parameters, in the fixed order of [`PARAM_COLUMNS`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SegmentParams(pub [f32; PARAM_COLUMNS.len()]);

impl SegmentParams {
    /// Returns the parameter columns as a slice, in `PARAM_COLUMNS` order.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// One input record: a segment, its downstream, and its parameters.
///
/// An optional waterbody identifier is part of the real graph input format but carries no
/// semantics for this core (lake/reservoir routing is out of scope); it is accepted and stored
/// for round-tripping but otherwise unused.
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    /// The segment's own id.
    pub id: SegmentId,
    /// The segment immediately downstream, or [`SegmentId::TERMINAL`].
    pub downstream: SegmentId,
    /// Optional waterbody/reservoir identifier, unused by the core.
    pub waterbody: Option<u64>,
    /// This segment's scalar parameters.
    pub params: SegmentParams,
}

impl SegmentRecord {
    /// Constructs a record with no waterbody identifier.
    pub fn new(id: SegmentId, downstream: SegmentId, params: [f32; PARAM_COLUMNS.len()]) -> Self {
        SegmentRecord {
            id,
            downstream,
            waterbody: None,
            params: SegmentParams(params),
        }
    }
}

/// The immutable segment→downstream mapping and parameter table for one run.
#[derive(Debug, Clone)]
pub struct Graph {
    downstream: HashMap<SegmentId, SegmentId>,
    params: HashMap<SegmentId, SegmentParams>,
}

impl Graph {
    /// Builds a graph from input records, validating graph integrity.
    ///
    /// Rejects duplicate segment ids, non-sentinel downstreams that point outside the record set,
    /// and any cycle in the forward graph.
    pub fn from_records(records: Vec<SegmentRecord>) -> Result<Graph, RunError> {
        let mut downstream = HashMap::with_capacity(records.len());
        let mut params = HashMap::with_capacity(records.len());

        for record in &records {
            if downstream.insert(record.id, record.downstream).is_some() {
                return Err(RunError::DuplicateSegment { segment: record.id });
            }
            params.insert(record.id, record.params);
        }

        for record in &records {
            if !record.downstream.is_terminal() && !downstream.contains_key(&record.downstream) {
                return Err(RunError::DanglingDownstream {
                    segment: record.id,
                    downstream: record.downstream,
                });
            }
        }

        let graph = Graph { downstream, params };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Walks downstream from every segment, failing if any walk revisits a node before reaching
    /// the terminal sentinel.
    fn check_acyclic(&self) -> Result<(), RunError> {
        for &start in self.downstream.keys() {
            let mut seen = std::collections::HashSet::new();
            let mut current = start;
            while !current.is_terminal() {
                if !seen.insert(current) {
                    return Err(RunError::CycleDetected { segment: current });
                }
                current = self.downstream[&current];
            }
        }
        Ok(())
    }

    /// The downstream of a segment, or `None` if the segment is unknown.
    pub fn downstream_of(&self, segment: SegmentId) -> Option<SegmentId> {
        self.downstream.get(&segment).copied()
    }

    /// The scalar parameters of a segment, or `None` if the segment is unknown.
    pub fn params_of(&self, segment: SegmentId) -> Option<&SegmentParams> {
        self.params.get(&segment)
    }

    /// Iterates over every segment id in the graph, in unspecified order.
    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.downstream.keys().copied()
    }

    /// The number of segments in the graph.
    pub fn len(&self) -> usize {
        self.downstream.len()
    }

    /// Whether the graph has no segments.
    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty()
    }

    /// All segments whose downstream is the terminal sentinel.
    pub fn tailwaters(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.downstream
            .iter()
            .filter(|(_, &d)| d.is_terminal())
            .map(|(&s, _)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u64, down: u64) -> SegmentRecord {
        SegmentRecord::new(SegmentId::new(id), SegmentId::new(down), [0.0; 9])
    }

    #[test]
    fn accepts_a_simple_chain() {
        let graph = Graph::from_records(vec![rec(1, 2), rec(2, 0)]).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.downstream_of(SegmentId::new(1)), Some(SegmentId::new(2)));
        assert_eq!(graph.tailwaters().collect::<Vec<_>>(), vec![SegmentId::new(2)]);
    }

    #[test]
    fn rejects_duplicate_segment_ids() {
        let err = Graph::from_records(vec![rec(1, 0), rec(1, 0)]).unwrap_err();
        assert!(matches!(err, RunError::DuplicateSegment { .. }));
    }

    #[test]
    fn rejects_dangling_downstream() {
        let err = Graph::from_records(vec![rec(1, 99)]).unwrap_err();
        assert!(matches!(err, RunError::DanglingDownstream { .. }));
    }

    #[test]
    fn rejects_cycles() {
        let err = Graph::from_records(vec![rec(1, 2), rec(2, 1)]).unwrap_err();
        assert!(matches!(err, RunError::CycleDetected { .. }));
    }
}

//! The Result Assembler: concatenates per-unit kernel results into one table.

use crate::segment::SegmentId;

/// The final time x variable table, indexed by segment id and sorted ascending.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<(SegmentId, Vec<[f32; 3]>)>,
}

impl Table {
    /// Every segment id in this table, ascending.
    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.rows.iter().map(|(id, _)| *id)
    }

    /// The (flow, velocity, depth) series for `segment`, one row per timestep, if present.
    pub fn series_of(&self, segment: SegmentId) -> Option<&[[f32; 3]]> {
        self.rows
            .binary_search_by_key(&segment, |(id, _)| *id)
            .ok()
            .map(|index| self.rows[index].1.as_slice())
    }

    /// The number of segments in this table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether this table has no segments.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds a [`Table`] from the native (non-boundary-passthrough) rows collected across every
/// dispatched unit, sorting them ascending by segment id.
pub fn assemble(mut rows: Vec<(SegmentId, Vec<[f32; 3]>)>) -> Table {
    rows.sort_unstable_by_key(|(id, _)| *id);
    Table { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_sorts_rows_ascending() {
        let table = assemble(vec![
            (SegmentId::new(3), vec![[1.0, 0.0, 0.0]]),
            (SegmentId::new(1), vec![[2.0, 0.0, 0.0]]),
            (SegmentId::new(2), vec![[3.0, 0.0, 0.0]]),
        ]);
        let ids: Vec<_> = table.segment_ids().collect();
        assert_eq!(ids, vec![SegmentId::new(1), SegmentId::new(2), SegmentId::new(3)]);
        assert_eq!(table.series_of(SegmentId::new(2)), Some(&[[3.0, 0.0, 0.0]][..]));
        assert_eq!(table.series_of(SegmentId::new(99)), None);
    }

    #[test]
    fn empty_table_has_no_segments() {
        let table = assemble(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.segment_ids().count(), 0);
    }
}

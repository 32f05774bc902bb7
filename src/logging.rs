//! Structured logging conventions shared by every stage.
//!
//! The crate instruments its pipeline the way the teacher crate instruments its worker/dataflow
//! execution loop with its own logging facility, but through the ecosystem-standard [`tracing`]
//! crate: each stage emits events under a span named for its [`crate::error::Stage`], so a
//! subscriber can filter or aggregate by stage without the crate committing to any particular
//! sink. The crate never installs a global subscriber itself; callers (or the bundled example
//! binary) choose one.

use tracing::{span, Level, Span};

use crate::error::Stage;

/// Opens a span tagged with the given stage, at debug level.
///
/// Each of the pipeline's major phases (topology, decomposition, partition, scheduling, kernel)
/// is expected to run its work inside one of these spans, so per-stage timing and event counts
/// fall out of any `tracing` subscriber for free.
pub fn stage_span(stage: Stage) -> Span {
    span!(Level::DEBUG, "stage", stage = %stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_span_carries_the_stage_name() {
        let span = stage_span(Stage::Scheduling);
        assert!(span.metadata().is_some());
    }
}

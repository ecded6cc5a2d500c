//! Per-request pipeline state

use crate::error::StageError;
use crate::types::{Answer, Context, Query, RoutingDecision, StructuredQueryResult};

/// Position in the forward-only pipeline. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Initialized,
    Routed,
    Retrieved,
    Executed,
    Skipped,
    Generated,
    Refined,
    Finalized,
}

/// State accumulated by one pipeline run. Each field is written by exactly
/// one stage and owned by a single request.
#[derive(Debug)]
pub struct PipelineState {
    pub query: Query,
    pub stage: PipelineStage,
    /// Written by the router
    pub routing: Option<RoutingDecision>,
    /// Written by retrieval (empty on the general branch)
    pub context: Option<Context>,
    /// Written by the structured-query stage
    pub structured: Option<StructuredQueryResult>,
    /// Written by generation, replaced by refinement or the structured stage
    pub answer: Option<Answer>,
    /// Fallbacks taken so far
    pub degraded: Vec<StageError>,
}

impl PipelineState {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            stage: PipelineStage::Initialized,
            routing: None,
            context: None,
            structured: None,
            answer: None,
            degraded: Vec::new(),
        }
    }

    /// Move forward. Going backwards is a programming error.
    pub fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            next > self.stage,
            "pipeline cannot move from {:?} to {:?}",
            self.stage,
            next
        );
        tracing::debug!("Pipeline {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    pub fn record(&mut self, degraded: impl IntoIterator<Item = StageError>) {
        self.degraded.extend(degraded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_forward() {
        let mut state = PipelineState::new(Query::new("q", None).unwrap());
        state.advance(PipelineStage::Routed);
        state.advance(PipelineStage::Executed);
        state.advance(PipelineStage::Finalized);
        assert_eq!(state.stage, PipelineStage::Finalized);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_advance_backwards_panics() {
        let mut state = PipelineState::new(Query::new("q", None).unwrap());
        state.advance(PipelineStage::Generated);
        state.advance(PipelineStage::Routed);
    }
}

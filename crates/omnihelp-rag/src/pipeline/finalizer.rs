//! Terminal step: fold the per-request state into a response

use serde_json::json;

use crate::types::{Metadata, QueryResponse};

use super::state::PipelineState;

/// Build the response. Pure; never fails.
pub fn finalize(state: &PipelineState) -> QueryResponse {
    let answer = state
        .answer
        .as_ref()
        .map(|answer| answer.best().to_string())
        .unwrap_or_default();

    let (sources, retrieved_chunks) = match &state.context {
        Some(context) => (context.sources.clone(), context.chunks.clone()),
        None => (Vec::new(), Vec::new()),
    };

    let mut metadata = Metadata::new();
    if let Some(routing) = &state.routing {
        metadata.insert("intent".to_string(), json!(routing.intent));
        metadata.insert("route_to".to_string(), json!(routing.route_to));
        metadata.insert("confidence".to_string(), json!(routing.confidence));
        metadata.insert("reasoning".to_string(), json!(routing.reasoning));
        metadata.insert("search_strategy".to_string(), json!(routing.search_strategy));
        if !routing.filters.is_empty() {
            metadata.insert("filters".to_string(), json!(routing.filters));
        }
        if let Some(hint) = &routing.hint {
            metadata.insert("hint".to_string(), json!(hint));
        }
    }

    if let Some(answer) = &state.answer {
        metadata.extend(answer.metadata.clone());
    }

    if !state.degraded.is_empty() {
        let degraded: Vec<_> = state.degraded.iter().map(|e| e.to_json()).collect();
        metadata.insert("degraded".to_string(), json!(degraded));
    }

    QueryResponse {
        answer,
        sources,
        retrieved_chunks,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::types::{Answer, Query};

    fn state() -> PipelineState {
        PipelineState::new(Query::new("q", None).unwrap())
    }

    #[test]
    fn test_unrefined_answer_uses_draft() {
        let mut state = state();
        state.answer = Some(Answer::draft("draft"));
        assert_eq!(finalize(&state).answer, "draft");
    }

    #[test]
    fn test_refined_answer_wins() {
        let mut state = state();
        let mut answer = Answer::draft("draft");
        answer.refined = Some("refined".to_string());
        state.answer = Some(answer);
        assert_eq!(finalize(&state).answer, "refined");
    }

    #[test]
    fn test_missing_fields_default() {
        let response = finalize(&state());
        assert_eq!(response.answer, "");
        assert!(response.sources.is_empty());
        assert!(response.retrieved_chunks.is_empty());
        assert!(response.metadata.is_empty());
    }

    #[test]
    fn test_degradations_recorded() {
        let mut state = state();
        state.answer = Some(Answer::draft("fallback"));
        state
            .degraded
            .push(StageError::GenerationUnavailable("offline".to_string()));

        let response = finalize(&state);
        assert_eq!(response.metadata["degraded"][0]["stage"], "generation");
    }
}

//! Query endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/v1/query - Answer a question through the pipeline
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Query: \"{}\"", request.query);
    let response = state.orchestrator().submit(request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::server::testing::test_state;

    #[tokio::test]
    async fn test_query_returns_pipeline_response() {
        let state = test_state();
        let Json(response) = query(
            State(state),
            Json(QueryRequest::new("How do I reset my router?")),
        )
        .await
        .unwrap();

        assert_eq!(response.sources, vec!["manual.pdf"]);
        assert_eq!(response.meta("route_to").unwrap(), "vector_db");
        assert!(response.meta("processing_time_ms").is_some());
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let err = query(State(test_state()), Json(QueryRequest::new("  ")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }
}

//! Chat endpoint: the pipeline answer in the chat client's shape

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /api/v1/chat/query
pub async fn chat_query(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    tracing::info!(
        "Chat query (conversation {}): \"{}\"",
        request.conversation_id.as_deref().unwrap_or("-"),
        request.query
    );

    let response = state
        .orchestrator()
        .submit_query(&request.query, None)
        .await?;
    Ok(Json(ChatResponse::from(response)))
}

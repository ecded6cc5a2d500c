//! Document upload, listing and deletion

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentInfo, DocumentUploadResponse};

/// POST /api/v1/documents/upload - Ingest the multipart `file` field
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidQuery(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::InvalidQuery("Filename is required".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::file_parse(&filename, format!("Failed to read upload: {}", e)))?;

        return ingest_upload(&state, &filename, data.to_vec()).await.map(Json);
    }

    Err(Error::InvalidQuery(
        "Multipart form has no 'file' field".to_string(),
    ))
}

async fn ingest_upload(
    state: &AppState,
    filename: &str,
    data: Vec<u8>,
) -> Result<DocumentUploadResponse> {
    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let info = state.ingest().ingest(filename, data).await?;
    let response = DocumentUploadResponse::from(&info);
    state.add_document(info);
    Ok(response)
}

/// GET /api/v1/documents
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentInfo>> {
    Json(state.list_documents())
}

/// DELETE /api/v1/documents/:id - Delete a document and its chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let removed = state.ingest().remove(id).await?;
    let registered = state.remove_document(&id);

    if registered.is_none() && removed == 0 {
        return Err(Error::NotFound(format!("Document {}", id)));
    }

    tracing::info!("Deleted document {} ({} chunks)", id, removed);
    Ok(Json(json!({
        "message": format!("Document {} deleted successfully", id),
        "chunks_deleted": removed,
    })))
}

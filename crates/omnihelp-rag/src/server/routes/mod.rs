//! API routes, mounted under `/api/v1`

pub mod chat;
pub mod documents;
pub mod orders;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Pipeline
        .route("/query", post(query::query))
        .route("/chat/query", post(chat::chat_query))
        // Documents, with a larger body limit for uploads
        .route(
            "/documents/upload",
            post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", delete(documents::delete_document))
        // Orders and customers
        .route("/orders", post(orders::create_order))
        .route("/orders/:order_id", get(orders::get_order))
        .route("/customers", post(orders::create_customer))
        .route("/customers/:customer_id", get(orders::get_customer))
        .route("/customers/:customer_id/orders", get(orders::customer_orders))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "omnihelp-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Routes support questions to documents, the order database, or the model",
        "endpoints": {
            "POST /api/v1/query": "Answer a question with sources and pipeline metadata",
            "POST /api/v1/chat/query": "Answer a question in the chat format",
            "POST /api/v1/documents/upload": "Upload a PDF, CSV, text or markdown file",
            "GET /api/v1/documents": "List ingested documents",
            "DELETE /api/v1/documents/:id": "Delete a document and its chunks",
            "POST /api/v1/orders": "Create an order",
            "GET /api/v1/orders/:order_id": "Get an order",
            "POST /api/v1/customers": "Create a customer",
            "GET /api/v1/customers/:customer_id": "Get a customer",
            "GET /api/v1/customers/:customer_id/orders": "List a customer's orders"
        }
    }))
}

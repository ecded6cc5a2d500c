//! HTTP server for the query service

pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::VectorIndex;
use state::AppState;

/// Query service HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server with the collaborators the configuration names
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api/v1", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting server on http://{}", addr);
        tracing::info!("API info: http://{}/api/v1/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Service banner
async fn root() -> Json<Value> {
    Json(json!({
        "message": "OmniHelp RAG API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
    }))
}

/// Health check with the indexed chunk count
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    match state.index().count().await {
        Ok(count) => Json(json!({
            "status": "healthy",
            "documents": count,
        })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Json(json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }))
        }
    }
}

/// Ready once the vector index answers
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.index().health_check().await {
        Ok(true) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

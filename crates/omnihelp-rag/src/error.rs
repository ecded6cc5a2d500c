//! Error types for the query orchestration service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected at the request boundary (empty query, bad payload)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Relational store error
    #[error("{0}")]
    Database(String),

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// External call exceeded its time budget
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Generated statement is not a single read-only query
    #[error("Refusing to execute non-read-only statement: {0}")]
    UnsafeQuery(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Conflict(err.to_string())
            }
            _ => Error::Database(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::VectorIndex(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_index_error"),
            Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::UnsafeQuery(_) => (StatusCode::BAD_REQUEST, "unsafe_query"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Pipeline stage that absorbed a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Routing,
    Retrieval,
    StructuredQuery,
    Generation,
    Refinement,
}

/// Stage-local failures. Never escapes a stage: each stage turns these into
/// its fallback value and records the degradation in the response metadata.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// Router had no usable match and the model hint was unavailable
    #[error("classification degraded: {0}")]
    ClassificationDegraded(String),

    /// Embedding or index call failed
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Generated statement missing or rejected by the read-only guard
    #[error("{0}")]
    StructuredQuerySyntax(String),

    /// Relational store rejected the statement
    #[error("{0}")]
    StructuredQueryExecution(String),

    /// Answer generation call failed
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// Refinement call failed
    #[error("refinement unavailable: {0}")]
    RefinementUnavailable(String),
}

impl StageError {
    /// Stage this error belongs to
    pub fn stage(&self) -> StageKind {
        match self {
            Self::ClassificationDegraded(_) => StageKind::Routing,
            Self::RetrievalUnavailable(_) => StageKind::Retrieval,
            Self::StructuredQuerySyntax(_) | Self::StructuredQueryExecution(_) => {
                StageKind::StructuredQuery
            }
            Self::GenerationUnavailable(_) => StageKind::Generation,
            Self::RefinementUnavailable(_) => StageKind::Refinement,
        }
    }

    /// JSON form stored under `metadata.degraded`
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "stage": self.stage(),
            "message": self.to_string(),
        })
    }
}

//! Query request types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Metadata filters, matched by equality (e.g. `{source: "manual.pdf"}`)
pub type Filters = BTreeMap<String, String>;

/// A validated user query. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    filters: Filters,
}

impl Query {
    /// Build a query, rejecting empty or whitespace-only text
    pub fn new(text: impl Into<String>, filters: Option<Filters>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidQuery("Query cannot be empty".to_string()));
        }
        Ok(Self {
            text,
            filters: filters.unwrap_or_default(),
        })
    }

    /// Original query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caller-supplied filters
    pub fn filters(&self) -> &Filters {
        &self.filters
    }
}

/// Body of `POST /api/v1/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of chunks to retrieve (default: 5)
    #[serde(default = "default_n_results")]
    pub n_results: usize,

    /// Optional metadata filters
    #[serde(default)]
    pub filters: Option<Filters>,
}

fn default_n_results() -> usize {
    5
}

impl QueryRequest {
    /// Create a new request with default options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            n_results: default_n_results(),
            filters: None,
        }
    }

    /// Restrict retrieval to one source document
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.filters
            .get_or_insert_with(Filters::new)
            .insert("source".to_string(), source.into());
        self
    }
}

/// Body of `POST /api/v1/chat/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    /// Accepted for client compatibility; conversations are not persisted
    #[serde(default)]
    pub conversation_id: Option<String>,
}

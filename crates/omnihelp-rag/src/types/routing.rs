//! Routing decision types

use serde::{Deserialize, Serialize};

use super::query::Filters;

/// Classified intent of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Manuals, policies, how-to guides
    PolicyDocument,
    /// Orders, deliveries, transactions
    OrderTracking,
    /// Anything else
    General,
    /// Classification could not be completed
    Unknown,
}

/// Downstream data source for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    VectorDb,
    SqlDb,
    GeneralLlm,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::VectorDb => "vector_db",
            Route::SqlDb => "sql_db",
            Route::GeneralLlm => "general_llm",
        }
    }
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PolicyDocument => "policy_document",
            Intent::OrderTracking => "order_tracking",
            Intent::General => "general",
            Intent::Unknown => "unknown",
        }
    }
}

/// How the chosen route gathers context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    VectorSimilaritySearch,
    MetadataFilteredSearch,
    StructuredQuery,
    DirectCompletion,
}

/// Output of the intent router. Produced once per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub route_to: Route,
    /// Always within [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub search_strategy: SearchStrategy,
    /// Filters the retrieval stage should apply
    #[serde(default, skip_serializing_if = "Filters::is_empty")]
    pub filters: Filters,
    /// Advisory explanation from the model, never used for control flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

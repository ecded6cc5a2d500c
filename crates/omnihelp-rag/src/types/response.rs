//! Answer and response types

use serde::{Deserialize, Serialize};

use super::chunk::RetrievedChunk;

/// Free-form response metadata
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One result row: column name to value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Output of the structured-query stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredQueryResult {
    /// Statement produced by the model, after fence stripping
    pub generated_query: String,
    pub rows: Vec<Row>,
    /// Synthesis, guard, or execution failure
    pub error: Option<String>,
}

/// Draft answer plus the optional refined version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    pub draft: String,
    /// Set only once refinement has run
    pub refined: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Answer {
    /// Answer carrying only a draft
    pub fn draft(draft: impl Into<String>) -> Self {
        Self {
            draft: draft.into(),
            refined: None,
            metadata: Metadata::new(),
        }
    }

    /// Refined text when non-empty, otherwise the draft
    pub fn best(&self) -> &str {
        match self.refined.as_deref() {
            Some(refined) if !refined.is_empty() => refined,
            _ => &self.draft,
        }
    }
}

/// Terminal response of the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub retrieved_chunks: Vec<RetrievedChunk>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl QueryResponse {
    /// Value stored under a metadata key
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

/// Response of `POST /api/v1/chat/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub intent: String,
    pub route_to: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<QueryResponse> for ChatResponse {
    fn from(response: QueryResponse) -> Self {
        let text = |key: &str| {
            response
                .meta(key)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };
        let intent = text("intent");
        let route_to = text("route_to");
        let error = response
            .meta("error")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            answer: response.answer,
            intent,
            route_to,
            sources: response.sources,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_best_prefers_non_empty_refined() {
        let mut answer = Answer::draft("draft text");
        assert_eq!(answer.best(), "draft text");

        answer.refined = Some(String::new());
        assert_eq!(answer.best(), "draft text");

        answer.refined = Some("refined text".to_string());
        assert_eq!(answer.best(), "refined text");
    }

    #[test]
    fn test_chat_response_from_query_response() {
        let mut metadata = Metadata::new();
        metadata.insert("intent".to_string(), json!("order_tracking"));
        metadata.insert("route_to".to_string(), json!("sql_db"));
        metadata.insert("error".to_string(), json!("no such table: orders"));

        let chat = ChatResponse::from(QueryResponse {
            answer: "I encountered an error".to_string(),
            metadata,
            ..Default::default()
        });

        assert_eq!(chat.intent, "order_tracking");
        assert_eq!(chat.route_to, "sql_db");
        assert_eq!(chat.error.as_deref(), Some("no such table: orders"));
    }
}

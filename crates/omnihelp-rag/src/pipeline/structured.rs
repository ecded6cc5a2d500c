//! Structured-query stage: model-written SQL against the order store

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StageError;
use crate::providers::{CompletionOptions, LlmProvider, RelationalStore};
use crate::types::{Answer, Row, StructuredQueryResult};

use super::prompt::PromptBuilder;
use super::bounded;

const MISSING_QUERY: &str = "No SQL query generated";

const WRITE_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "replace", "attach", "detach",
    "pragma", "vacuum",
];

/// Everything the structured branch produced
#[derive(Debug, Clone)]
pub struct StructuredOutcome {
    /// Terminal answer for the branch
    pub answer: Answer,
    pub result: StructuredQueryResult,
    pub degraded: Vec<StageError>,
}

/// Turns a question into a guarded read query, runs it, and phrases the rows
pub struct StructuredQueryStage {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn RelationalStore>,
    sql_temperature: f32,
    answer_temperature: f32,
    llm_timeout: Duration,
    db_timeout: Duration,
}

impl StructuredQueryStage {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn RelationalStore>,
        sql_temperature: f32,
        answer_temperature: f32,
        llm_timeout: Duration,
        db_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            store,
            sql_temperature,
            answer_temperature,
            llm_timeout,
            db_timeout,
        }
    }

    /// Answer from the relational store. Never fails: errors surface in the text.
    pub async fn answer_from_store(&self, query: &str) -> StructuredOutcome {
        let mut result = StructuredQueryResult::default();
        let mut degraded = Vec::new();

        let executed = match self.synthesize(query).await {
            Ok(sql) => {
                result.generated_query = sql.clone();
                self.execute(&sql).await
            }
            Err((raw, e)) => {
                result.generated_query = raw;
                Err(e)
            }
        };

        let text = match executed {
            Ok(rows) => {
                result.rows = rows;
                let (text, failure) = self.phrase(query, &result).await;
                degraded.extend(failure);
                text
            }
            Err(e) => {
                tracing::warn!("Structured query failed: {}", e);
                let message = e.to_string();
                result.error = Some(message.clone());
                degraded.push(e);
                format!(
                    "I encountered an error while processing your request: {}",
                    message
                )
            }
        };

        let mut answer = Answer::draft(text);
        answer
            .metadata
            .insert("generated_query".to_string(), json!(result.generated_query));
        answer
            .metadata
            .insert("row_count".to_string(), json!(result.rows.len()));
        if let Some(error) = &result.error {
            answer.metadata.insert("error".to_string(), json!(error));
        }

        StructuredOutcome {
            answer,
            result,
            degraded,
        }
    }

    /// Ask the model for SQL and guard it. The error side carries whatever
    /// text the model produced.
    async fn synthesize(&self, query: &str) -> Result<String, (String, StageError)> {
        let prompt = PromptBuilder::sql_synthesis(query, self.store.schema_description());
        let options = CompletionOptions::with_temperature(self.sql_temperature);

        let completion = self.llm.complete(&prompt, &options);
        let raw = match bounded("sql synthesis", self.llm_timeout, completion).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("SQL synthesis call failed: {}", e);
                return Err((
                    String::new(),
                    StageError::StructuredQuerySyntax(MISSING_QUERY.to_string()),
                ));
            }
        };

        let sql = strip_code_fences(&raw);
        tracing::debug!("Generated SQL query: {}", sql);

        match guard_read_only(&sql) {
            Ok(()) => Ok(sql),
            Err(e) => Err((sql, e)),
        }
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>, StageError> {
        let rows = bounded("database query", self.db_timeout, self.store.execute_read(sql))
            .await
            .map_err(|e| StageError::StructuredQueryExecution(e.to_string()))?;
        tracing::info!("SQL query executed, returned {} rows", rows.len());
        Ok(rows)
    }

    /// Conversational answer; falls back to the raw rows when the model is out
    async fn phrase(
        &self,
        query: &str,
        result: &StructuredQueryResult,
    ) -> (String, Option<StageError>) {
        let rows_text = PromptBuilder::rows_text(&result.rows);
        let prompt = PromptBuilder::sql_answer(query, &rows_text);
        let options = CompletionOptions::with_temperature(self.answer_temperature);

        let completion = self.llm.complete(&prompt, &options);
        match bounded("sql answer", self.llm_timeout, completion).await {
            Ok(text) => (text, None),
            Err(e) => {
                tracing::warn!("SQL answer synthesis failed, returning raw rows: {}", e);
                (
                    format!("Here are the results: {}", rows_text),
                    Some(StageError::GenerationUnavailable(e.to_string())),
                )
            }
        }
    }
}

/// Remove markdown code fences, an optional language tag, and one trailing `;`
pub fn strip_code_fences(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some(rest) = sql.strip_prefix("```") {
        sql = match rest.split_once('\n') {
            Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
            _ => rest,
        };
    }
    if let Some(rest) = sql.trim_end().strip_suffix("```") {
        sql = rest;
    }

    let sql = sql.trim();
    sql.strip_suffix(';').unwrap_or(sql).trim().to_string()
}

/// Accept a single SELECT (or WITH ... SELECT) statement only
pub fn guard_read_only(sql: &str) -> Result<(), StageError> {
    if sql.is_empty() {
        return Err(StageError::StructuredQuerySyntax(MISSING_QUERY.to_string()));
    }

    let mut words = sql
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase());

    match words.next().as_deref() {
        Some("select") | Some("with") => {}
        _ => {
            return Err(StageError::StructuredQuerySyntax(
                "Only SELECT queries are allowed".to_string(),
            ))
        }
    }

    if sql.contains(';') {
        return Err(StageError::StructuredQuerySyntax(
            "Multiple statements are not allowed".to_string(),
        ));
    }

    if let Some(keyword) = words.find(|w| WRITE_KEYWORDS.contains(&w.as_str())) {
        return Err(StageError::StructuredQuerySyntax(format!(
            "Write keyword '{}' is not allowed",
            keyword
        )));
    }

    Ok(())
}

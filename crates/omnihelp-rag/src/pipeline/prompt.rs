//! Prompt templates for every model call the pipeline makes

use crate::types::Row;

/// Prompt builder for routing, SQL, generation, and refinement calls
pub struct PromptBuilder;

impl PromptBuilder {
    /// Advisory classification request; the answer is only ever explanation text
    pub fn router_hint(query: &str) -> String {
        format!(
            r#"Classify the intent of this customer query in one or two sentences.

Query: "{query}"

Categories:
1. policy_document - product manuals, policies, documentation, how-to guides
2. order_tracking - orders, order status, order history, customer orders
3. general - anything else

Explain which category fits and what information would answer it."#,
            query = query
        )
    }

    /// Natural language to a single SQLite read query
    pub fn sql_synthesis(query: &str, schema: &str) -> String {
        format!(
            r#"{schema}

Convert the following natural language query to SQL:
Query: "{query}"

Generate a SQLite-compatible SELECT query. Only return the SQL query, nothing else."#,
            schema = schema,
            query = query
        )
    }

    /// Conversational answer over a row set
    pub fn sql_answer(query: &str, rows_text: &str) -> String {
        format!(
            r#"The user asked: "{query}"

Database query results: {rows}

Provide a clear, natural language answer based on these results. Be conversational and helpful."#,
            query = query,
            rows = rows_text
        )
    }

    /// Grounded answer from retrieved context
    pub fn grounded_answer(query: &str, context: &str) -> String {
        format!(
            r#"You are a helpful assistant that answers questions based on the provided context from documents.

Context from documents:
{context}

User Question: {query}

Instructions:
- Answer the question based solely on the provided context
- If the context doesn't contain enough information, say so clearly
- Be concise but comprehensive
- Cite specific details from the context when relevant
- If the question cannot be answered from the context, politely explain that

Answer:"#,
            context = context,
            query = query
        )
    }

    /// Review pass over a draft answer
    pub fn refinement(query: &str, draft: &str, context_preview: &str) -> String {
        format!(
            r#"Review and refine the following answer to ensure it:
1. Directly addresses the user's question
2. Is clear and well-structured
3. Accurately reflects the provided context
4. Includes source information when relevant

User Question: {query}

Original Answer:
{draft}

Context Used:
{preview}...

Please provide the refined answer. If the original answer is already good, you can return it as-is or make minor improvements.

Refined Answer:"#,
            query = query,
            draft = draft,
            preview = context_preview
        )
    }

    /// Textual form of a row set, shared by the answer prompt and its fallback
    pub fn rows_text(rows: &[Row]) -> String {
        if rows.is_empty() {
            return "No results found.".to_string();
        }
        serde_json::to_string(rows).unwrap_or_else(|_| format!("{:?}", rows))
    }
}

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

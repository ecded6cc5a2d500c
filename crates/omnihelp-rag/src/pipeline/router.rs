//! Keyword intent router with an optional advisory model hint

use std::sync::Arc;
use std::time::Duration;

use crate::error::StageError;
use crate::providers::{CompletionOptions, LlmProvider};
use crate::types::{Filters, Intent, Query, Route, RoutingDecision, SearchStrategy};

use super::prompt::PromptBuilder;
use super::{bounded, Outcome};

/// Transactional keywords. Checked first: a query naming both an order and a
/// manual is about the order.
pub const ORDER_KEYWORDS: &[&str] = &[
    "order",
    "track",
    "status",
    "delivery",
    "shipment",
    "purchase",
    "transaction",
];

/// Documentation keywords
pub const DOCUMENT_KEYWORDS: &[&str] = &[
    "manual",
    "document",
    "policy",
    "how to",
    "guide",
    "instruction",
    "how do i",
];

/// Phrases that introduce a source name
const SOURCE_KEYWORDS: &[&str] = &["in document", "in file", "from", "source"];

const ARTICLES: &[&str] = &["the", "a", "an", "my"];

const KEYWORD_CONFIDENCE: f64 = 0.8;
const DEFAULT_CONFIDENCE: f64 = 0.6;

/// Intent router
pub struct IntentRouter {
    /// Model used for the advisory hint, when enabled
    hint_llm: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
    timeout: Duration,
}

impl IntentRouter {
    /// Keyword-only router
    pub fn new() -> Self {
        Self {
            hint_llm: None,
            temperature: 0.1,
            timeout: Duration::from_secs(30),
        }
    }

    /// Router that also asks the model for an explanation
    pub fn with_hint(llm: Arc<dyn LlmProvider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            hint_llm: Some(llm),
            temperature,
            timeout,
        }
    }

    /// Deterministic classification. Caller filters win over extracted ones.
    pub fn classify(&self, query: &Query) -> RoutingDecision {
        let lowered = query.text().to_ascii_lowercase();

        let (intent, route_to, reasoning) = if contains_any(&lowered, ORDER_KEYWORDS) {
            (
                Intent::OrderTracking,
                Route::SqlDb,
                "Query contains order-related keywords",
            )
        } else if contains_any(&lowered, DOCUMENT_KEYWORDS) {
            (
                Intent::PolicyDocument,
                Route::VectorDb,
                "Query appears to be about documentation or manuals",
            )
        } else {
            (
                Intent::General,
                Route::GeneralLlm,
                "General query, no specific intent detected",
            )
        };

        let mut filters = Filters::new();
        if route_to == Route::VectorDb {
            filters.extend(extract_filters(query.text()));
        }
        filters.extend(query.filters().clone());

        let confidence = if intent == Intent::General {
            DEFAULT_CONFIDENCE
        } else {
            KEYWORD_CONFIDENCE
        };

        RoutingDecision {
            intent,
            route_to,
            confidence,
            reasoning: reasoning.to_string(),
            search_strategy: strategy_for(route_to, &filters),
            filters,
            hint: None,
        }
    }

    /// Classify, then attach the model hint if one is configured
    pub async fn route(&self, query: &Query) -> Outcome<RoutingDecision> {
        let mut decision = self.classify(query);

        let Some(llm) = &self.hint_llm else {
            return Outcome::ok(decision);
        };

        let options = CompletionOptions::with_temperature(self.temperature);
        let prompt = PromptBuilder::router_hint(query.text());

        match bounded("router hint", self.timeout, llm.complete(&prompt, &options)).await {
            Ok(hint) => {
                let hint = hint.trim().to_string();
                if !hint.is_empty() {
                    decision.reasoning = format!("{} (model: {})", decision.reasoning, hint);
                    decision.hint = Some(hint);
                }
                Outcome::ok(decision)
            }
            Err(e) if decision.intent == Intent::General => {
                tracing::warn!("Routing hint failed with no keyword match: {}", e);
                let degraded = RoutingDecision {
                    intent: Intent::Unknown,
                    route_to: Route::GeneralLlm,
                    confidence: 0.0,
                    reasoning: format!("Default classification due to error: {}", e),
                    search_strategy: SearchStrategy::DirectCompletion,
                    filters: decision.filters,
                    hint: None,
                };
                Outcome::degraded(degraded, StageError::ClassificationDegraded(e.to_string()))
            }
            Err(e) => {
                tracing::warn!("Routing hint failed, keeping keyword decision: {}", e);
                Outcome::ok(decision)
            }
        }
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn strategy_for(route: Route, filters: &Filters) -> SearchStrategy {
    match route {
        Route::VectorDb if filters.is_empty() => SearchStrategy::VectorSimilaritySearch,
        Route::VectorDb => SearchStrategy::MetadataFilteredSearch,
        Route::SqlDb => SearchStrategy::StructuredQuery,
        Route::GeneralLlm => SearchStrategy::DirectCompletion,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte offsets of `keyword` in `haystack` that start a word
fn word_starts<'a>(haystack: &'a str, keyword: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack.match_indices(keyword).filter_map(move |(idx, _)| {
        let starts_word = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        starts_word.then_some(idx)
    })
}

/// Substring match: `order` hits `orders` and `reorder` alike
fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Best-effort `source` filter from phrases like "from manual.pdf"
pub fn extract_filters(text: &str) -> Filters {
    let lowered = text.to_ascii_lowercase();

    let hit = SOURCE_KEYWORDS
        .iter()
        .flat_map(|keyword| {
            let lowered = lowered.as_str();
            word_starts(lowered, keyword)
                .filter(move |&idx| {
                    lowered[idx + keyword.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !is_word_char(c))
                })
                .map(move |idx| idx + keyword.len())
        })
        .min();

    let mut filters = Filters::new();
    let Some(end) = hit else {
        return filters;
    };

    let candidate = text[end..]
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .find(|token| !ARTICLES.contains(&token.to_ascii_lowercase().as_str()));

    if let Some(source) = candidate {
        filters.insert("source".to_string(), source.to_string());
    }
    filters
}

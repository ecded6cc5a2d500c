//! Retrieved chunks and the context built from them

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One nearest-neighbour hit from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub distance: Option<f32>,
    pub id: Option<String>,
}

impl RetrievedChunk {
    /// Source document name, `unknown` when metadata exists but names none
    pub fn source(&self) -> Option<&str> {
        match self.metadata.get("source") {
            Some(source) => Some(source.as_str()),
            None if !self.metadata.is_empty() => Some("unknown"),
            None => None,
        }
    }
}

/// Ranked retrieval result handed to generation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Context {
    /// Chunks, closest first
    pub chunks: Vec<RetrievedChunk>,
    /// Chunk contents joined by blank lines
    pub text: String,
    /// Distinct source names
    pub sources: Vec<String>,
}

impl Context {
    /// Context with no chunks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a context from index hits. Hits without a distance sort last.
    pub fn from_chunks(mut chunks: Vec<RetrievedChunk>) -> Self {
        chunks.sort_by(|a, b| match (a.distance, b.distance) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let text = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let sources: BTreeSet<String> = chunks
            .iter()
            .filter_map(|c| c.source().map(str::to_string))
            .collect();

        Self {
            chunks,
            text,
            sources: sources.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length of the context text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, source: Option<&str>, distance: Option<f32>) -> RetrievedChunk {
        let mut metadata = BTreeMap::new();
        if let Some(source) = source {
            metadata.insert("source".to_string(), source.to_string());
        }
        RetrievedChunk {
            content: content.to_string(),
            metadata,
            distance,
            id: None,
        }
    }

    #[test]
    fn test_orders_by_distance_and_dedups_sources() {
        let context = Context::from_chunks(vec![
            chunk("second", Some("manual.pdf"), Some(0.4)),
            chunk("no distance", Some("faq.csv"), None),
            chunk("first", Some("manual.pdf"), Some(0.1)),
        ]);

        assert_eq!(context.text, "first\n\nsecond\n\nno distance");
        assert_eq!(context.sources, vec!["faq.csv".to_string(), "manual.pdf".to_string()]);
    }

    #[test]
    fn test_missing_metadata_adds_no_source() {
        let context = Context::from_chunks(vec![chunk("orphan", None, Some(0.2))]);
        assert!(context.sources.is_empty());
        assert!(!context.is_empty());
    }

    #[test]
    fn test_empty() {
        let context = Context::from_chunks(Vec::new());
        assert!(context.is_empty());
        assert!(context.sources.is_empty());
        assert_eq!(context.char_len(), 0);
    }
}

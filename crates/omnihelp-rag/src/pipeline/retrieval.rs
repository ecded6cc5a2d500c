//! Retrieval stage: query embedding plus nearest-neighbour lookup

use std::sync::Arc;
use std::time::Duration;

use crate::error::StageError;
use crate::providers::{EmbeddingProvider, MetadataFilter, VectorIndex, VectorQueryResult};
use crate::types::{Context, Filters, RetrievedChunk};

use super::{bounded, Outcome};

/// Turns a query into ranked context
pub struct RetrievalStage {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    embed_timeout: Duration,
    index_timeout: Duration,
}

impl RetrievalStage {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        embed_timeout: Duration,
        index_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            embed_timeout,
            index_timeout,
        }
    }

    /// Retrieve up to `k` chunks. Failures yield an empty context.
    pub async fn retrieve(&self, query: &str, filters: &Filters, k: usize) -> Outcome<Context> {
        match self.try_retrieve(query, filters, k).await {
            Ok(context) => {
                tracing::info!(
                    "Retrieved {} chunks from {} sources",
                    context.chunks.len(),
                    context.sources.len()
                );
                Outcome::ok(context)
            }
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing without context: {}", e);
                Outcome::degraded(Context::empty(), e)
            }
        }
    }

    async fn try_retrieve(
        &self,
        query: &str,
        filters: &Filters,
        k: usize,
    ) -> Result<Context, StageError> {
        let embedding = bounded("embedding", self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|e| StageError::RetrievalUnavailable(e.to_string()))?;

        let filter: Option<&MetadataFilter> = (!filters.is_empty()).then_some(filters);
        let result = bounded(
            "vector index query",
            self.index_timeout,
            self.index.query(&embedding, k, filter),
        )
        .await
        .map_err(|e| StageError::RetrievalUnavailable(e.to_string()))?;

        Ok(Context::from_chunks(zip_first_batch(result)))
    }
}

/// Pair up the first batch positionally. Short metadata, distance, or id
/// arrays are padded with defaults.
fn zip_first_batch(result: VectorQueryResult) -> Vec<RetrievedChunk> {
    let documents = result.documents.into_iter().next().unwrap_or_default();
    let metadatas = result.metadatas.into_iter().next().unwrap_or_default();
    let distances = result.distances.into_iter().next().unwrap_or_default();
    let ids = result.ids.into_iter().next().unwrap_or_default();

    documents
        .into_iter()
        .enumerate()
        .map(|(i, content)| RetrievedChunk {
            content,
            metadata: metadatas.get(i).cloned().unwrap_or_default(),
            distance: distances.get(i).copied(),
            id: ids.get(i).cloned(),
        })
        .collect()
}

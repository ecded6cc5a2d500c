//! Upload-to-index pipeline

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::bounded;
use crate::providers::{EmbeddingProvider, MetadataFilter, VectorIndex};
use crate::types::DocumentInfo;

use super::chunker::TextChunker;
use super::parser::{FileParser, ParsedDocument};

/// Parses, chunks, embeds and indexes uploaded documents
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: TextChunker,
    batch_size: usize,
    max_upload_size: usize,
    embed_timeout: Duration,
    index_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker: TextChunker::from_config(&config.chunking),
            batch_size: config.embeddings.batch_size,
            max_upload_size: config.server.max_upload_size,
            embed_timeout: config.timeouts.embedding(),
            index_timeout: config.timeouts.vector_index(),
        }
    }

    /// Ingest one upload, returning its registry entry
    pub async fn ingest(&self, filename: &str, data: Vec<u8>) -> Result<DocumentInfo> {
        let start = Instant::now();

        if data.len() > self.max_upload_size {
            return Err(Error::file_parse(
                filename,
                format!(
                    "file is {} bytes, larger than the {} byte limit",
                    data.len(),
                    self.max_upload_size
                ),
            ));
        }

        // PDF extraction is CPU bound
        let name = filename.to_string();
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse(&name, &data)).await??;

        let document_id = Uuid::new_v4();
        let texts = self.split(&parsed);
        if texts.is_empty() {
            return Err(Error::file_parse(filename, "no chunks produced"));
        }

        let total = texts.len();
        let ids: Vec<String> = (0..total).map(|i| format!("{}_{}", document_id, i)).collect();
        let metadatas: Vec<BTreeMap<String, String>> = (0..total)
            .map(|i| {
                BTreeMap::from([
                    ("source".to_string(), filename.to_string()),
                    ("document_id".to_string(), document_id.to_string()),
                    ("chunk_index".to_string(), i.to_string()),
                    ("total_chunks".to_string(), total.to_string()),
                    (
                        "document_type".to_string(),
                        parsed.document_type.as_str().to_string(),
                    ),
                ])
            })
            .collect();

        let embedding_budget = self.embed_timeout * total.div_ceil(self.batch_size.max(1)) as u32;
        let vectors = bounded(
            "embedding",
            embedding_budget,
            self.embedder.embed_batch(&texts, self.batch_size),
        )
        .await?;

        if vectors.len() != total {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                total,
                vectors.len()
            )));
        }

        let upsert = self.index.upsert(&ids, &vectors, &texts, &metadatas);
        bounded("vector index upsert", self.index_timeout, upsert).await?;

        tracing::info!(
            "Ingested {} ({}) as {} chunks in {:?}",
            filename,
            document_id,
            total,
            start.elapsed()
        );

        Ok(DocumentInfo {
            document_id,
            filename: filename.to_string(),
            document_type: parsed.document_type,
            chunks: total,
            content_hash: parsed.content_hash,
            upload_date: Utc::now(),
        })
    }

    /// Remove every chunk of a document, returning how many were deleted
    pub async fn remove(&self, document_id: Uuid) -> Result<usize> {
        let filter: MetadataFilter =
            BTreeMap::from([("document_id".to_string(), document_id.to_string())]);

        let delete = self.index.delete(None, Some(&filter));
        let removed = bounded("vector index delete", self.index_timeout, delete).await?;
        tracing::info!("Removed {} chunks of document {}", removed, document_id);
        Ok(removed)
    }

    /// Tabular uploads index one row per chunk
    fn split(&self, parsed: &ParsedDocument) -> Vec<String> {
        match &parsed.rows {
            Some(rows) => rows.clone(),
            None => self.chunker.chunk(&parsed.content),
        }
    }
}

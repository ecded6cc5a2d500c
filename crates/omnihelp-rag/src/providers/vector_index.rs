//! Vector index trait for nearest-neighbour lookup over document chunks

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

/// Equality predicate over chunk metadata
pub type MetadataFilter = BTreeMap<String, String>;

/// Query result keyed by query batch position: `documents[0]` holds the hits
/// for the first query vector, and so on.
#[derive(Debug, Clone, Default)]
pub struct VectorQueryResult {
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<BTreeMap<String, String>>>,
    pub distances: Vec<Vec<f32>>,
    pub ids: Vec<Vec<String>>,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorIndex`: in-process cosine index with JSON snapshots
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries; all slices are positional and equally long
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[BTreeMap<String, String>],
    ) -> Result<()>;

    /// Find the `k` nearest entries, closest first
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<VectorQueryResult>;

    /// Delete by ids and/or metadata predicate, returning the number removed
    async fn delete(
        &self,
        ids: Option<&[String]>,
        filter: Option<&MetadataFilter>,
    ) -> Result<usize>;

    /// Number of stored vectors
    async fn count(&self) -> Result<usize>;

    /// Check if the index is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

//! Provider abstractions for the pipeline's external collaborators
//!
//! The pipeline only sees these traits. Ollama backs embeddings and
//! completions; the local index and the SQLite store back retrieval and
//! structured queries.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod relational;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::{CompletionOptions, LlmProvider};
pub use relational::RelationalStore;
pub use vector_index::{MetadataFilter, VectorIndex, VectorQueryResult};

//! Application state for the HTTP server

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::IngestPipeline;
use crate::pipeline::Orchestrator;
use crate::providers::{
    local::{LocalVectorIndex, SqliteOrderStore},
    ollama::OllamaProvider,
    EmbeddingProvider, LlmProvider, RelationalStore, VectorIndex,
};
use crate::types::DocumentInfo;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    orchestrator: Orchestrator,
    ingest: IngestPipeline,
    /// Vector index, also read by the health endpoint
    index: Arc<dyn VectorIndex>,
    /// Order and customer records
    store: Arc<dyn RelationalStore>,
    /// Document registry (persisted to disk when the index is)
    documents: DashMap<Uuid, DocumentInfo>,
    documents_path: Option<PathBuf>,
}

impl AppState {
    /// Build the Ollama clients and local stores named by the configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config.llm, &config.embeddings)?.split();
        tracing::info!(
            "Ollama at {} (generate: {}, embed: {})",
            config.llm.base_url,
            config.llm.generate_model,
            config.embeddings.model
        );

        let index = LocalVectorIndex::from_config(&config)?;
        tracing::info!("Vector index ready with {} chunks", index.count().await?);

        let store = SqliteOrderStore::from_config(&config)?;
        tracing::info!("Order database at {}", config.database.path.display());

        let state = Self::from_parts(
            config,
            Arc::new(embedder),
            Arc::new(index),
            Arc::new(store),
            Arc::new(llm),
        );
        tracing::info!("Loaded {} documents from registry", state.inner.documents.len());
        Ok(state)
    }

    /// Assemble state around already-built collaborators
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RelationalStore>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            &config,
            embedder.clone(),
            index.clone(),
            store.clone(),
            llm,
        );
        let ingest = IngestPipeline::new(&config, embedder, index.clone());

        let documents_path = config
            .vector_index
            .persist_path
            .as_ref()
            .map(|_| config.vector_index.storage_dir().join("documents.json"));
        let documents = documents_path
            .as_deref()
            .map(Self::load_documents)
            .unwrap_or_default();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
                ingest,
                index,
                store,
                documents,
                documents_path,
            }),
        }
    }

    fn load_documents(path: &Path) -> DashMap<Uuid, DocumentInfo> {
        let documents = DashMap::new();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<DocumentInfo>>(&content) {
                    Ok(docs) => {
                        for doc in docs {
                            documents.insert(doc.document_id, doc);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to parse documents.json: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read documents.json: {}", e),
            }
        }

        documents
    }

    fn save_documents(&self) {
        let Some(path) = &self.inner.documents_path else {
            return;
        };

        let mut docs = self.list_documents();
        docs.sort_by_key(|d| d.upload_date);

        match serde_json::to_string_pretty(&docs) {
            Ok(content) => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        tracing::error!("Failed to create {}: {}", parent.display(), e);
                        return;
                    }
                }
                if let Err(e) = fs::write(path, content) {
                    tracing::error!("Failed to save documents.json: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize documents: {}", e),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.inner.index
    }

    pub fn store(&self) -> &Arc<dyn RelationalStore> {
        &self.inner.store
    }

    /// Add a document to the registry (persisted to disk)
    pub fn add_document(&self, doc: DocumentInfo) {
        self.inner.documents.insert(doc.document_id, doc);
        self.save_documents();
    }

    pub fn get_document(&self, id: &Uuid) -> Option<DocumentInfo> {
        self.inner.documents.get(id).map(|d| d.clone())
    }

    /// Remove a document (persisted to disk)
    pub fn remove_document(&self, id: &Uuid) -> Option<DocumentInfo> {
        let removed = self.inner.documents.remove(id).map(|(_, d)| d);
        if removed.is_some() {
            self.save_documents();
        }
        removed
    }

    /// All registered documents, newest first
    pub fn list_documents(&self) -> Vec<DocumentInfo> {
        let mut docs: Vec<DocumentInfo> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        docs
    }
}

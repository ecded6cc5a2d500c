//! Configuration for the query orchestration service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    pub vector_index: VectorIndexConfig,
    /// Order database configuration
    pub database: DatabaseConfig,
    /// Pipeline behaviour
    pub pipeline: PipelineConfig,
    /// Chunking configuration for ingestion
    pub chunking: ChunkingConfig,
    /// Per-service call budgets
    pub timeouts: TimeoutConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply
    /// `OMNIHELP_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OMNIHELP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("OMNIHELP_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("OMNIHELP_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("OMNIHELP_GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(model) = lookup("OMNIHELP_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(path) = lookup("OMNIHELP_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(path) = lookup("OMNIHELP_INDEX_PATH") {
            self.vector_index.persist_path = Some(PathBuf::from(path));
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.top_k == 0 {
            return Err(Error::Config("pipeline.top_k must be at least 1".to_string()));
        }
        if self.pipeline.refinement_preview_chars == 0 {
            return Err(Error::Config(
                "pipeline.refinement_preview_chars must be at least 1".to_string(),
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be at least 1".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(
                "chunking.chunk_overlap must be smaller than chunking.chunk_size".to_string(),
            ));
        }

        let temperatures = [
            ("llm.temperature", self.llm.temperature),
            ("llm.router_temperature", self.llm.router_temperature),
            ("llm.sql_temperature", self.llm.sql_temperature),
            ("llm.sql_answer_temperature", self.llm.sql_answer_temperature),
            ("llm.refinement_temperature", self.llm.refinement_temperature),
        ];
        for (name, value) in temperatures {
            if !(0.0..=2.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within [0, 2], got {}", name, value)));
            }
        }

        if self.database.max_rows == 0 {
            return Err(Error::Config("database.max_rows must be greater than zero".to_string()));
        }

        let budgets = [
            ("timeouts.embedding_secs", self.timeouts.embedding_secs),
            ("timeouts.vector_index_secs", self.timeouts.vector_index_secs),
            ("timeouts.database_secs", self.timeouts.database_secs),
            ("timeouts.llm_secs", self.timeouts.llm_secs),
        ];
        for (name, secs) in budgets {
            if secs == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for answer generation
    pub temperature: f32,
    /// Temperature for the router's advisory hint
    pub router_temperature: f32,
    /// Temperature for SQL synthesis
    pub sql_temperature: f32,
    /// Temperature for answering from SQL rows
    pub sql_answer_temperature: f32,
    /// Temperature for refinement
    pub refinement_temperature: f32,
    /// HTTP client timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            router_temperature: 0.1,
            sql_temperature: 0.1,
            sql_answer_temperature: 0.3,
            refinement_temperature: 0.2,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model served by Ollama
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Batch size for ingestion embedding
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// Snapshot file; `None` keeps the index in memory only
    pub persist_path: Option<PathBuf>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            persist_path: Some(data_dir().join("vector_index.json")),
        }
    }
}

impl VectorIndexConfig {
    /// Directory holding the index snapshot and document registry
    pub fn storage_dir(&self) -> PathBuf {
        self.persist_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(data_dir)
    }
}

/// Order database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: PathBuf,
    /// Rows kept from one model-written query
    pub max_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("omnihelp.db"),
            max_rows: 100,
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of chunks retrieved per query
    pub top_k: usize,
    /// Ask the model for an advisory routing explanation
    pub router_hint: bool,
    /// Context characters shown to the refinement prompt
    pub refinement_preview_chars: usize,
    /// Maximum pipelines in flight (default: CPU count)
    pub max_concurrent: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            router_hint: false,
            refinement_preview_chars: 500,
            max_concurrent: None,
        }
    }
}

impl PipelineConfig {
    /// Effective concurrency bound
    pub fn concurrency(&self) -> usize {
        self.max_concurrent.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 20,
        }
    }
}

/// Per-service call budgets in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embedding_secs: u64,
    pub vector_index_secs: u64,
    pub database_secs: u64,
    pub llm_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: 30,
            vector_index_secs: 10,
            database_secs: 10,
            llm_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn vector_index(&self) -> Duration {
        Duration::from_secs(self.vector_index_secs)
    }

    pub fn database(&self) -> Duration {
        Duration::from_secs(self.database_secs)
    }

    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_secs)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("omnihelp")
}

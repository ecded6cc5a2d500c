//! Local provider implementations using the in-process index and SQLite
//!
//! Both stores are synchronous; calls are moved onto blocking threads.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::Result;
use crate::storage::{InMemoryIndex, OrderDb, SCHEMA_DESCRIPTION};
use crate::types::{Customer, CustomerCreate, Order, OrderCreate, Row};

use super::relational::RelationalStore;
use super::vector_index::{MetadataFilter, VectorIndex, VectorQueryResult};

/// Local vector index wrapping the in-process cosine index
pub struct LocalVectorIndex {
    index: Arc<InMemoryIndex>,
}

impl LocalVectorIndex {
    /// Create from an existing index
    pub fn new(index: Arc<InMemoryIndex>) -> Self {
        Self { index }
    }

    /// Create from config, loading the snapshot when one is configured
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let dimensions = Some(config.embeddings.dimensions);
        let index = match &config.vector_index.persist_path {
            Some(path) => InMemoryIndex::open(path, dimensions)?,
            None => InMemoryIndex::new(dimensions),
        };
        Ok(Self::new(Arc::new(index)))
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[BTreeMap<String, String>],
    ) -> Result<()> {
        let index = self.index.clone();
        let ids = ids.to_vec();
        let vectors = vectors.to_vec();
        let documents = documents.to_vec();
        let metadatas = metadatas.to_vec();
        tokio::task::spawn_blocking(move || index.upsert(&ids, &vectors, &documents, &metadatas))
            .await?
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<VectorQueryResult> {
        let index = self.index.clone();
        let vector = vector.to_vec();
        let filter = filter.cloned();
        tokio::task::spawn_blocking(move || index.query(&vector, k, filter.as_ref())).await?
    }

    async fn delete(
        &self,
        ids: Option<&[String]>,
        filter: Option<&MetadataFilter>,
    ) -> Result<usize> {
        let index = self.index.clone();
        let ids = ids.map(|ids| ids.to_vec());
        let filter = filter.cloned();
        tokio::task::spawn_blocking(move || index.delete(ids.as_deref(), filter.as_ref())).await?
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.index.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-cosine"
    }
}

/// Order store backed by bundled SQLite
pub struct SqliteOrderStore {
    db: Arc<OrderDb>,
    /// SQLite-side budget for one model-written query
    read_timeout: Duration,
    max_rows: usize,
}

impl SqliteOrderStore {
    /// Create from an existing database with default read limits
    pub fn new(db: Arc<OrderDb>) -> Self {
        let defaults = RagConfig::default();
        Self {
            db,
            read_timeout: defaults.timeouts.database(),
            max_rows: defaults.database.max_rows,
        }
    }

    /// Open the database file named in config
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let db = Arc::new(OrderDb::new(&config.database.path)?);
        Ok(Self::new(db).with_read_limits(config.timeouts.database(), config.database.max_rows))
    }

    /// Bound how long a read may run and how many rows it keeps
    pub fn with_read_limits(mut self, read_timeout: Duration, max_rows: usize) -> Self {
        self.read_timeout = read_timeout;
        self.max_rows = max_rows;
        self
    }
}

#[async_trait]
impl RelationalStore for SqliteOrderStore {
    async fn execute_read(&self, sql: &str) -> Result<Vec<Row>> {
        let db = self.db.clone();
        let sql = sql.to_string();
        let (deadline, max_rows) = (self.read_timeout, self.max_rows);
        tokio::task::spawn_blocking(move || db.execute_read(&sql, deadline, max_rows)).await?
    }

    async fn create_order(&self, order: &OrderCreate) -> Result<Order> {
        let db = self.db.clone();
        let order = order.clone();
        tokio::task::spawn_blocking(move || db.create_order(&order)).await?
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let db = self.db.clone();
        let order_id = order_id.to_string();
        tokio::task::spawn_blocking(move || db.get_order(&order_id)).await?
    }

    async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>> {
        let db = self.db.clone();
        let customer_id = customer_id.to_string();
        tokio::task::spawn_blocking(move || db.orders_for_customer(&customer_id)).await?
    }

    async fn create_customer(&self, customer: &CustomerCreate) -> Result<Customer> {
        let db = self.db.clone();
        let customer = customer.clone();
        tokio::task::spawn_blocking(move || db.create_customer(&customer)).await?
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        let db = self.db.clone();
        let customer_id = customer_id.to_string();
        tokio::task::spawn_blocking(move || db.get_customer(&customer_id)).await?
    }

    fn schema_description(&self) -> &str {
        SCHEMA_DESCRIPTION
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

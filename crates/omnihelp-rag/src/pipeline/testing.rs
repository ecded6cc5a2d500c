//! In-test collaborators for pipeline tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::local::SqliteOrderStore;
use crate::providers::{
    CompletionOptions, EmbeddingProvider, LlmProvider, MetadataFilter, RelationalStore,
    VectorIndex, VectorQueryResult,
};
use crate::storage::OrderDb;
use crate::types::{
    Customer, CustomerCreate, Order, OrderCreate, OrderItem, RetrievedChunk, Row,
};

type Reply = std::result::Result<String, String>;

/// Model whose replies are picked by a marker substring of the prompt
pub struct ScriptedLlm {
    rules: Vec<(String, Reply)>,
    default: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: Ok("Scripted answer".to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails
    pub fn failing(message: &str) -> Self {
        Self {
            default: Err(message.to_string()),
            ..Self::new()
        }
    }

    pub fn respond(mut self, marker: &str, reply: &str) -> Self {
        self.rules.push((marker.to_string(), Ok(reply.to_string())));
        self
    }

    pub fn fail(mut self, marker: &str, message: &str) -> Self {
        self.rules.push((marker.to_string(), Err(message.to_string())));
        self
    }

    pub fn with_default(mut self, reply: &str) -> Self {
        self.default = Ok(reply.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default);

        reply.clone().map_err(Error::Llm)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Embedder returning a fixed vector, or failing
pub struct FakeEmbedder {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::embedding("embedding service unreachable"));
        }
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Index returning a canned result and remembering the last query
pub struct FakeIndex {
    result: Option<VectorQueryResult>,
    last_k: Mutex<Option<usize>>,
    last_filter: Mutex<Option<MetadataFilter>>,
}

impl FakeIndex {
    pub fn with_chunks(chunks: &[(&str, &str, f32)]) -> Self {
        let mut result = VectorQueryResult {
            documents: vec![Vec::new()],
            metadatas: vec![Vec::new()],
            distances: vec![Vec::new()],
            ids: vec![Vec::new()],
        };
        for (i, (content, source, distance)) in chunks.iter().enumerate() {
            result.documents[0].push(content.to_string());
            result.metadatas[0].push(BTreeMap::from([(
                "source".to_string(),
                source.to_string(),
            )]));
            result.distances[0].push(*distance);
            result.ids[0].push(format!("chunk_{}", i));
        }

        Self {
            result: Some(result),
            last_k: Mutex::new(None),
            last_filter: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::with_chunks(&[])
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            ..Self::empty()
        }
    }

    pub fn last_k(&self) -> Option<usize> {
        *self.last_k.lock()
    }

    pub fn last_filter(&self) -> Option<MetadataFilter> {
        self.last_filter.lock().clone()
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn upsert(
        &self,
        _ids: &[String],
        _vectors: &[Vec<f32>],
        _documents: &[String],
        _metadatas: &[BTreeMap<String, String>],
    ) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<VectorQueryResult> {
        *self.last_k.lock() = Some(k);
        *self.last_filter.lock() = filter.cloned();
        self.result
            .clone()
            .ok_or_else(|| Error::vector_index("index offline"))
    }

    async fn delete(
        &self,
        _ids: Option<&[String]>,
        _filter: Option<&MetadataFilter>,
    ) -> Result<usize> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .result
            .as_ref()
            .map_or(0, |r| r.documents.first().map_or(0, Vec::len)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.result.is_some())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Store whose reads all fail with the given message
pub struct FailingStore {
    message: String,
}

#[async_trait]
impl RelationalStore for FailingStore {
    async fn execute_read(&self, _sql: &str) -> Result<Vec<Row>> {
        Err(Error::Database(self.message.clone()))
    }

    async fn create_order(&self, _order: &OrderCreate) -> Result<Order> {
        Err(Error::Database(self.message.clone()))
    }

    async fn get_order(&self, _order_id: &str) -> Result<Option<Order>> {
        Err(Error::Database(self.message.clone()))
    }

    async fn orders_for_customer(&self, _customer_id: &str) -> Result<Vec<Order>> {
        Err(Error::Database(self.message.clone()))
    }

    async fn create_customer(&self, _customer: &CustomerCreate) -> Result<Customer> {
        Err(Error::Database(self.message.clone()))
    }

    async fn get_customer(&self, _customer_id: &str) -> Result<Option<Customer>> {
        Err(Error::Database(self.message.clone()))
    }

    fn schema_description(&self) -> &str {
        "orders(order_id, status)"
    }

    fn name(&self) -> &str {
        "failing"
    }
}

pub fn failing_store(message: &str) -> Arc<dyn RelationalStore> {
    Arc::new(FailingStore {
        message: message.to_string(),
    })
}

/// In-memory SQLite holding order 12345 (shipped)
pub fn seeded_store() -> Arc<dyn RelationalStore> {
    let db = OrderDb::in_memory().unwrap();
    db.create_order(&OrderCreate {
        order_id: "12345".to_string(),
        customer_id: "C1".to_string(),
        product_name: "Router X200".to_string(),
        product_model: Some("X200".to_string()),
        order_date: "2024-05-01".to_string(),
        status: "shipped".to_string(),
        total_amount: 129.99,
        items: vec![OrderItem {
            item_name: "Router X200".to_string(),
            quantity: 1,
            price: 129.99,
        }],
    })
    .unwrap();
    Arc::new(SqliteOrderStore::new(Arc::new(db)))
}

pub fn chunk(content: &str, source: &str, distance: f32) -> RetrievedChunk {
    RetrievedChunk {
        content: content.to_string(),
        metadata: BTreeMap::from([("source".to_string(), source.to_string())]),
        distance: Some(distance),
        id: None,
    }
}

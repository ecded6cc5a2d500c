//! State builders for handler tests

use std::sync::Arc;

use crate::config::RagConfig;
use crate::pipeline::testing::{seeded_store, FakeEmbedder, FakeIndex, ScriptedLlm};
use crate::providers::local::LocalVectorIndex;
use crate::providers::VectorIndex;
use crate::storage::InMemoryIndex;

use super::state::AppState;

fn config() -> RagConfig {
    let mut config = RagConfig::default();
    config.vector_index.persist_path = None;
    config.server.max_upload_size = 4096;
    config
}

fn llm() -> Arc<ScriptedLlm> {
    Arc::new(
        ScriptedLlm::new()
            .respond(
                "SQLite-compatible SELECT",
                "SELECT order_id, status FROM orders WHERE order_id = '12345'",
            )
            .respond("Database query results", "Your order 12345 has shipped."),
    )
}

/// State over a canned index holding two manual.pdf chunks
pub fn test_state() -> AppState {
    let index = FakeIndex::with_chunks(&[
        ("Hold the reset button for 10s", "manual.pdf", 0.12),
        ("Power cycle the device", "manual.pdf", 0.31),
    ]);
    AppState::from_parts(
        config(),
        Arc::new(FakeEmbedder::new()),
        Arc::new(index),
        seeded_store(),
        llm(),
    )
}

/// State over a real in-memory index, for ingestion round trips
pub fn indexed_state() -> (AppState, Arc<dyn VectorIndex>) {
    let index: Arc<dyn VectorIndex> =
        Arc::new(LocalVectorIndex::new(Arc::new(InMemoryIndex::new(None))));
    let state = AppState::from_parts(
        config(),
        Arc::new(FakeEmbedder::new()),
        index.clone(),
        seeded_store(),
        llm(),
    );
    (state, index)
}

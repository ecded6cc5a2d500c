//! Orchestrator: sequences the stages for each request

use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{
    CompletionOptions, EmbeddingProvider, LlmProvider, RelationalStore, VectorIndex,
};
use crate::types::{Answer, Context, Filters, Query, QueryRequest, QueryResponse, Route};

use super::finalizer::finalize;
use super::generation::GenerationStage;
use super::refinement::RefinementStage;
use super::retrieval::RetrievalStage;
use super::router::IntentRouter;
use super::state::{PipelineStage, PipelineState};
use super::structured::StructuredQueryStage;
use super::Outcome;

/// Runs one pipeline per query; many may be in flight at once
pub struct Orchestrator {
    router: IntentRouter,
    retrieval: RetrievalStage,
    structured: StructuredQueryStage,
    generation: GenerationStage,
    refinement: RefinementStage,
    /// Bounds in-flight pipelines
    permits: Semaphore,
    top_k: usize,
}

impl Orchestrator {
    /// Wire the stages to their collaborators
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RelationalStore>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let timeouts = &config.timeouts;
        let llm_config = &config.llm;

        let router = if config.pipeline.router_hint {
            IntentRouter::with_hint(llm.clone(), llm_config.router_temperature, timeouts.llm())
        } else {
            IntentRouter::new()
        };

        Self {
            router,
            retrieval: RetrievalStage::new(
                embedder,
                index,
                timeouts.embedding(),
                timeouts.vector_index(),
            ),
            structured: StructuredQueryStage::new(
                llm.clone(),
                store,
                llm_config.sql_temperature,
                llm_config.sql_answer_temperature,
                timeouts.llm(),
                timeouts.database(),
            ),
            generation: GenerationStage::new(
                llm.clone(),
                CompletionOptions::with_temperature(llm_config.temperature),
                timeouts.llm(),
            ),
            refinement: RefinementStage::new(
                llm,
                CompletionOptions::with_temperature(llm_config.refinement_temperature),
                config.pipeline.refinement_preview_chars,
                timeouts.llm(),
            ),
            permits: Semaphore::new(config.pipeline.concurrency()),
            top_k: config.pipeline.top_k,
        }
    }

    /// Entry point. Only a blank query is an error; every other failure
    /// becomes a fallback answer.
    pub async fn submit_query(&self, text: &str, filters: Option<Filters>) -> Result<QueryResponse> {
        let query = Query::new(text, filters)?;
        self.run(query, self.top_k).await
    }

    /// Entry point for API requests carrying their own result count
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryResponse> {
        let query = Query::new(request.query, request.filters)?;
        let k = if request.n_results == 0 {
            self.top_k
        } else {
            request.n_results
        };
        self.run(query, k).await
    }

    async fn run(&self, query: Query, k: usize) -> Result<QueryResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::internal("Pipeline is shutting down"))?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %request_id);
        Ok(self.execute(query, k).instrument(span).await)
    }

    async fn execute(&self, query: Query, k: usize) -> QueryResponse {
        let started = Instant::now();
        let mut state = PipelineState::new(query);

        let routed = self.router.route(&state.query).await;
        state.record(routed.degraded);
        let decision = routed.value;
        tracing::info!(
            "Intent classified: {} -> {} (confidence: {})",
            decision.intent.as_str(),
            decision.route_to.as_str(),
            decision.confidence
        );
        let route = decision.route_to;
        let filters = decision.filters.clone();
        state.routing = Some(decision);
        state.advance(PipelineStage::Routed);

        match route {
            Route::SqlDb => {
                let outcome = self.structured.answer_from_store(state.query.text()).await;
                state.record(outcome.degraded);
                state.structured = Some(outcome.result);
                state.answer = Some(outcome.answer);
                state.context = Some(Context::empty());
                state.advance(PipelineStage::Executed);
            }
            Route::VectorDb => {
                let retrieved = self
                    .retrieval
                    .retrieve(state.query.text(), &filters, k)
                    .await;
                state.record(retrieved.degraded);
                state.context = Some(retrieved.value);
                state.advance(PipelineStage::Retrieved);

                let context = state.context.clone().unwrap_or_default();
                let drafted = self.generation.generate(state.query.text(), &context).await;
                self.refine(&mut state, drafted, &context).await;
            }
            Route::GeneralLlm => {
                state.context = Some(Context::empty());
                state.advance(PipelineStage::Skipped);

                let drafted = self.generation.answer_directly(state.query.text()).await;
                self.refine(&mut state, drafted, &Context::empty()).await;
            }
        }

        let mut response = finalize(&state);
        state.advance(PipelineStage::Finalized);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        response
            .metadata
            .insert("processing_time_ms".to_string(), json!(elapsed_ms));

        tracing::info!(
            "Response finalized in {}ms ({} sources, {} degraded stages)",
            elapsed_ms,
            response.sources.len(),
            state.degraded.len()
        );
        response
    }

    async fn refine(
        &self,
        state: &mut PipelineState,
        drafted: Outcome<String>,
        context: &Context,
    ) {
        state.record(drafted.degraded);
        state.answer = Some(Answer::draft(drafted.value.clone()));
        state.advance(PipelineStage::Generated);

        let refined = self
            .refinement
            .refine(state.query.text(), &drafted.value, context)
            .await;
        state.record(refined.degraded);
        state.answer = Some(refined.value);
        state.advance(PipelineStage::Refined);
    }
}

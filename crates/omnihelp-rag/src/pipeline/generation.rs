//! Generation stage: draft answers from context or straight from the model

use std::sync::Arc;
use std::time::Duration;

use crate::error::StageError;
use crate::providers::{CompletionOptions, LlmProvider};
use crate::types::Context;

use super::prompt::PromptBuilder;
use super::{bounded, Outcome};

/// Returned without a model call when retrieval found nothing
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information to answer your question. \
                                     Please try rephrasing or upload relevant documents.";

/// Returned when the model call fails
pub const GENERATION_FAILED_ANSWER: &str =
    "I apologize, but I encountered an error while generating an answer. Please try again.";

/// Produces the draft answer
pub struct GenerationStage {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl GenerationStage {
    pub fn new(llm: Arc<dyn LlmProvider>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            llm,
            options,
            timeout,
        }
    }

    /// Grounded draft. Empty context short-circuits to a fixed message.
    pub async fn generate(&self, query: &str, context: &Context) -> Outcome<String> {
        if context.is_empty() {
            tracing::info!("No context retrieved, skipping generation");
            return Outcome::ok(NO_CONTEXT_ANSWER.to_string());
        }

        let prompt = PromptBuilder::grounded_answer(query, &context.text);
        self.complete(&prompt).await
    }

    /// Draft for the general branch: the bare query goes to the model
    pub async fn answer_directly(&self, query: &str) -> Outcome<String> {
        self.complete(query).await
    }

    async fn complete(&self, prompt: &str) -> Outcome<String> {
        tracing::debug!("Generation prompt: {} chars", prompt.len());

        match bounded("generation", self.timeout, self.llm.complete(prompt, &self.options)).await {
            Ok(draft) => {
                tracing::info!("Generated draft answer ({} chars)", draft.len());
                Outcome::ok(draft)
            }
            Err(e) => {
                tracing::warn!("Generation failed: {}", e);
                Outcome::degraded(
                    GENERATION_FAILED_ANSWER.to_string(),
                    StageError::GenerationUnavailable(e.to_string()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{chunk, ScriptedLlm};

    fn stage(llm: Arc<ScriptedLlm>) -> GenerationStage {
        GenerationStage::new(
            llm,
            CompletionOptions::with_temperature(0.3),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_empty_context_skips_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let outcome = stage(llm.clone()).generate("anything", &Context::empty()).await;

        assert_eq!(outcome.value, NO_CONTEXT_ANSWER);
        assert!(outcome.degraded.is_none());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_grounded_prompt_carries_context() {
        let llm = Arc::new(ScriptedLlm::new().respond("Context from documents", "Hold reset."));
        let context = Context::from_chunks(vec![chunk("Hold the reset button", "manual.pdf", 0.1)]);

        let outcome = stage(llm.clone()).generate("How do I reset?", &context).await;

        assert_eq!(outcome.value, "Hold reset.");
        assert!(llm.prompts()[0].contains("Hold the reset button"));
    }

    #[tokio::test]
    async fn test_failure_returns_apology() {
        let context = Context::from_chunks(vec![chunk("text", "a.pdf", 0.1)]);
        let outcome = stage(Arc::new(ScriptedLlm::failing("boom")))
            .generate("q", &context)
            .await;

        assert_eq!(outcome.value, GENERATION_FAILED_ANSWER);
        assert!(matches!(
            outcome.degraded,
            Some(StageError::GenerationUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_direct_answer_sends_bare_query() {
        let llm = Arc::new(ScriptedLlm::new().with_default("Paris."));
        let outcome = stage(llm.clone())
            .answer_directly("What is the capital of France?")
            .await;

        assert_eq!(outcome.value, "Paris.");
        assert_eq!(llm.prompts(), vec!["What is the capital of France?".to_string()]);
    }
}

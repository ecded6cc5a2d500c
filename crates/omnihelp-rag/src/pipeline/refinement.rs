//! Refinement stage: second-pass review of the draft

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StageError;
use crate::providers::{CompletionOptions, LlmProvider};
use crate::types::{Answer, Context};

use super::prompt::{preview, PromptBuilder};
use super::{bounded, Outcome};

/// Used when there is no draft to refine
pub const EMPTY_DRAFT_ANSWER: &str = "I couldn't generate an answer. Please try again.";

/// Reviews a draft against the query and a preview of its context
pub struct RefinementStage {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    preview_chars: usize,
    timeout: Duration,
}

impl RefinementStage {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        options: CompletionOptions,
        preview_chars: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            options,
            preview_chars,
            timeout,
        }
    }

    pub async fn refine(&self, query: &str, draft: &str, context: &Context) -> Outcome<Answer> {
        let mut answer = Answer::draft(draft);

        if draft.trim().is_empty() {
            answer.refined = Some(EMPTY_DRAFT_ANSWER.to_string());
            answer.metadata.insert("refined".to_string(), json!(false));
            return Outcome::ok(answer);
        }

        let prompt = PromptBuilder::refinement(
            query,
            draft,
            preview(&context.text, self.preview_chars),
        );

        let completion = self.llm.complete(&prompt, &self.options);
        match bounded("refinement", self.timeout, completion).await {
            Ok(refined) => {
                // Drastically shorter output is treated as truncation
                let refined = if refined.chars().count() * 2 < draft.chars().count() {
                    tracing::info!("Refinement much shorter than draft, keeping draft");
                    draft.to_string()
                } else {
                    refined
                };

                answer.refined = Some(refined);
                answer.metadata.insert("refined".to_string(), json!(true));
                answer
                    .metadata
                    .insert("sources_count".to_string(), json!(context.sources.len()));
                answer
                    .metadata
                    .insert("sources".to_string(), json!(context.sources));
                answer
                    .metadata
                    .insert("context_length".to_string(), json!(context.char_len()));
                Outcome::ok(answer)
            }
            Err(e) => {
                tracing::warn!("Refinement failed, keeping draft: {}", e);
                answer.metadata.insert("refined".to_string(), json!(false));
                answer
                    .metadata
                    .insert("refinement_error".to_string(), json!(e.to_string()));
                Outcome::degraded(answer, StageError::RefinementUnavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{chunk, ScriptedLlm};

    fn stage(llm: Arc<ScriptedLlm>, preview_chars: usize) -> RefinementStage {
        RefinementStage::new(
            llm,
            CompletionOptions::with_temperature(0.2),
            preview_chars,
            Duration::from_secs(5),
        )
    }

    fn context() -> Context {
        Context::from_chunks(vec![
            chunk("Hold the reset button for 10s", "manual.pdf", 0.1),
            chunk("Power cycle the device", "manual.pdf", 0.2),
        ])
    }

    #[tokio::test]
    async fn test_refined_answer_and_metadata() {
        let llm = Arc::new(ScriptedLlm::new().respond(
            "Review and refine",
            "Hold the reset button for ten seconds, then power cycle the device.",
        ));
        let outcome = stage(llm, 500)
            .refine("How do I reset?", "Hold reset for 10s and power cycle.", &context())
            .await;

        let answer = outcome.value;
        assert_eq!(
            answer.best(),
            "Hold the reset button for ten seconds, then power cycle the device."
        );
        assert_eq!(answer.metadata["refined"], true);
        assert_eq!(answer.metadata["sources_count"], 1);
        assert_eq!(answer.metadata["sources"], json!(["manual.pdf"]));
        assert_eq!(
            answer.metadata["context_length"],
            json!(context().char_len())
        );
    }

    #[tokio::test]
    async fn test_short_refinement_keeps_draft() {
        let draft = "The reset button is on the back panel. Hold it for ten seconds.";
        let llm = Arc::new(ScriptedLlm::new().respond("Review and refine", "Hold it."));

        let outcome = stage(llm, 500).refine("reset?", draft, &context()).await;

        assert_eq!(outcome.value.best(), draft);
        assert_eq!(outcome.value.metadata["refined"], true);
    }

    #[tokio::test]
    async fn test_empty_draft_skips_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let outcome = stage(llm.clone(), 500).refine("q", "", &context()).await;

        assert_eq!(outcome.value.best(), EMPTY_DRAFT_ANSWER);
        assert_eq!(outcome.value.metadata["refined"], false);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_draft() {
        let outcome = stage(Arc::new(ScriptedLlm::failing("timeout")), 500)
            .refine("q", "draft answer", &context())
            .await;

        assert_eq!(outcome.value.best(), "draft answer");
        assert!(outcome.value.refined.is_none());
        assert_eq!(outcome.value.metadata["refined"], false);
        assert!(matches!(
            outcome.degraded,
            Some(StageError::RefinementUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_context_preview_is_bounded() {
        let llm = Arc::new(ScriptedLlm::new().respond("Review and refine", "a long enough answer"));
        stage(llm.clone(), 10)
            .refine("q", "draft answer", &context())
            .await;

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Context Used:\nHold the r..."));
        assert!(!prompt.contains("Power cycle"));
    }
}

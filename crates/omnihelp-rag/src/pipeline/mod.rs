//! Query orchestration pipeline
//!
//! Router, retrieval, structured query, generation, refinement, and the
//! finalizer. Every stage absorbs its own failures and hands back a usable
//! value plus an optional degradation record.

pub mod finalizer;
pub mod generation;
pub mod orchestrator;
pub mod prompt;
pub mod refinement;
pub mod retrieval;
pub mod router;
pub mod state;
pub mod structured;

#[cfg(test)]
pub(crate) mod testing;

pub use finalizer::finalize;
pub use generation::GenerationStage;
pub use orchestrator::Orchestrator;
pub use prompt::PromptBuilder;
pub use refinement::RefinementStage;
pub use retrieval::RetrievalStage;
pub use router::IntentRouter;
pub use state::{PipelineStage, PipelineState};
pub use structured::{StructuredOutcome, StructuredQueryStage};

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result, StageError};

/// A stage's value, plus the failure it absorbed to produce it
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub degraded: Option<StageError>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    pub fn degraded(value: T, error: StageError) -> Self {
        Self {
            value,
            degraded: Some(error),
        }
    }
}

/// Run an external call under a time budget
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            secs: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        };

        let err = bounded("slow call", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(err.to_string(), "slow call timed out after 0s");
    }

    #[tokio::test]
    async fn test_bounded_passes_result() {
        let value = bounded("fast", Duration::from_secs(1), async { Ok("done") })
            .await
            .unwrap();
        assert_eq!(value, "done");
    }
}

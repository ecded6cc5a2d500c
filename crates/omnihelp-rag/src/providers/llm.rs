//! LLM provider trait for single-shot completions

use async_trait::async_trait;
use crate::error::Result;

/// Per-call model parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Overrides the provider's default model when set
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            model: None,
        }
    }
}

/// Stateless text-in/text-out completion. No streaming, no conversation memory.
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the default model
    fn model(&self) -> &str;
}

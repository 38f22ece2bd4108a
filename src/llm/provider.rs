//! `TextCompletion`: the single capability the pipeline needs from a model.

use async_trait::async_trait;

use crate::error::LlmError;

/// A system + user prompt pair sent to a model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Text returned by a model.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

/// Submit a prompt, receive text. Implementations may fail for any reason
/// (timeouts, quota, transport); the pipeline decides how to recover.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Model identifier, used to label fallback reasons.
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

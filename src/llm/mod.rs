//! LLM integration for mail-triage.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! `RigAdapter` bridges rig's `CompletionModel` trait to our `TextCompletion` trait.

pub mod provider;
mod rig_adapter;

pub use provider::{CompletionRequest, CompletionResponse, TextCompletion};
pub use rig_adapter::RigAdapter;

use std::str::FromStr;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding the API key for this backend.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "MAIL_TRIAGE_LLM_BACKEND".into(),
                message: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Read backend, model and API key from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: LlmBackend = match std::env::var("MAIL_TRIAGE_LLM_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => LlmBackend::Anthropic,
        };

        let api_key = std::env::var(backend.api_key_var())
            .map_err(|_| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;

        let model = std::env::var("MAIL_TRIAGE_MODEL")
            .unwrap_or_else(|_| backend.default_model().to_string());

        Ok(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model,
        })
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn TextCompletion>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn client_error(provider: &str, e: impl std::fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("client construction failed: {e}"),
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn TextCompletion>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret())
            .map_err(|e| client_error("anthropic", e))?;

    tracing::info!(backend = "anthropic", model = %config.model, "LLM provider ready");
    Ok(Arc::new(RigAdapter::new(
        client.completion_model(&config.model),
        &config.model,
        "anthropic",
    )))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn TextCompletion>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret())
            .map_err(|e| client_error("openai", e))?;

    tracing::info!(backend = "openai", model = %config.model, "LLM provider ready");
    Ok(Arc::new(RigAdapter::new(
        client.completion_model(&config.model),
        &config.model,
        "openai",
    )))
}

//! Error types for mail-triage.
//!
//! The heuristic core never fails; these cover the collaborators around it
//! (configuration, language model, storage, mailbox access).

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Language-model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("No completion provider configured")]
    NotConfigured,

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed JSON store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {name}: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid record name: {0}")]
    InvalidName(String),
}

/// Mailbox source errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Mailbox unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("Failed to parse message {id}: {reason}")]
    Parse { id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Mail Triage: heuristic and LLM-assisted inbox triage.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod source;
pub mod store;

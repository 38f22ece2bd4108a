//! Message triage pipeline.
//!
//! Every fetched message flows through:
//! 1. `normalize()`: pick the plain-text view of the body
//! 2. `MessageProcessor::process()`: heuristic rules or LLM triage
//! 3. `run_batch()`: list, fetch, process and mark across a source
//!
//! Drafting and summaries live in `assistant` and are never applied
//! automatically.

pub mod actions;
pub mod assistant;
pub mod batch;
pub mod normalize;
pub mod processor;
pub mod prompts;
pub mod rules;
pub mod types;

//! Mailbox sources: where messages come from.
//!
//! Sources are pure I/O: list, fetch, mark processed. Triage lives in
//! `pipeline`.

pub mod maildir;
pub mod query;
pub mod snapshot;

pub use maildir::MaildirSource;
pub use query::Query;
pub use snapshot::SnapshotSource;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::pipeline::types::MessageRecord;

/// A mailbox the batch runner can read from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Source name for logging (e.g. "snapshot", "maildir").
    fn name(&self) -> &str;

    /// Ids of messages matching `query`, at most `limit` of them.
    async fn list_ids(&self, query: Option<&str>, limit: usize) -> Result<Vec<String>, SourceError>;

    /// Fetch one message. `Ok(None)` when the id is unknown.
    async fn fetch(&self, id: &str) -> Result<Option<MessageRecord>, SourceError>;

    /// Mark a message as processed. Idempotent.
    async fn mark_processed(&self, id: &str) -> Result<(), SourceError>;
}

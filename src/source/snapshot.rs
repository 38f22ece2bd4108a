//! In-memory source over a saved inbox snapshot.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{SourceError, StoreError};
use crate::pipeline::types::MessageRecord;
use crate::source::MessageSource;
use crate::source::query::Query;
use crate::store::TriageStore;

/// Serves messages from a fixed list, tracking processed ids in memory.
pub struct SnapshotSource {
    records: Vec<MessageRecord>,
    processed: RwLock<HashSet<String>>,
}

impl SnapshotSource {
    pub fn new(records: Vec<MessageRecord>) -> Self {
        Self {
            records,
            processed: RwLock::new(HashSet::new()),
        }
    }

    /// Build a source from the inbox document of a store.
    pub async fn from_store(store: &TriageStore) -> Result<Self, StoreError> {
        let records = store.load_inbox().await?;
        info!(count = records.len(), "Loaded inbox snapshot");
        Ok(Self::new(records))
    }

    pub async fn is_processed(&self, id: &str) -> bool {
        self.processed.read().await.contains(id)
    }
}

#[async_trait]
impl MessageSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn list_ids(&self, query: Option<&str>, limit: usize) -> Result<Vec<String>, SourceError> {
        let query = Query::from_option(query);
        let processed = self.processed.read().await;
        Ok(self
            .records
            .iter()
            .filter(|r| query.matches(r, processed.contains(&r.id)))
            .take(limit)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<MessageRecord>, SourceError> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    async fn mark_processed(&self, id: &str) -> Result<(), SourceError> {
        if self.processed.write().await.insert(id.to_string()) {
            debug!(id = %id, "Marked snapshot message processed");
        }
        Ok(())
    }
}

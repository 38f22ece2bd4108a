//! Typed access to the well-known triage documents.
//!
//! Document names are configuration, handed in at construction:
//! - prompts: the editable `PromptSet`
//! - inbox: message snapshot the app works from
//! - processed: records written back after a batch run
//! - drafts: saved reply drafts
//! - raw: append-only archive of fetched messages

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::StoreError;
use crate::pipeline::prompts::PromptSet;
use crate::pipeline::types::{DraftRecord, MessageRecord};
use crate::store::traits::KeyedStore;

/// Document names for each kind of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocations {
    pub prompts: String,
    pub inbox: String,
    pub processed: String,
    pub drafts: String,
    pub raw: String,
}

impl Default for StoreLocations {
    fn default() -> Self {
        Self {
            prompts: "prompts.json".into(),
            inbox: "mock_inbox.json".into(),
            processed: "processed_inbox.json".into(),
            drafts: "drafts.json".into(),
            raw: "gmail_raw.json".into(),
        }
    }
}

/// Typed helpers over a `KeyedStore`.
#[derive(Clone)]
pub struct TriageStore {
    store: Arc<dyn KeyedStore>,
    locations: StoreLocations,
}

impl TriageStore {
    pub fn new(store: Arc<dyn KeyedStore>, locations: StoreLocations) -> Self {
        Self { store, locations }
    }

    pub fn locations(&self) -> &StoreLocations {
        &self.locations
    }

    async fn load_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.store.load(name).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Malformed {
                    name: name.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn save_as<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Malformed {
            name: name.to_string(),
            source,
        })?;
        self.store.save(name, &value).await
    }

    // ── Prompts ─────────────────────────────────────────────────────

    /// Load saved prompts, or the defaults when none have been saved.
    pub async fn load_prompts(&self) -> Result<PromptSet, StoreError> {
        Ok(self
            .load_as(&self.locations.prompts)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_prompts(&self, prompts: &PromptSet) -> Result<(), StoreError> {
        self.save_as(&self.locations.prompts, prompts).await?;
        info!("Saved prompts");
        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────────

    pub async fn load_inbox(&self) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self
            .load_as(&self.locations.inbox)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_inbox(&self, records: &[MessageRecord]) -> Result<(), StoreError> {
        self.save_as(&self.locations.inbox, records).await
    }

    pub async fn load_processed(&self) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self
            .load_as(&self.locations.processed)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_processed(&self, records: &[MessageRecord]) -> Result<(), StoreError> {
        self.save_as(&self.locations.processed, records).await
    }

    /// Put freshly processed records at the top of the processed document.
    ///
    /// Earlier records survive unless an id was processed again. Returns the
    /// merged list as saved.
    pub async fn merge_processed(
        &self,
        records: &[MessageRecord],
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let fresh: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let mut merged = records.to_vec();
        merged.extend(
            self.load_processed()
                .await?
                .into_iter()
                .filter(|r| !fresh.contains(r.id.as_str())),
        );
        self.save_processed(&merged).await?;
        info!(fresh = records.len(), total = merged.len(), "Merged processed messages");
        Ok(merged)
    }

    /// Append fetched messages to the raw archive.
    pub async fn append_raw(&self, records: &[MessageRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut archive: Vec<MessageRecord> = self
            .load_as(&self.locations.raw)
            .await?
            .unwrap_or_default();
        archive.extend_from_slice(records);
        self.save_as(&self.locations.raw, &archive).await
    }

    // ── Drafts ──────────────────────────────────────────────────────

    pub async fn load_drafts(&self) -> Result<Vec<DraftRecord>, StoreError> {
        Ok(self
            .load_as(&self.locations.drafts)
            .await?
            .unwrap_or_default())
    }

    /// Append a draft and persist the full list.
    pub async fn append_draft(&self, draft: DraftRecord) -> Result<(), StoreError> {
        let mut drafts = self.load_drafts().await?;
        info!(email_id = %draft.email_id, draft_id = %draft.id, "Saving draft");
        drafts.push(draft);
        self.save_as(&self.locations.drafts, &drafts).await
    }
}

//! `KeyedStore` trait: load/save named JSON documents.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Backend-agnostic store of named JSON documents.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Load a document. `Ok(None)` when nothing has been saved under `name`.
    async fn load(&self, name: &str) -> Result<Option<Value>, StoreError>;

    /// Save (overwrite) a document.
    async fn save(&self, name: &str, value: &Value) -> Result<(), StoreError>;
}

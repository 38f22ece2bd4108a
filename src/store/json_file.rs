//! File-backed `KeyedStore`: one pretty-printed JSON file per document name.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;
use crate::store::traits::KeyedStore;

/// JSON documents stored under a root directory chosen at construction.
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a document name to a path, refusing anything that escapes the root.
    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl KeyedStore for JsonFileStore {
    async fn load(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let path = self.resolve(name)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let value = serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    async fn save(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Malformed {
            name: name.to_string(),
            source,
        })?;
        fs::write(&path, content)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (JsonFileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        (store, dir)
    }

    #[tokio::test]
    async fn save_load_roundtrip() {
        let (store, _dir) = test_store();
        let value = serde_json::json!({"categorization_prompt": "classify"});
        store.save("prompts.json", &value).await.unwrap();
        assert_eq!(store.load("prompts.json").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let (store, _dir) = test_store();
        assert!(store.load("nope.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_document_is_none() {
        let (store, dir) = test_store();
        std::fs::write(dir.path().join("raw.json"), "  \n").unwrap();
        assert!(store.load("raw.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_document_is_error() {
        let (store, dir) = test_store();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let err = store.load("bad.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn save_creates_parent_dirs() {
        let (store, _dir) = test_store();
        store
            .save("nested/drafts.json", &serde_json::json!([]))
            .await
            .unwrap();
        assert_eq!(
            store.load("nested/drafts.json").await.unwrap(),
            Some(serde_json::json!([]))
        );
    }

    #[tokio::test]
    async fn rejects_escaping_names() {
        let (store, _dir) = test_store();
        for name in ["../outside.json", "/etc/passwd", ""] {
            let err = store.load(name).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "{name}");
        }
    }
}

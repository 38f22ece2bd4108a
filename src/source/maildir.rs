//! Directory-of-`.eml` mailbox source.
//!
//! Layout:
//! - `<root>/*.eml`: unprocessed messages
//! - `<root>/processed/*.eml`: messages already marked processed
//!
//! A message id is its file stem. Marking processed moves the file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mail_parser::MessageParser;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::pipeline::types::{MessageBody, MessageRecord};
use crate::source::MessageSource;
use crate::source::query::Query;

const PROCESSED_DIR: &str = "processed";
const EML_EXTENSION: &str = "eml";

pub struct MaildirSource {
    root: PathBuf,
}

impl MaildirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    fn inbox_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{EML_EXTENSION}"))
    }

    fn processed_path(&self, id: &str) -> PathBuf {
        self.processed_dir().join(format!("{id}.{EML_EXTENSION}"))
    }

    /// Locate a message file. Returns the path and whether it is processed.
    fn locate(&self, id: &str) -> Option<(PathBuf, bool)> {
        if !is_valid_id(id) {
            return None;
        }
        let inbox = self.inbox_path(id);
        if inbox.is_file() {
            return Some((inbox, false));
        }
        let processed = self.processed_path(id);
        processed.is_file().then_some((processed, true))
    }

    /// Ids of `.eml` files directly inside `dir`.
    async fn ids_in(dir: &Path) -> Result<Vec<String>, SourceError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EML_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }

    async fn read_record(&self, id: &str, path: &Path) -> Result<MessageRecord, SourceError> {
        let raw = fs::read(path).await?;
        parse_message(id, &raw)
    }
}

/// Ids become file names, so reject anything that could leave the mailbox.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && id != "." && id != ".."
}

/// Convert raw RFC 5322 bytes into a `MessageRecord`.
pub fn parse_message(id: &str, raw: &[u8]) -> Result<MessageRecord, SourceError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| SourceError::Parse {
            id: id.to_string(),
            reason: "not an RFC 5322 message".into(),
        })?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .map(|a| match (a.name(), a.address()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => "(unknown)".to_string(),
        })
        .unwrap_or_else(|| "(unknown)".into());

    // body_text falls back to a text rendering of the HTML part when no
    // plain part exists.
    let body = MessageBody::Structured {
        text: parsed.body_text(0).map(|t| t.into_owned()),
        html: parsed.body_html(0).map(|h| h.into_owned()),
    };

    let mut record = MessageRecord::new(id, body)
        .with_sender(sender)
        .with_subject(parsed.subject().unwrap_or("(no subject)"))
        .with_timestamp(parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default());

    if let Some(message_id) = parsed.message_id() {
        record.extra.insert(
            "message_id".into(),
            serde_json::Value::String(message_id.to_string()),
        );
    }

    Ok(record)
}

#[async_trait]
impl MessageSource for MaildirSource {
    fn name(&self) -> &str {
        "maildir"
    }

    async fn list_ids(&self, query: Option<&str>, limit: usize) -> Result<Vec<String>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Unavailable {
                path: self.root.clone(),
                reason: "not a directory".into(),
            });
        }

        let mut candidates: Vec<(String, bool)> = Self::ids_in(&self.root)
            .await?
            .into_iter()
            .map(|id| (id, false))
            .collect();
        candidates.extend(
            Self::ids_in(&self.processed_dir())
                .await?
                .into_iter()
                .map(|id| (id, true)),
        );
        candidates.sort();
        candidates.dedup_by(|a, b| a.0 == b.0);

        let query = Query::from_option(query);
        let mut ids = Vec::new();
        for (id, processed) in candidates {
            if ids.len() >= limit {
                break;
            }
            if query.is_empty() {
                ids.push(id);
                continue;
            }
            let Some((path, _)) = self.locate(&id) else {
                continue;
            };
            match self.read_record(&id, &path).await {
                Ok(record) if query.matches(&record, processed) => ids.push(id),
                Ok(_) => {}
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable message while listing"),
            }
        }
        Ok(ids)
    }

    async fn fetch(&self, id: &str) -> Result<Option<MessageRecord>, SourceError> {
        let Some((path, _)) = self.locate(id) else {
            return Ok(None);
        };
        self.read_record(id, &path).await.map(Some)
    }

    async fn mark_processed(&self, id: &str) -> Result<(), SourceError> {
        match self.locate(id) {
            Some((path, false)) => {
                fs::create_dir_all(self.processed_dir()).await?;
                fs::rename(&path, self.processed_path(id)).await?;
                debug!(id = %id, "Moved message to processed");
                Ok(())
            }
            Some((_, true)) => Ok(()),
            None => {
                warn!(id = %id, "Cannot mark unknown message processed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PLAIN: &str = "From: Alice <alice@example.com>\r\n\
        To: me@example.com\r\n\
        Subject: Budget review\r\n\
        Date: Mon, 1 Apr 2024 09:00:00 +0000\r\n\
        Message-ID: <abc@example.com>\r\n\
        \r\n\
        Could you review the budget?\r\n";

    const NEWSLETTER: &str = "From: news@example.com\r\n\
        Subject: Weekly news\r\n\
        \r\n\
        Click to unsubscribe.\r\n";

    fn mailbox() -> (MaildirSource, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.eml"), PLAIN).unwrap();
        std::fs::write(dir.path().join("b.eml"), NEWSLETTER).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        (MaildirSource::new(dir.path()), dir)
    }

    #[test]
    fn parses_headers_and_body() {
        let record = parse_message("a", PLAIN.as_bytes()).unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(record.sender.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(record.subject.as_deref(), Some("Budget review"));
        assert!(!record.timestamp.as_deref().unwrap_or("").is_empty());
        assert_eq!(record.extra["message_id"], "abc@example.com");
        match &record.body {
            MessageBody::Structured { text, .. } => {
                assert!(text.as_deref().unwrap().contains("Could you review the budget?"));
            }
            other => panic!("Expected structured body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lists_eml_files_sorted() {
        let (source, _dir) = mailbox();
        assert_eq!(source.list_ids(None, 10).await.unwrap(), vec!["a", "b"]);
        assert_eq!(source.list_ids(None, 1).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn query_reads_messages() {
        let (source, _dir) = mailbox();
        assert_eq!(
            source.list_ids(Some("from:news"), 10).await.unwrap(),
            vec!["b"]
        );
    }

    #[tokio::test]
    async fn mark_processed_moves_file() {
        let (source, dir) = mailbox();
        source.mark_processed("a").await.unwrap();
        source.mark_processed("a").await.unwrap();

        assert!(!dir.path().join("a.eml").exists());
        assert!(dir.path().join("processed/a.eml").exists());
        assert!(source.fetch("a").await.unwrap().is_some());

        let unprocessed = source
            .list_ids(Some("-label:processed"), 10)
            .await
            .unwrap();
        assert_eq!(unprocessed, vec!["b"]);
    }

    #[tokio::test]
    async fn unknown_and_invalid_ids() {
        let (source, _dir) = mailbox();
        assert!(source.fetch("missing").await.unwrap().is_none());
        assert!(source.fetch("../a").await.unwrap().is_none());
        source.mark_processed("missing").await.unwrap();
    }

    #[tokio::test]
    async fn missing_root_is_unavailable() {
        let source = MaildirSource::new("/definitely/not/here");
        assert!(matches!(
            source.list_ids(None, 10).await,
            Err(SourceError::Unavailable { .. })
        ));
    }
}

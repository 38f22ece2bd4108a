//! Shared types for the triage pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ConfigError;

// ── Message body ────────────────────────────────────────────────────

/// Body of a message as delivered by a mailbox source or loaded from disk.
///
/// Persisted as either `{"text": ..., "html": ...}` or a bare string.
/// Reading is lenient: `null` is an empty body and any other scalar is kept
/// as raw text, so one odd record never fails a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Structured {
        text: Option<String>,
        html: Option<String>,
    },
    Raw(String),
}

impl Default for MessageBody {
    fn default() -> Self {
        Self::Structured {
            text: None,
            html: None,
        }
    }
}

impl<'de> Deserialize<'de> for MessageBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Self::default(),
            Value::String(raw) => Self::Raw(raw),
            Value::Object(mut map) => Self::Structured {
                text: body_part(map.remove("text")),
                html: body_part(map.remove("html")),
            },
            other => Self::Raw(other.to_string()),
        })
    }
}

fn body_part(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(part) => Some(part),
        other => Some(other.to_string()),
    }
}

impl MessageBody {
    /// Structured body with only a plain-text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Structured {
            text: Some(text.into()),
            html: None,
        }
    }

    /// Convert a raw body into the structured `{text, html}` shape.
    pub fn into_structured(self) -> Self {
        match self {
            Self::Raw(raw) => Self::Structured {
                text: Some(raw),
                html: None,
            },
            structured => structured,
        }
    }
}

// ── Category ────────────────────────────────────────────────────────

/// Triage category assigned to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Important,
    Newsletter,
    Spam,
    #[serde(rename = "To-Do")]
    ToDo,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Important => "Important",
            Self::Newsletter => "Newsletter",
            Self::Spam => "Spam",
            Self::ToDo => "To-Do",
            Self::Unknown => "Unknown",
        }
    }

    /// Lenient label parsing for model output. Unrecognised labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "important" => Self::Important,
            "newsletter" => Self::Newsletter,
            "spam" => Self::Spam,
            "to-do" | "todo" | "to do" => Self::ToDo,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Action items ────────────────────────────────────────────────────

/// A task extracted from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl ActionItem {
    /// An action item with no known deadline.
    pub fn undated(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            deadline: None,
        }
    }
}

// ── Message record ──────────────────────────────────────────────────

/// One email, as fetched from a source or loaded from the inbox snapshot.
///
/// Processing only ever writes `category`, `category_reason` and
/// `action_items`. Anything else a caller attached travels in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub body: MessageBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<ActionItem>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageRecord {
    pub fn new(id: impl Into<String>, body: MessageBody) -> Self {
        Self {
            id: id.into(),
            sender: None,
            subject: None,
            timestamp: None,
            body,
            category: None,
            category_reason: None,
            action_items: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Subject line, empty when absent.
    pub fn subject_str(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Sender, empty when absent.
    pub fn sender_str(&self) -> &str {
        self.sender.as_deref().unwrap_or("")
    }

    /// Whether the record already carries triage results.
    pub fn is_processed(&self) -> bool {
        self.category.is_some()
    }
}

// ── Processing mode ─────────────────────────────────────────────────

/// How the orchestrator treats a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Ask the language model for category and action items.
    Llm,
    /// Keyword rules only, no model call.
    Heuristic,
    /// Leave the record untouched.
    Skip,
}

impl ProcessingMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
            Self::Skip => "skip",
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "heuristic" | "simulate" => Ok(Self::Heuristic),
            "skip" | "none" => Ok(Self::Skip),
            other => Err(ConfigError::InvalidValue {
                key: "processing mode".into(),
                message: format!("expected llm, heuristic or skip, got '{other}'"),
            }),
        }
    }
}

// ── Drafts ──────────────────────────────────────────────────────────

/// A reply drafted by the assistant. Never sent automatically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyDraft {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub suggested_followups: Vec<String>,
}

/// A saved draft, as persisted in the drafts document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: Uuid,
    pub email_id: String,
    #[serde(default)]
    pub original_subject: Option<String>,
    pub draft_subject: String,
    pub draft_body: String,
    #[serde(default)]
    pub suggested_followups: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl DraftRecord {
    /// Build the persisted record for a draft written against `record`.
    pub fn from_reply(record: &MessageRecord, draft: ReplyDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_id: record.id.clone(),
            original_subject: record.subject.clone(),
            draft_subject: draft.subject,
            draft_body: draft.body,
            suggested_followups: draft.suggested_followups,
            created_at: Utc::now(),
        }
    }
}

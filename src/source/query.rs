//! Small mailbox search syntax shared by the local sources.
//!
//! Whitespace-separated terms, all of which must match:
//! - `from:alice`: sender contains "alice"
//! - `subject:invoice`: subject contains "invoice"
//! - `-label:processed`: exclude processed messages
//! - `label:processed`: only processed messages
//! - any other word: sender, subject or body text contains it
//!
//! Matching is case-insensitive. Unrecognised `key:value` operators are
//! ignored so provider-style queries (`is:unread`) still work.

use crate::pipeline::normalize::normalize;
use crate::pipeline::types::MessageRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    From(String),
    Subject(String),
    Text(String),
    Processed(bool),
}

/// A parsed query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<Term>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        let terms = input
            .split_whitespace()
            .filter_map(|token| {
                let lower = token.to_lowercase();
                match lower.split_once(':') {
                    Some(("from", value)) if !value.is_empty() => Some(Term::From(value.into())),
                    Some(("subject", value)) if !value.is_empty() => {
                        Some(Term::Subject(value.into()))
                    }
                    Some(("-label", "processed")) => Some(Term::Processed(false)),
                    Some(("label", "processed")) => Some(Term::Processed(true)),
                    Some(_) => None,
                    None => Some(Term::Text(lower)),
                }
            })
            .collect();
        Self { terms }
    }

    /// Parse an optional query; `None` matches everything.
    pub fn from_option(input: Option<&str>) -> Self {
        input.map(Self::parse).unwrap_or_default()
    }

    /// Whether the query has no effective terms and matches everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, record: &MessageRecord, processed: bool) -> bool {
        let sender = record.sender_str().to_lowercase();
        let subject = record.subject_str().to_lowercase();

        self.terms.iter().all(|term| match term {
            Term::From(value) => sender.contains(value),
            Term::Subject(value) => subject.contains(value),
            Term::Processed(wanted) => processed == *wanted,
            Term::Text(value) => {
                sender.contains(value)
                    || subject.contains(value)
                    || normalize(&record.body).to_lowercase().contains(value)
            }
        })
    }
}

//! Heuristic action-item extraction.
//!
//! Scans the body line by line for request language. When the body yields
//! nothing, a request-like subject becomes a single synthetic item.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::rules::keyword_regex;
use crate::pipeline::types::ActionItem;

/// Line-scanning extractor with a subject fallback.
pub struct ActionExtractor {
    line_pattern: Regex,
    subject_pattern: Regex,
}

static DEFAULT_EXTRACTOR: LazyLock<ActionExtractor> = LazyLock::new(ActionExtractor::default_rules);

impl ActionExtractor {
    /// Create an extractor with the standard request keywords.
    pub fn default_rules() -> Self {
        Self {
            line_pattern: keyword_regex(&[
                "please",
                "could you",
                "can you",
                "please review",
                "please confirm",
                "action:",
                "todo",
            ]),
            subject_pattern: keyword_regex(&["task", "request", "todo", "please"]),
        }
    }

    /// Extract action items in order of appearance. Total, never fails.
    pub fn extract(&self, subject: &str, body: &str) -> Vec<ActionItem> {
        // A bare carriage return counts as a line break too.
        let mut items: Vec<ActionItem> = body
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| !line.is_empty() && self.line_pattern.is_match(line))
            .map(ActionItem::undated)
            .collect();

        if items.is_empty() && self.subject_pattern.is_match(subject) {
            debug!(subject = %subject, "No body actions, using subject as task");
            items.push(ActionItem::undated(subject));
        }

        items
    }
}

/// Extract action items with the standard keywords.
pub fn extract_actions(subject: &str, body: &str) -> Vec<ActionItem> {
    DEFAULT_EXTRACTOR.extract(subject, body)
}

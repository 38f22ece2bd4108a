//! Heuristic classifier: keyword rules used when no model call is made.
//!
//! Rules run in a fixed priority order and the first match wins:
//! - newsletter/unsubscribe language → Newsletter
//! - spammy promotion language → Spam
//! - direct requests in the body → To-Do
//! - anything else → Important
//!
//! Newsletter and spam rules sit above the request rule so that
//! "please subscribe" footers never file a mailing as a to-do.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::Category;

/// Reason attached when no keyword rule matches.
pub const DEFAULT_REASON: &str = "Default fallback";

/// Which part of the message a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Subject,
    Body,
}

/// A keyword rule mapping matches to a category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Case-insensitive alternation of the rule's keywords.
    pub regex: Regex,
    /// Haystacks the rule is checked against. A match in any of them fires.
    pub fields: Vec<RuleField>,
    pub category: Category,
    pub reason: String,
}

impl CategoryRule {
    fn matches(&self, subject: &str, body: &str) -> bool {
        self.fields.iter().any(|field| match field {
            RuleField::Subject => self.regex.is_match(subject),
            RuleField::Body => self.regex.is_match(body),
        })
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub reason: String,
}

/// Build a case-insensitive substring matcher for a keyword list.
pub fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{alternation})")).expect("escaped keywords always compile")
}

/// Ordered keyword rules with an unconditional Important fallback.
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

static DEFAULT_CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::default_rules);

impl Classifier {
    /// Create a classifier with the standard triage rules.
    pub fn default_rules() -> Self {
        let rules = vec![
            CategoryRule {
                regex: keyword_regex(&["unsubscribe", "newsletter", "subscribe", "weekly"]),
                fields: vec![RuleField::Body, RuleField::Subject],
                category: Category::Newsletter,
                reason: "Contains newsletter/unsubscribe keywords".into(),
            },
            CategoryRule {
                regex: keyword_regex(&["free", "win", "congratulations", "offer"]),
                fields: vec![RuleField::Body, RuleField::Subject],
                category: Category::Spam,
                reason: "Contains spammy keywords".into(),
            },
            // Requests only count when they appear in the body.
            CategoryRule {
                regex: keyword_regex(&[
                    "please",
                    "could you",
                    "can you",
                    "please review",
                    "please confirm",
                    "action",
                    "deadline",
                ]),
                fields: vec![RuleField::Body],
                category: Category::ToDo,
                reason: "Contains direct request or action language".into(),
            },
        ];

        Self { rules }
    }

    /// Create a classifier with no keyword rules; everything falls back to Important.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a custom rule. It runs after all existing rules.
    pub fn add_rule(
        &mut self,
        keywords: &[&str],
        fields: &[RuleField],
        category: Category,
        reason: &str,
    ) {
        self.rules.push(CategoryRule {
            regex: keyword_regex(keywords),
            fields: fields.to_vec(),
            category,
            reason: reason.into(),
        });
    }

    /// Classify a message. Total: every input maps to exactly one category.
    pub fn classify(&self, subject: &str, body: &str) -> Classification {
        for rule in &self.rules {
            if rule.matches(subject, body) {
                debug!(
                    category = %rule.category,
                    reason = %rule.reason,
                    "Message matched category rule"
                );
                return Classification {
                    category: rule.category,
                    reason: rule.reason.clone(),
                };
            }
        }

        Classification {
            category: Category::Important,
            reason: DEFAULT_REASON.into(),
        }
    }
}

/// Classify with the standard rules.
pub fn classify(subject: &str, body: &str) -> (Category, String) {
    let Classification { category, reason } = DEFAULT_CLASSIFIER.classify(subject, body);
    (category, reason)
}

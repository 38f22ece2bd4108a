//! Message processor: the orchestrator between heuristics and the model.
//!
//! Per message, the processing mode decides:
//! - `Skip`: record returned untouched
//! - `Heuristic`: normalize → keyword classifier → line extractor
//! - `Llm`: two independent completions, one for category, one for action items
//!
//! Model failures never escape `process`. Each completion resolves to an
//! `Outcome`, and a `Fallback` becomes `Unknown` or an empty action list.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::pipeline::actions::ActionExtractor;
use crate::pipeline::normalize::normalize;
use crate::pipeline::prompts::{PromptSet, action_items_user_prompt, categorization_user_prompt};
use crate::pipeline::rules::{Classification, Classifier};
use crate::pipeline::types::{ActionItem, Category, MessageRecord, ProcessingMode};

/// Origin label used in fallback reasons when no model is configured.
const DEFAULT_ORIGIN: &str = "LLM";

/// Temperature for categorization and extraction (deterministic-ish).
const TRIAGE_TEMPERATURE: f32 = 0.1;

/// Max tokens for each triage completion.
const TRIAGE_MAX_TOKENS: u32 = 512;

/// Result of a delegated model step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// The step failed; carries a description of what went wrong.
    Fallback(String),
}

impl<T> From<Result<T, LlmError>> for Outcome<T> {
    fn from(result: Result<T, LlmError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Fallback(e.to_string()),
        }
    }
}

/// Orchestrates triage for individual messages.
///
/// Holds no per-message state, so one processor can be shared across tasks.
pub struct MessageProcessor {
    classifier: Classifier,
    extractor: ActionExtractor,
    prompts: PromptSet,
    completion: Option<Arc<dyn TextCompletion>>,
}

impl MessageProcessor {
    /// Create a processor. Missing prompts fall back to `PromptSet::default()`.
    pub fn new(prompts: Option<PromptSet>, completion: Option<Arc<dyn TextCompletion>>) -> Self {
        Self {
            classifier: Classifier::default_rules(),
            extractor: ActionExtractor::default_rules(),
            prompts: prompts.unwrap_or_default(),
            completion,
        }
    }

    /// A processor without a model; `Llm` mode degrades to fallbacks.
    pub fn heuristic_only() -> Self {
        Self::new(None, None)
    }

    /// Replace the keyword classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Process a single message.
    ///
    /// Only `category`, `category_reason` and `action_items` are ever written.
    pub async fn process(&self, record: MessageRecord, mode: ProcessingMode) -> MessageRecord {
        debug!(id = %record.id, mode = mode.label(), "Processing message");

        match mode {
            ProcessingMode::Skip => record,
            ProcessingMode::Heuristic => self.process_heuristic(record),
            ProcessingMode::Llm => self.process_llm(record).await,
        }
    }

    /// Keyword-only pipeline. Pure and synchronous.
    pub fn process_heuristic(&self, mut record: MessageRecord) -> MessageRecord {
        let text = normalize(&record.body);
        let Classification { category, reason } =
            self.classifier.classify(record.subject_str(), &text);
        let items = self.extractor.extract(record.subject_str(), &text);

        info!(
            id = %record.id,
            category = %category,
            action_items = items.len(),
            "Heuristic triage complete"
        );

        record.category = Some(category);
        record.category_reason = Some(reason);
        record.action_items = Some(items);
        record
    }

    async fn process_llm(&self, mut record: MessageRecord) -> MessageRecord {
        let content = normalize(&record.body);

        // Independent steps: one failing never blocks the other.
        let (category, actions) = tokio::join!(
            self.categorize(&content),
            self.extract_with_llm(&content)
        );

        match category {
            Outcome::Ok(Classification { category, reason }) => {
                record.category = Some(category);
                record.category_reason = Some(reason);
            }
            Outcome::Fallback(error) => {
                warn!(id = %record.id, error = %error, "Categorization failed, using Unknown");
                record.category = Some(Category::Unknown);
                record.category_reason = Some(format!("{} parsing error", self.origin()));
            }
        }

        match actions {
            Outcome::Ok(items) => record.action_items = Some(items),
            Outcome::Fallback(error) => {
                warn!(id = %record.id, error = %error, "Action extraction failed, using empty list");
                record.action_items = Some(Vec::new());
            }
        }

        info!(
            id = %record.id,
            category = ?record.category,
            action_items = record.action_items.as_ref().map_or(0, Vec::len),
            "LLM triage complete"
        );
        record
    }

    /// Label identifying where model failures came from.
    fn origin(&self) -> &str {
        self.completion
            .as_deref()
            .map_or(DEFAULT_ORIGIN, |c| c.model_name())
    }

    async fn ask(&self, system_prompt: &str, user_prompt: String) -> Result<String, LlmError> {
        let completion = self.completion.as_deref().ok_or(LlmError::NotConfigured)?;
        let request = CompletionRequest::new(system_prompt, user_prompt)
            .with_temperature(TRIAGE_TEMPERATURE)
            .with_max_tokens(TRIAGE_MAX_TOKENS);
        let response = completion.complete(request).await?;
        Ok(response.content)
    }

    async fn categorize(&self, content: &str) -> Outcome<Classification> {
        let result = self
            .ask(
                &self.prompts.categorization_prompt,
                categorization_user_prompt(content),
            )
            .await
            .and_then(|raw| {
                parse_category_response(&raw).inspect_err(|_| {
                    debug!(raw_response = %raw, "Unparseable categorization response");
                })
            });
        Outcome::from(result)
    }

    async fn extract_with_llm(&self, content: &str) -> Outcome<Vec<ActionItem>> {
        let result = self
            .ask(&self.prompts.action_item_prompt, action_items_user_prompt(content))
            .await
            .and_then(|raw| {
                parse_action_items_response(&raw).inspect_err(|_| {
                    debug!(raw_response = %raw, "Unparseable action item response");
                })
            });
        Outcome::from(result)
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Categorization response structure. Only a JSON object is accepted.
#[derive(Debug, Deserialize)]
struct CategoryResponse {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse a categorization response into a category and reason.
pub(crate) fn parse_category_response(raw: &str) -> Result<Classification, LlmError> {
    let value: Value = serde_json::from_str(&extract_json(raw))?;
    if !value.is_object() {
        return Err(LlmError::UnexpectedShape(format!(
            "expected a category object, got {value}"
        )));
    }
    let response: CategoryResponse = serde_json::from_value(value)?;

    Ok(Classification {
        category: response
            .category
            .as_deref()
            .map_or(Category::Unknown, Category::from_label),
        reason: response.reason.unwrap_or_default(),
    })
}

/// Parse an action-item response.
///
/// Accepts a bare array or an object wrapping one under `tasks` or
/// `action_items`. Entries may be `{task, deadline}` objects or plain strings.
pub(crate) fn parse_action_items_response(raw: &str) -> Result<Vec<ActionItem>, LlmError> {
    let value: Value = serde_json::from_str(&extract_json(raw))?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("tasks").or_else(|| map.remove("action_items")) {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(LlmError::UnexpectedShape(
                    "object response without an action item array".into(),
                ));
            }
        },
        other => {
            return Err(LlmError::UnexpectedShape(format!(
                "expected a JSON array, got {other}"
            )));
        }
    };

    Ok(entries.into_iter().filter_map(action_item_from_value).collect())
}

fn action_item_from_value(value: Value) -> Option<ActionItem> {
    match value {
        Value::String(task) if !task.trim().is_empty() => Some(ActionItem::undated(task.trim())),
        Value::Object(map) => {
            let task = map.get("task").and_then(Value::as_str)?.trim();
            if task.is_empty() {
                return None;
            }
            let deadline = map
                .get("deadline")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("null"))
                .map(String::from);
            Some(ActionItem {
                task: task.to_string(),
                deadline,
            })
        }
        _ => None,
    }
}

/// Extract a JSON object or array from LLM output (handles markdown wrapping).
pub(crate) fn extract_json(text: &str) -> String {
    let trimmed = text.trim();

    // Already JSON
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return inner.to_string();
            }
        }
    }

    // Try to find object/array bounds, whichever opens first
    if let Some(start) = trimmed.find(['{', '[']) {
        let close = if trimmed[start..].starts_with('{') { '}' } else { ']' };
        if let Some(end) = trimmed.rfind(close)
            && end > start
        {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::llm::CompletionResponse;
    use crate::pipeline::types::MessageBody;

    // ── Response parsing tests ──────────────────────────────────────

    #[test]
    fn parse_category_plain_json() {
        let parsed =
            parse_category_response(r#"{"category": "Spam", "reason": "lottery"}"#).unwrap();
        assert_eq!(parsed.category, Category::Spam);
        assert_eq!(parsed.reason, "lottery");
    }

    #[test]
    fn parse_category_unknown_label() {
        let parsed = parse_category_response(r#"{"category": "Urgent"}"#).unwrap();
        assert_eq!(parsed.category, Category::Unknown);
        assert!(parsed.reason.is_empty());
    }

    #[test]
    fn parse_category_wrapped_in_markdown() {
        let raw = "Here you go:\n```json\n{\"category\": \"To-Do\", \"reason\": \"asks for review\"}\n```";
        let parsed = parse_category_response(raw).unwrap();
        assert_eq!(parsed.category, Category::ToDo);
    }

    #[test]
    fn parse_category_rejects_prose() {
        assert!(parse_category_response("This looks important to me.").is_err());
    }

    #[test]
    fn parse_category_rejects_positional_array() {
        assert!(matches!(
            parse_category_response(r#"["Spam", "x"]"#),
            Err(LlmError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn parse_errors_are_typed() {
        assert!(matches!(
            parse_category_response("{not json"),
            Err(LlmError::Json(_))
        ));
        assert!(matches!(
            parse_action_items_response(r#""just text""#),
            Err(LlmError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn outcome_from_error_keeps_message() {
        let outcome: Outcome<()> = Outcome::from(Err(LlmError::NotConfigured));
        assert_eq!(
            outcome,
            Outcome::Fallback("No completion provider configured".into())
        );
    }

    #[test]
    fn parse_actions_bare_array() {
        let raw = r#"[{"task": "Send report", "deadline": "2024-05-01"}, {"task": "Call Bob", "deadline": null}]"#;
        let items = parse_action_items_response(raw).unwrap();
        assert_eq!(
            items,
            vec![
                ActionItem {
                    task: "Send report".into(),
                    deadline: Some("2024-05-01".into()),
                },
                ActionItem::undated("Call Bob"),
            ]
        );
    }

    #[test]
    fn parse_actions_wrapped_object_and_strings() {
        let raw = r#"{"tasks": ["Book room", {"task": "Order food", "deadline": "null"}, 3]}"#;
        let items = parse_action_items_response(raw).unwrap();
        assert_eq!(
            items,
            vec![ActionItem::undated("Book room"), ActionItem::undated("Order food")]
        );
    }

    #[test]
    fn parse_actions_empty_array() {
        assert!(parse_action_items_response("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_actions_rejects_object_without_array() {
        assert!(parse_action_items_response(r#"{"category": "Spam"}"#).is_err());
    }

    #[test]
    fn extract_json_direct_object() {
        let input = r#"{"category": "Spam"}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn extract_json_array_in_text() {
        let input = "Tasks: [{\"task\": \"x\"}] done.";
        assert_eq!(extract_json(input), "[{\"task\": \"x\"}]");
    }

    #[test]
    fn extract_json_object_in_text() {
        let input = "My analysis: {\"category\": \"Spam\"} done.";
        let result = extract_json(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }

    // ── Integration: processor with mock LLM ────────────────────────

    /// Mock LLM answering categorization and extraction requests separately.
    /// `None` makes that request fail at the call level.
    struct ScriptedLlm {
        categorization: Option<String>,
        actions: Option<String>,
    }

    #[async_trait::async_trait]
    impl TextCompletion for ScriptedLlm {
        fn model_name(&self) -> &str {
            "mock-triage"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let scripted = if request.user_prompt.contains("category and reason") {
                &self.categorization
            } else {
                &self.actions
            };
            match scripted {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "quota exceeded".into(),
                }),
            }
        }
    }

    fn processor_with(categorization: Option<&str>, actions: Option<&str>) -> MessageProcessor {
        let llm: Arc<dyn TextCompletion> = Arc::new(ScriptedLlm {
            categorization: categorization.map(String::from),
            actions: actions.map(String::from),
        });
        MessageProcessor::new(Some(PromptSet::default()), Some(llm))
    }

    fn sample_record() -> MessageRecord {
        let mut record = MessageRecord::new(
            "m-1",
            MessageBody::Structured {
                text: Some("Can you send the report?\nThanks".into()),
                html: Some("<p>Can you send the report?</p>".into()),
            },
        )
        .with_sender("alice@example.com")
        .with_subject("Report")
        .with_timestamp("2024-04-01T09:00:00Z");
        record
            .extra
            .insert("raw_gmail".into(), serde_json::json!({"threadId": "t-9"}));
        record
    }

    #[tokio::test]
    async fn skip_is_identity() {
        let processor = processor_with(Some("{}"), Some("[]"));
        let record = sample_record();
        let out = processor.process(record.clone(), ProcessingMode::Skip).await;
        assert_eq!(out, record);
        assert!(out.category.is_none());
        assert!(out.action_items.is_none());
    }

    #[tokio::test]
    async fn heuristic_sets_three_fields_and_preserves_rest() {
        let processor = MessageProcessor::heuristic_only();
        let record = sample_record();
        let out = processor
            .process(record.clone(), ProcessingMode::Heuristic)
            .await;

        assert_eq!(out.category, Some(Category::ToDo));
        assert_eq!(
            out.category_reason.as_deref(),
            Some("Contains direct request or action language")
        );
        assert_eq!(
            out.action_items,
            Some(vec![ActionItem::undated("Can you send the report?")])
        );

        assert_eq!(out.id, record.id);
        assert_eq!(out.sender, record.sender);
        assert_eq!(out.subject, record.subject);
        assert_eq!(out.timestamp, record.timestamp);
        assert_eq!(out.body, record.body);
        assert_eq!(out.extra, record.extra);
    }

    #[tokio::test]
    async fn heuristic_overwrites_previous_results() {
        let processor = MessageProcessor::heuristic_only();
        let mut record = MessageRecord::new("m-2", MessageBody::Raw("Just saying hi.".into()))
            .with_subject("Hello");
        record.category = Some(Category::Spam);
        record.category_reason = Some("old".into());
        record.action_items = Some(vec![ActionItem::undated("old task")]);

        let out = processor.process(record, ProcessingMode::Heuristic).await;
        assert_eq!(out.category, Some(Category::Important));
        assert_eq!(out.category_reason.as_deref(), Some("Default fallback"));
        assert_eq!(out.action_items, Some(Vec::new()));
    }

    #[tokio::test]
    async fn llm_positional_category_array_falls_back() {
        let processor = processor_with(Some(r#"["Spam", "x"]"#), Some("[]"));
        let out = processor.process(sample_record(), ProcessingMode::Llm).await;
        assert_eq!(out.category, Some(Category::Unknown));
        assert_eq!(out.category_reason.as_deref(), Some("mock-triage parsing error"));
    }

    #[tokio::test]
    async fn llm_success_sets_both_results() {
        let processor = processor_with(
            Some(r#"{"category": "To-Do", "reason": "Direct request"}"#),
            Some(r#"[{"task": "Send the report", "deadline": "2024-04-05"}]"#),
        );
        let out = processor.process(sample_record(), ProcessingMode::Llm).await;
        assert_eq!(out.category, Some(Category::ToDo));
        assert_eq!(out.category_reason.as_deref(), Some("Direct request"));
        let items = out.action_items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].deadline.as_deref(), Some("2024-04-05"));
    }

    #[tokio::test]
    async fn llm_bad_categorization_does_not_block_actions() {
        let processor = processor_with(
            Some("I think this is probably important."),
            Some(r#"[{"task": "Send the report", "deadline": null}]"#),
        );
        let out = processor.process(sample_record(), ProcessingMode::Llm).await;

        assert_eq!(out.category, Some(Category::Unknown));
        assert_eq!(
            out.category_reason.as_deref(),
            Some("mock-triage parsing error")
        );
        assert_eq!(
            out.action_items,
            Some(vec![ActionItem::undated("Send the report")])
        );
    }

    #[tokio::test]
    async fn llm_failed_actions_do_not_block_category() {
        let processor = processor_with(Some(r#"{"category": "Important", "reason": "boss"}"#), None);
        let out = processor.process(sample_record(), ProcessingMode::Llm).await;
        assert_eq!(out.category, Some(Category::Important));
        assert_eq!(out.category_reason.as_deref(), Some("boss"));
        assert_eq!(out.action_items, Some(Vec::new()));
    }

    #[tokio::test]
    async fn llm_call_failure_falls_back_for_both() {
        let processor = processor_with(None, None);
        let record = sample_record();
        let out = processor.process(record.clone(), ProcessingMode::Llm).await;
        assert_eq!(out.category, Some(Category::Unknown));
        assert!(!out.category_reason.as_deref().unwrap_or("").is_empty());
        assert_eq!(out.action_items, Some(Vec::new()));
        assert_eq!(out.extra, record.extra);
        assert_eq!(out.body, record.body);
    }

    #[tokio::test]
    async fn llm_mode_without_provider_uses_fallbacks() {
        let processor = MessageProcessor::heuristic_only();
        let out = processor.process(sample_record(), ProcessingMode::Llm).await;
        assert_eq!(out.category, Some(Category::Unknown));
        assert_eq!(out.category_reason.as_deref(), Some("LLM parsing error"));
        assert_eq!(out.action_items, Some(Vec::new()));
    }

    #[tokio::test]
    async fn custom_classifier_is_used() {
        let mut classifier = Classifier::empty();
        classifier.add_rule(
            &["report"],
            &[crate::pipeline::rules::RuleField::Subject],
            Category::Newsletter,
            "reports are digests",
        );
        let processor = MessageProcessor::heuristic_only().with_classifier(classifier);
        let out = processor
            .process(sample_record(), ProcessingMode::Heuristic)
            .await;
        assert_eq!(out.category, Some(Category::Newsletter));
    }
}

//! Editable prompt set and the user prompts built around it.

use serde::{Deserialize, Serialize};

/// Prompts driving every model-backed behaviour. Users edit and save these;
/// the heuristic pipeline never reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    #[serde(default)]
    pub categorization_prompt: String,
    #[serde(default)]
    pub action_item_prompt: String,
    #[serde(default)]
    pub auto_reply_prompt: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            categorization_prompt: "Categorize the following email into one of: Important, \
                Newsletter, Spam, To-Do. Return JSON: { \"category\": \"...\", \"reason\": \"...\" }."
                .into(),
            action_item_prompt: "Extract tasks from the email. Return JSON array: \
                [{\"task\": \"...\", \"deadline\": \"YYYY-MM-DD or null\"}]."
                .into(),
            auto_reply_prompt: "Draft a reply in tone {tone}. Return JSON: \
                { \"subject\": \"...\", \"body\": \"...\", \"suggested_followups\":[...] }."
                .into(),
        }
    }
}

impl PromptSet {
    /// Auto-reply prompt with the `{tone}` placeholder filled in.
    pub fn auto_reply_for(&self, tone: &str) -> String {
        self.auto_reply_prompt.replace("{tone}", tone)
    }
}

/// System prompt for summaries. Not user-editable.
pub const SUMMARY_PROMPT: &str = "Summarize the email in 3-5 lines clearly.";

pub fn categorization_user_prompt(content: &str) -> String {
    format!("Email:\n{content}\n\nReturn category and reason in JSON.")
}

pub fn action_items_user_prompt(content: &str) -> String {
    format!("Email:\n{content}\n\nReturn JSON array: [{{\"task\": ..., \"deadline\": ...}}]")
}

pub fn reply_user_prompt(tone: &str, content: &str) -> String {
    format!("Tone: {tone}\n\nOriginal Email:\n{content}")
}

//! Email assistant: summaries and reply drafts for a selected message.
//!
//! Drafts are suggestions only. Nothing here sends mail.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::LlmError;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::pipeline::normalize::normalize;
use crate::pipeline::processor::extract_json;
use crate::pipeline::prompts::{PromptSet, SUMMARY_PROMPT, reply_user_prompt};
use crate::pipeline::types::{MessageRecord, ReplyDraft};

/// Body used when a draft cannot be generated.
pub const FALLBACK_REPLY_BODY: &str = "Thank you for your email.";

/// Tone used when the caller does not pick one.
pub const DEFAULT_TONE: &str = "professional";

pub struct Assistant {
    completion: Arc<dyn TextCompletion>,
}

impl Assistant {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    /// Summarize a message in a few lines. Errors are returned to the caller.
    pub async fn summarize(&self, record: &MessageRecord) -> Result<String, LlmError> {
        let content = normalize(&record.body);
        let response = self
            .completion
            .complete(CompletionRequest::new(SUMMARY_PROMPT, content))
            .await?;
        info!(id = %record.id, "Summarized message");
        Ok(response.content.trim().to_string())
    }

    /// Draft a reply in the given tone.
    ///
    /// Never fails: a call or parse error yields a polite holding reply.
    pub async fn draft_reply(
        &self,
        record: &MessageRecord,
        prompts: &PromptSet,
        tone: &str,
    ) -> ReplyDraft {
        let content = normalize(&record.body);
        let request =
            CompletionRequest::new(prompts.auto_reply_for(tone), reply_user_prompt(tone, &content));

        let parsed = self.completion.complete(request).await.and_then(|response| {
            serde_json::from_str::<ReplyDraft>(&extract_json(&response.content))
                .map_err(LlmError::from)
        });

        match parsed {
            Ok(draft) => {
                info!(id = %record.id, tone = %tone, "Drafted reply");
                draft
            }
            Err(e) => {
                warn!(id = %record.id, error = %e, "Reply drafting failed, using fallback");
                fallback_draft(record)
            }
        }
    }
}

/// Holding reply used when drafting fails.
pub fn fallback_draft(record: &MessageRecord) -> ReplyDraft {
    ReplyDraft {
        subject: format!("Re: {}", record.subject_str()),
        body: FALLBACK_REPLY_BODY.into(),
        suggested_followups: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use crate::llm::CompletionResponse;
    use crate::pipeline::types::MessageBody;

    /// Mock LLM that records requests and returns a fixed reply.
    struct RecordingLlm {
        reply: Result<String, ()>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl RecordingLlm {
        fn new(reply: Result<&str, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(String::from),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl TextCompletion for RecordingLlm {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "timeout".into(),
                }),
            }
        }
    }

    fn record() -> MessageRecord {
        MessageRecord::new("m-1", MessageBody::text("Can we meet Tuesday?"))
            .with_subject("Meeting")
    }

    #[tokio::test]
    async fn draft_parses_model_json() {
        let llm = RecordingLlm::new(Ok(
            r#"{"subject": "Re: Meeting", "body": "Tuesday works.", "suggested_followups": ["Send invite"]}"#,
        ));
        let assistant = Assistant::new(llm.clone());
        let draft = assistant
            .draft_reply(&record(), &PromptSet::default(), "casual")
            .await;

        assert_eq!(draft.body, "Tuesday works.");
        assert_eq!(draft.suggested_followups, vec!["Send invite".to_string()]);

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].system_prompt.contains("tone casual"));
        assert!(requests[0].user_prompt.starts_with("Tone: casual"));
        assert!(requests[0].user_prompt.contains("Can we meet Tuesday?"));
    }

    #[tokio::test]
    async fn draft_falls_back_on_prose() {
        let assistant = Assistant::new(RecordingLlm::new(Ok("Sure, sounds good!")));
        let draft = assistant
            .draft_reply(&record(), &PromptSet::default(), DEFAULT_TONE)
            .await;
        assert_eq!(draft, fallback_draft(&record()));
        assert_eq!(draft.subject, "Re: Meeting");
        assert_eq!(draft.body, FALLBACK_REPLY_BODY);
        assert!(draft.suggested_followups.is_empty());
    }

    #[tokio::test]
    async fn draft_falls_back_on_call_failure() {
        let assistant = Assistant::new(RecordingLlm::new(Err(())));
        let draft = assistant
            .draft_reply(&record(), &PromptSet::default(), DEFAULT_TONE)
            .await;
        assert_eq!(draft.subject, "Re: Meeting");
    }

    #[tokio::test]
    async fn summarize_sends_body_text() {
        let llm = RecordingLlm::new(Ok("  Alice wants to meet Tuesday.\n"));
        let assistant = Assistant::new(llm.clone());
        let summary = assistant.summarize(&record()).await.unwrap();
        assert_eq!(summary, "Alice wants to meet Tuesday.");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].system_prompt, SUMMARY_PROMPT);
        assert_eq!(requests[0].user_prompt, "Can we meet Tuesday?");
    }

    #[tokio::test]
    async fn summarize_propagates_errors() {
        let assistant = Assistant::new(RecordingLlm::new(Err(())));
        assert!(assistant.summarize(&record()).await.is_err());
    }
}

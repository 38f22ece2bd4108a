//! Plain-text extraction from a message body.

use crate::pipeline::types::MessageBody;

/// Extract the plain text the heuristics and prompts run over.
///
/// Structured bodies yield their `text` part only. HTML is a rendering
/// concern and is never used as a fallback here. Always returns a string,
/// empty when there is no usable content.
pub fn normalize(body: &MessageBody) -> String {
    match body {
        MessageBody::Structured {
            text: Some(text), ..
        } if !text.is_empty() => text.clone(),
        MessageBody::Structured { .. } => String::new(),
        MessageBody::Raw(raw) => raw.clone(),
    }
}

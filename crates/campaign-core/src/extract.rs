//! Best-effort extraction of topic descriptors from an AI text reply.
//!
//! Models are asked for a bare JSON array but often wrap it in prose or code
//! fences, so when the whole reply does not parse we retry on the span from
//! the first `[` to the last `]`.

use serde_json::Value;
use thiserror::Error;

use crate::topics::TopicDescriptor;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("response contains no JSON array")]
    NoArray,
    #[error("response JSON array is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Pull `choices[0].message.content` out of a chat-completion response.
#[must_use]
pub fn completion_content(response: &Value) -> Option<&str> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

/// Parse the topic array out of a free-form model reply.
///
/// # Errors
///
/// Returns [`ExtractError::NoArray`] when the text has no `[`…`]` span, and
/// [`ExtractError::Malformed`] when neither the whole text nor that span is a
/// valid array of topic objects.
pub fn parse_topics(content: &str) -> Result<Vec<TopicDescriptor>, ExtractError> {
    if let Ok(topics) = serde_json::from_str::<Vec<TopicDescriptor>>(content) {
        return Ok(topics);
    }

    let start = content.find('[').ok_or(ExtractError::NoArray)?;
    let end = content.rfind(']').ok_or(ExtractError::NoArray)?;
    if end < start {
        return Err(ExtractError::NoArray);
    }

    serde_json::from_str::<Vec<TopicDescriptor>>(&content[start..=end])
        .map_err(ExtractError::Malformed)
}

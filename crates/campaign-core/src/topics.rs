//! Campaign topic domain types and request validation.
//!
//! Wire names are camelCase to match what the UI sends and expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejection of a malformed ingest or feedback request. Nothing is persisted
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topics must be a non-empty array")]
    EmptyBatch,
    #[error("topics[{index}].{field} is required")]
    MissingTopicField { index: usize, field: &'static str },
    #[error("topics[{index}].feedbackStats.{field} must be non-negative")]
    NegativeCounter { index: usize, field: &'static str },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("feedback must be 'like' or 'dislike', got '{0}'")]
    InvalidFeedback(String),
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

impl FeedbackKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Like => "like",
            FeedbackKind::Dislike => "dislike",
        }
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(FeedbackKind::Like),
            "dislike" => Ok(FeedbackKind::Dislike),
            other => Err(ValidationError::InvalidFeedback(other.to_string())),
        }
    }
}

/// Cumulative like/dislike counters carried by every stored topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub dislikes: i64,
}

impl FeedbackStats {
    #[must_use]
    pub fn new(likes: i64, dislikes: i64) -> Self {
        Self { likes, dislikes }
    }

    /// Bump the counter that matches `kind`.
    pub fn record(&mut self, kind: FeedbackKind) {
        match kind {
            FeedbackKind::Like => self.likes += 1,
            FeedbackKind::Dislike => self.dislikes += 1,
        }
    }
}

impl std::ops::AddAssign for FeedbackStats {
    fn add_assign(&mut self, rhs: Self) {
        self.likes += rhs.likes;
        self.dislikes += rhs.dislikes;
    }
}

// ---------------------------------------------------------------------------
// Identity and records
// ---------------------------------------------------------------------------

/// The `(topicTitle, geo, platform)` triple that uniquely identifies a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicKey {
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
}

impl TopicKey {
    pub fn new(
        topic_title: impl Into<String>,
        geo: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            topic_title: topic_title.into(),
            geo: geo.into(),
            platform: platform.into(),
        }
    }
}

impl std::fmt::Display for TopicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.topic_title, self.geo, self.platform)
    }
}

/// A topic as submitted for ingestion, before validation.
///
/// Required string fields default to empty so a missing key surfaces as a
/// [`ValidationError`] naming the field rather than a generic parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDescriptor {
    #[serde(default)]
    pub vertical: String,
    #[serde(default)]
    pub sub_vertical: String,
    #[serde(default)]
    pub topic_title: String,
    #[serde(default)]
    pub geo: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_stats: Option<FeedbackStats>,
}

/// A validated topic ready for insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub vertical: String,
    pub sub_vertical: String,
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
    pub feedback: Option<FeedbackKind>,
    pub feedback_stats: FeedbackStats,
}

impl NewTopic {
    #[must_use]
    pub fn key(&self) -> TopicKey {
        TopicKey::new(&self.topic_title, &self.geo, &self.platform)
    }
}

impl TopicDescriptor {
    /// Check required fields and counters; `index` is the position in the
    /// submitted batch and is echoed in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a blank required field or a negative
    /// counter.
    pub fn validate(self, index: usize) -> Result<NewTopic, ValidationError> {
        let required = [
            ("vertical", &self.vertical),
            ("subVertical", &self.sub_vertical),
            ("topicTitle", &self.topic_title),
            ("geo", &self.geo),
            ("platform", &self.platform),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ValidationError::MissingTopicField { index, field });
        }

        let feedback_stats = self.feedback_stats.unwrap_or_default();
        if feedback_stats.likes < 0 {
            return Err(ValidationError::NegativeCounter {
                index,
                field: "likes",
            });
        }
        if feedback_stats.dislikes < 0 {
            return Err(ValidationError::NegativeCounter {
                index,
                field: "dislikes",
            });
        }

        Ok(NewTopic {
            vertical: self.vertical,
            sub_vertical: self.sub_vertical,
            topic_title: self.topic_title,
            geo: self.geo,
            platform: self.platform,
            feedback: self.feedback,
            feedback_stats,
        })
    }
}

/// Validate a whole ingestion batch. Fails on the first bad descriptor so
/// that a rejected batch never partially persists.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyBatch`] for an empty batch, or the first
/// descriptor-level error.
pub fn validate_batch(descriptors: Vec<TopicDescriptor>) -> Result<Vec<NewTopic>, ValidationError> {
    if descriptors.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    descriptors
        .into_iter()
        .enumerate()
        .map(|(index, d)| d.validate(index))
        .collect()
}

/// A stored topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    pub vertical: String,
    pub sub_vertical: String,
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
    pub feedback: Option<FeedbackKind>,
    pub feedback_stats: FeedbackStats,
    pub created_at: DateTime<Utc>,
}

impl TopicRecord {
    #[must_use]
    pub fn key(&self) -> TopicKey {
        TopicKey::new(&self.topic_title, &self.geo, &self.platform)
    }
}

// ---------------------------------------------------------------------------
// Feedback requests
// ---------------------------------------------------------------------------

/// Raw feedback request body. Every field is optional on the wire so that
/// missing fields are reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub topic_title: Option<String>,
    pub geo: Option<String>,
    pub platform: Option<String>,
    pub feedback: Option<String>,
}

/// One validated like/dislike against one identity triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEvent {
    pub key: TopicKey,
    pub kind: FeedbackKind,
}

impl FeedbackRequest {
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for an absent or blank field
    /// and [`ValidationError::InvalidFeedback`] for anything other than
    /// `like`/`dislike`.
    pub fn validate(self) -> Result<FeedbackEvent, ValidationError> {
        fn present(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ValidationError::MissingField(field))
        }

        let topic_title = present(self.topic_title, "topicTitle")?;
        let geo = present(self.geo, "geo")?;
        let platform = present(self.platform, "platform")?;
        let kind = present(self.feedback, "feedback")?.parse::<FeedbackKind>()?;

        Ok(FeedbackEvent {
            key: TopicKey {
                topic_title,
                geo,
                platform,
            },
            kind,
        })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a bulk insert-if-absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub inserted_count: u64,
    /// Descriptors whose identity triple already existed, including repeats
    /// within the same batch.
    pub matched_count: u64,
}

/// One row of the read-side rollup. Under the identity invariant `count` is
/// always 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicGroup {
    pub vertical: String,
    pub sub_vertical: String,
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
    pub count: i64,
    pub feedback_stats: FeedbackStats,
}

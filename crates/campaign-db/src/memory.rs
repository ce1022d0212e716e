//! Process-local [`TopicStore`] for development runs without Postgres and
//! for exercising the API in tests.

use async_trait::async_trait;
use campaign_core::{
    FeedbackKind, FeedbackStats, IngestSummary, NewTopic, TopicGroup, TopicKey, TopicRecord,
};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{store::TopicStore, DbError};

/// Records keyed by identity triple, guarded by one async mutex so every
/// operation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryTopicStore {
    records: Mutex<HashMap<TopicKey, TopicRecord>>,
}

impl MemoryTopicStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl TopicStore for MemoryTopicStore {
    async fn insert_if_absent(&self, topics: &[NewTopic]) -> Result<IngestSummary, DbError> {
        let mut records = self.records.lock().await;
        let mut summary = IngestSummary::default();

        for topic in topics {
            let key = topic.key();
            if records.contains_key(&key) {
                summary.matched_count += 1;
                continue;
            }
            records.insert(
                key,
                TopicRecord {
                    vertical: topic.vertical.clone(),
                    sub_vertical: topic.sub_vertical.clone(),
                    topic_title: topic.topic_title.clone(),
                    geo: topic.geo.clone(),
                    platform: topic.platform.clone(),
                    feedback: topic.feedback,
                    feedback_stats: topic.feedback_stats,
                    created_at: Utc::now(),
                },
            );
            summary.inserted_count += 1;
        }

        Ok(summary)
    }

    async fn increment_counter(
        &self,
        key: &TopicKey,
        kind: FeedbackKind,
    ) -> Result<FeedbackStats, DbError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(key).ok_or(DbError::NotFound)?;
        record.feedback_stats.record(kind);
        Ok(record.feedback_stats)
    }

    async fn group_and_aggregate(&self) -> Result<Vec<TopicGroup>, DbError> {
        let records = self.records.lock().await;
        let mut groups: HashMap<(&str, &str, &str, &str, &str), TopicGroup> = HashMap::new();

        for r in records.values() {
            let group = groups
                .entry((
                    r.vertical.as_str(),
                    r.sub_vertical.as_str(),
                    r.topic_title.as_str(),
                    r.geo.as_str(),
                    r.platform.as_str(),
                ))
                .or_insert_with(|| TopicGroup {
                    vertical: r.vertical.clone(),
                    sub_vertical: r.sub_vertical.clone(),
                    topic_title: r.topic_title.clone(),
                    geo: r.geo.clone(),
                    platform: r.platform.clone(),
                    count: 0,
                    feedback_stats: FeedbackStats::default(),
                });
            group.count += 1;
            group.feedback_stats += r.feedback_stats;
        }

        Ok(groups.into_values().collect())
    }

    async fn find(&self, key: &TopicKey) -> Result<Option<TopicRecord>, DbError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}

//! The topic store seam shared by the HTTP API and the CLI.

use async_trait::async_trait;
use campaign_core::{
    FeedbackKind, FeedbackStats, IngestSummary, NewTopic, TopicGroup, TopicKey, TopicRecord,
};
use sqlx::PgPool;

use crate::{topics, DbError};

/// Keyed topic storage with a uniqueness guarantee on the identity triple,
/// atomic counter increments, and a grouped read-side rollup.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Insert each topic whose identity triple is absent; existing records are
    /// left untouched. Concurrent callers racing on one triple produce exactly
    /// one record and no error.
    async fn insert_if_absent(&self, topics: &[NewTopic]) -> Result<IngestSummary, DbError>;

    /// Add one to the `kind` counter of the topic matching `key` and return the
    /// updated counters. Fails with [`DbError::NotFound`] when nothing matches.
    async fn increment_counter(
        &self,
        key: &TopicKey,
        kind: FeedbackKind,
    ) -> Result<FeedbackStats, DbError>;

    /// One group per distinct `(vertical, subVertical, topicTitle, geo,
    /// platform)`; order is unspecified.
    async fn group_and_aggregate(&self) -> Result<Vec<TopicGroup>, DbError>;

    async fn find(&self, key: &TopicKey) -> Result<Option<TopicRecord>, DbError>;

    async fn health_check(&self) -> Result<(), DbError>;
}

/// [`TopicStore`] backed by the `campaign_topics` Postgres table.
#[derive(Debug, Clone)]
pub struct PgTopicStore {
    pool: PgPool,
}

impl PgTopicStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TopicStore for PgTopicStore {
    async fn insert_if_absent(&self, topics: &[NewTopic]) -> Result<IngestSummary, DbError> {
        topics::insert_topics_if_absent(&self.pool, topics).await
    }

    async fn increment_counter(
        &self,
        key: &TopicKey,
        kind: FeedbackKind,
    ) -> Result<FeedbackStats, DbError> {
        topics::increment_feedback(&self.pool, key, kind).await
    }

    async fn group_and_aggregate(&self) -> Result<Vec<TopicGroup>, DbError> {
        let rows = topics::aggregate_topics(&self.pool).await?;
        Ok(rows.into_iter().map(TopicGroup::from).collect())
    }

    async fn find(&self, key: &TopicKey) -> Result<Option<TopicRecord>, DbError> {
        topics::get_topic(&self.pool, key)
            .await?
            .map(TopicRecord::try_from)
            .transpose()
    }

    async fn health_check(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }
}

//! Database operations for the `campaign_topics` table.

use campaign_core::{
    FeedbackKind, FeedbackStats, IngestSummary, NewTopic, TopicGroup, TopicKey, TopicRecord,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `campaign_topics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicRow {
    pub id: i64,
    pub vertical: String,
    pub sub_vertical: String,
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
    pub feedback: Option<String>,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TopicRow> for TopicRecord {
    type Error = DbError;

    fn try_from(row: TopicRow) -> Result<Self, Self::Error> {
        let feedback = row
            .feedback
            .as_deref()
            .map(str::parse::<FeedbackKind>)
            .transpose()
            .map_err(|e| DbError::InvalidRow(format!("campaign_topics.id={}: {e}", row.id)))?;

        Ok(TopicRecord {
            vertical: row.vertical,
            sub_vertical: row.sub_vertical,
            topic_title: row.topic_title,
            geo: row.geo,
            platform: row.platform,
            feedback,
            feedback_stats: FeedbackStats::new(row.likes, row.dislikes),
            created_at: row.created_at,
        })
    }
}

/// One group produced by [`aggregate_topics`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicGroupRow {
    pub vertical: String,
    pub sub_vertical: String,
    pub topic_title: String,
    pub geo: String,
    pub platform: String,
    pub count: i64,
    pub likes: i64,
    pub dislikes: i64,
}

impl From<TopicGroupRow> for TopicGroup {
    fn from(row: TopicGroupRow) -> Self {
        TopicGroup {
            vertical: row.vertical,
            sub_vertical: row.sub_vertical,
            topic_title: row.topic_title,
            geo: row.geo,
            platform: row.platform,
            count: row.count,
            feedback_stats: FeedbackStats::new(row.likes, row.dislikes),
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert every topic whose identity triple is not already stored.
///
/// The whole batch is one `INSERT … SELECT FROM UNNEST … ON CONFLICT DO
/// NOTHING` statement, so it either lands completely or not at all. Existing
/// rows are never touched: descriptive fields and counters stay as they were.
/// When a batch repeats a triple, only its first occurrence (by
/// `WITH ORDINALITY` position) is inserted. Rows go in sorted by identity
/// triple so concurrent batches take key locks in the same order and cannot
/// deadlock one another.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn insert_topics_if_absent(
    pool: &PgPool,
    topics: &[NewTopic],
) -> Result<IngestSummary, DbError> {
    if topics.is_empty() {
        return Ok(IngestSummary::default());
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut verticals: Vec<&str> = Vec::with_capacity(topics.len());
    let mut sub_verticals: Vec<&str> = Vec::with_capacity(topics.len());
    let mut titles: Vec<&str> = Vec::with_capacity(topics.len());
    let mut geos: Vec<&str> = Vec::with_capacity(topics.len());
    let mut platforms: Vec<&str> = Vec::with_capacity(topics.len());
    let mut feedbacks: Vec<Option<&str>> = Vec::with_capacity(topics.len());
    let mut likes: Vec<i64> = Vec::with_capacity(topics.len());
    let mut dislikes: Vec<i64> = Vec::with_capacity(topics.len());

    for topic in topics {
        verticals.push(&topic.vertical);
        sub_verticals.push(&topic.sub_vertical);
        titles.push(&topic.topic_title);
        geos.push(&topic.geo);
        platforms.push(&topic.platform);
        feedbacks.push(topic.feedback.map(FeedbackKind::as_str));
        likes.push(topic.feedback_stats.likes);
        dislikes.push(topic.feedback_stats.dislikes);
    }

    let inserted_ids: Vec<i64> = sqlx::query_scalar::<_, i64>(
        "INSERT INTO campaign_topics \
             (vertical, sub_vertical, topic_title, geo, platform, feedback, likes, dislikes) \
         SELECT vertical, sub_vertical, topic_title, geo, platform, feedback, likes, dislikes \
         FROM ( \
             SELECT DISTINCT ON (topic_title, geo, platform) * \
             FROM UNNEST(\
                  $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
                  $7::int8[], $8::int8[]) \
                  WITH ORDINALITY AS batch(vertical, sub_vertical, topic_title, geo, platform, \
                                           feedback, likes, dislikes, ord) \
             ORDER BY topic_title, geo, platform, ord \
         ) AS first_seen \
         ORDER BY topic_title, geo, platform \
         ON CONFLICT (topic_title, geo, platform) DO NOTHING \
         RETURNING id",
    )
    .bind(&verticals)
    .bind(&sub_verticals)
    .bind(&titles)
    .bind(&geos)
    .bind(&platforms)
    .bind(&feedbacks)
    .bind(&likes)
    .bind(&dislikes)
    .fetch_all(pool)
    .await?;

    let inserted_count = inserted_ids.len() as u64;
    Ok(IngestSummary {
        inserted_count,
        matched_count: topics.len() as u64 - inserted_count,
    })
}

/// Atomically add one to the counter for `kind` on the topic matching `key`.
///
/// Returns the counters after the increment.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no topic has that identity triple (no row
/// is created), or [`DbError::Sqlx`] if the update fails.
pub async fn increment_feedback(
    pool: &PgPool,
    key: &TopicKey,
    kind: FeedbackKind,
) -> Result<FeedbackStats, DbError> {
    let sql = match kind {
        FeedbackKind::Like => {
            "UPDATE campaign_topics SET likes = likes + 1 \
             WHERE topic_title = $1 AND geo = $2 AND platform = $3 \
             RETURNING likes, dislikes"
        }
        FeedbackKind::Dislike => {
            "UPDATE campaign_topics SET dislikes = dislikes + 1 \
             WHERE topic_title = $1 AND geo = $2 AND platform = $3 \
             RETURNING likes, dislikes"
        }
    };

    let (likes, dislikes) = sqlx::query_as::<_, (i64, i64)>(sql)
        .bind(&key.topic_title)
        .bind(&key.geo)
        .bind(&key.platform)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(FeedbackStats::new(likes, dislikes))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Group every stored topic by its five descriptive fields with a record
/// count and summed counters. Row order is unspecified.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn aggregate_topics(pool: &PgPool) -> Result<Vec<TopicGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, TopicGroupRow>(
        "SELECT vertical, sub_vertical, topic_title, geo, platform, \
                COUNT(*) AS count, \
                COALESCE(SUM(likes), 0)::BIGINT AS likes, \
                COALESCE(SUM(dislikes), 0)::BIGINT AS dislikes \
         FROM campaign_topics \
         GROUP BY vertical, sub_vertical, topic_title, geo, platform",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch the topic matching `key`, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_topic(pool: &PgPool, key: &TopicKey) -> Result<Option<TopicRow>, DbError> {
    let row = sqlx::query_as::<_, TopicRow>(
        "SELECT id, vertical, sub_vertical, topic_title, geo, platform, feedback, \
                likes, dislikes, created_at \
         FROM campaign_topics \
         WHERE topic_title = $1 AND geo = $2 AND platform = $3",
    )
    .bind(&key.topic_title)
    .bind(&key.geo)
    .bind(&key.platform)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Total number of stored topics.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_topics(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM campaign_topics")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use campaign_core::{
    validate_batch, FeedbackRequest, FeedbackStats, IngestSummary, TopicDescriptor, TopicGroup,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_json_rejection, map_store_error, map_validation_error, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct IngestRequest {
    topics: Vec<TopicDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FeedbackResult {
    /// Always `true`: a feedback call that matches no topic is answered with
    /// `404 not_found` instead of a result body.
    matched: bool,
    feedback_stats: FeedbackStats,
}

/// `POST /api/campaigns`: insert every topic whose identity triple is new.
pub(super) async fn ingest_topics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<IngestSummary>>, ApiError> {
    let Json(body) = payload.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let submitted = body.topics.len();
    let topics =
        validate_batch(body.topics).map_err(|e| map_validation_error(req_id.0.clone(), &e))?;

    let summary = state
        .store
        .insert_if_absent(&topics)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    tracing::info!(
        submitted,
        inserted = summary.inserted_count,
        matched = summary.matched_count,
        "ingested topic batch"
    );

    Ok(Json(ApiResponse::new(summary, req_id.0)))
}

/// `POST /api/campaigns/feedback`: bump one counter on an existing topic.
pub(super) async fn record_feedback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FeedbackResult>>, ApiError> {
    let Json(body) = payload.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let event = body
        .validate()
        .map_err(|e| map_validation_error(req_id.0.clone(), &e))?;

    let feedback_stats = state
        .store
        .increment_counter(&event.key, event.kind)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        topic = %event.key,
        kind = %event.kind,
        likes = feedback_stats.likes,
        dislikes = feedback_stats.dislikes,
        "recorded feedback"
    );

    Ok(Json(ApiResponse::new(
        FeedbackResult {
            matched: true,
            feedback_stats,
        },
        req_id.0,
    )))
}

/// `GET /api/campaigns/aggregated`: one group per distinct topic.
pub(super) async fn aggregate_topics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TopicGroup>>>, ApiError> {
    let groups = state
        .store
        .group_and_aggregate()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(groups, req_id.0)))
}

use axum::{extract::State, Extension, Json};
use campaign_core::{summarize, AnalyticsSummary};

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState};

/// `GET /api/campaigns/summary`: dashboard totals over the aggregated groups.
pub(super) async fn campaign_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ApiError> {
    let groups = state
        .store
        .group_and_aggregate()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(summarize(&groups), req_id.0)))
}

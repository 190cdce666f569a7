//! History and rating HTTP handlers.

use axum::extract::{Path, Query, State};

use super::auth::Auth;
use super::types::{ApiResponse, ApiResult, AppState, Body, RatingBody, WindowQuery};
use crate::model::QueueEntry;

/// The caller's own queue history.
pub async fn user_queue_history(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Vec<QueueEntry>> {
    let history = state
        .engine
        .user_queue_history(&principal, window.start_time, window.end_time)
        .await?;
    Ok(ApiResponse::success(history))
}

/// A business's queue history, optionally narrowed to one helper.
pub async fn business_queue_history(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(business_id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Vec<QueueEntry>> {
    let history = state
        .engine
        .business_queue_history(
            &principal,
            &business_id,
            window.start_time,
            window.end_time,
            window.helper_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::success(history))
}

/// Rate a completed entry.
pub async fn update_rating(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(queue_id): Path<String>,
    Body(body): Body<RatingBody>,
) -> ApiResult<QueueEntry> {
    let updated = state
        .engine
        .update_rating(&principal, &queue_id, body.rating, body.notes)
        .await?;
    Ok(ApiResponse::success(updated))
}

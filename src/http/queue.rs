//! Queue operation HTTP handlers.

use axum::extract::{Path, Query, State};

use super::auth::Auth;
use super::types::{
    ActionBody, ApiResponse, ApiResult, AppState, Body, LimitQuery, RestructureBody, WindowQuery,
};
use crate::model::QueueEntry;
use crate::queue::{
    ActionRequest, EnqueueRequest, HelperQueueView, RecentAction, RestructureReport,
};

/// Enqueue one or more services for a customer.
pub async fn enqueue(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Body(req): Body<EnqueueRequest>,
) -> ApiResult<Vec<QueueEntry>> {
    let created = state.engine.enqueue(&principal, req).await?;
    Ok(ApiResponse::with_message("queued", created))
}

/// Apply an action to one entry.
pub async fn queue_action(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(queue_id): Path<String>,
    Body(body): Body<ActionBody>,
) -> ApiResult<QueueEntry> {
    let req = ActionRequest {
        queue_id,
        action: body.action,
        added_time: body.added_time,
    };
    let updated = state.engine.apply_action(&principal, req).await?;
    Ok(ApiResponse::success(updated))
}

/// Rebalance a business's queues over a time window.
pub async fn restructure(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Body(body): Body<RestructureBody>,
) -> ApiResult<RestructureReport> {
    let report = state
        .engine
        .restructure_for(&principal, &body.business_id, body.start_time, body.end_time)
        .await?;
    Ok(ApiResponse::success(report))
}

/// A helper's live queue with counts.
pub async fn helper_queue(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(helper_id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<HelperQueueView> {
    let view = state
        .engine
        .helper_queue(&principal, &helper_id, window.start_time, window.end_time)
        .await?;
    Ok(ApiResponse::success(view))
}

/// Recent vendor actions across a helper's live entries.
pub async fn helper_recent_actions(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(helper_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<RecentAction>> {
    let actions = state
        .engine
        .helper_recent_actions(&principal, &helper_id, query.limit)
        .await?;
    Ok(ApiResponse::success(actions))
}

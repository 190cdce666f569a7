//! Business-scoped HTTP handlers: wait times, breaks, manual customers.

use axum::extract::{Path, Query, State};

use super::auth::Auth;
use super::types::{ApiResponse, ApiResult, AppState, Body, BreakBody};
use crate::model::ManualCustomer;
use crate::queue::{BreakRequest, HelperWaitTime, ManualCustomerRequest, ManualSearchQuery};

/// Expected waits per (helper, service) pair. Any authenticated caller.
pub async fn helper_wait_times(
    State(state): State<AppState>,
    Auth(_principal): Auth,
    Path(business_id): Path<String>,
) -> ApiResult<Vec<HelperWaitTime>> {
    let waits = state.engine.helper_wait_times(&business_id).await?;
    Ok(ApiResponse::success(waits))
}

fn break_request(business_id: String, body: BreakBody) -> BreakRequest {
    BreakRequest {
        business_id,
        helper_id: body.helper_id,
        reason: body.reason,
        duration: body.duration,
        message: body.message,
    }
}

/// Pause the business or one helper.
pub async fn set_break(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(business_id): Path<String>,
    Body(body): Body<BreakBody>,
) -> ApiResult<()> {
    state
        .engine
        .set_break(&principal, break_request(business_id, body))
        .await?;
    Ok(ApiResponse::with_message("break started", ()))
}

/// Resume the business or one helper.
pub async fn resume_break(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(business_id): Path<String>,
    Body(body): Body<BreakBody>,
) -> ApiResult<()> {
    state
        .engine
        .resume_break(&principal, break_request(business_id, body))
        .await?;
    Ok(ApiResponse::with_message("resumed", ()))
}

/// Add a manual customer. Vendor-only.
pub async fn add_manual_customer(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Body(req): Body<ManualCustomerRequest>,
) -> ApiResult<ManualCustomer> {
    let customer = state.engine.add_manual_customer(&principal, req).await?;
    Ok(ApiResponse::success(customer))
}

/// Search manual customers by name/phone prefix. Vendor-only.
pub async fn search_manual_customers(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Query(query): Query<ManualSearchQuery>,
) -> ApiResult<Vec<ManualCustomer>> {
    let found = state.engine.search_manual_customers(&principal, query).await?;
    Ok(ApiResponse::success(found))
}

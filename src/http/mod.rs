//! HTTP API module.
//!
//! A thin request/response layer mapping external calls onto engine
//! operations. Every response uses the `{success, message, data,
//! token?}` envelope.

mod auth;
mod business;
mod history;
mod queue;
mod types;

#[cfg(test)]
mod tests;

use axum::extract::State;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use types::{ApiResponse, AppContext, AppState};

use types::{ApiResult, Body, TokenRequest};
use crate::identity::Principal;

/// Create CORS layer based on environment configuration.
/// Set CORS_ALLOW_ORIGIN for production (comma-separated origins).
fn create_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOW_ORIGIN").ok();

    match allowed_origins {
        Some(origins) if !origins.is_empty() && origins != "*" => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        }
        _ => {
            if std::env::var("CORS_ALLOW_ORIGIN").is_err() {
                tracing::warn!(
                    "CORS_ALLOW_ORIGIN not set - allowing all origins. Set this in production!"
                );
            }
            CorsLayer::permissive()
        }
    }
}

/// Create the HTTP router with all API routes.
pub fn create_router(state: AppState) -> Router {
    let cors = create_cors_layer();

    let api_routes = Router::new()
        // Identity stand-in
        .route("/auth/token", post(issue_token))
        // Queue operations
        .route("/queue", post(queue::enqueue))
        .route("/queue/restructure", post(queue::restructure))
        .route("/queue/{id}/action", post(queue::queue_action))
        .route("/queue/{id}/rating", post(history::update_rating))
        // Helper views
        .route("/helpers/{id}/queue", get(queue::helper_queue))
        .route(
            "/helpers/{id}/recent-actions",
            get(queue::helper_recent_actions),
        )
        // Business operations
        .route(
            "/businesses/{id}/wait-times",
            get(business::helper_wait_times),
        )
        .route("/businesses/{id}/break", post(business::set_break))
        .route("/businesses/{id}/resume", post(business::resume_break))
        .route(
            "/businesses/{id}/history",
            get(history::business_queue_history),
        )
        // Manual customers
        .route("/manual-users", post(business::add_manual_customer))
        .route(
            "/manual-users/search",
            get(business::search_manual_customers),
        )
        // Caller history
        .route("/users/me/queue-history", get(history::user_queue_history))
        // Health
        .route("/health", get(health_check))
        .with_state(state);

    Router::new().merge(api_routes).layer(cors)
}

/// Issue a signed bearer token for a known principal. Stands in for the
/// external identity provider.
async fn issue_token(
    State(state): State<AppState>,
    Body(req): Body<TokenRequest>,
) -> ApiResult<String> {
    let principal = Principal {
        id: req.id,
        role: req.role,
    };
    let token = state.tokens.issue(&principal, state.clock.now_ms());
    Ok(ApiResponse::with_token(principal.id, token))
}

/// Liveness probe. Unauthenticated.
async fn health_check() -> ApiResult<&'static str> {
    Ok(ApiResponse::success("ok"))
}

//! Bearer credential extraction.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use super::types::{ApiError, AppState};
use crate::error::Error;
use crate::identity::Principal;

/// Extractor resolving the Authorization header to a principal.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(Error::Unauthorized("missing credential".to_string())))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(Error::Unauthorized("malformed credential".to_string())))?;

        let principal = state
            .tokens
            .verify(token, state.clock.now_ms())
            .map_err(ApiError)?;

        Ok(Auth(principal))
    }
}

//! HTTP request and response types.
//!
//! Every response follows the `{success, message, data, token?}`
//! envelope. Request bodies reject unknown or wrongly-typed fields.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Error;
use crate::identity::{Role, TokenService};
use crate::queue::Engine;

/// Shared application state.
pub struct AppContext {
    pub engine: Arc<Engine>,
    pub tokens: TokenService,
    pub clock: Arc<dyn Clock>,
}

pub type AppState = Arc<AppContext>;

/// Response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
            token: None,
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
            token: None,
        })
    }

    pub fn with_token(data: T, token: String) -> Json<Self> {
        Json(Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
            token: Some(token),
        })
    }
}

/// Error wrapper mapping the engine taxonomy onto HTTP statuses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ApiResponse::<()> {
            success: false,
            message: self.0.to_string(),
            data: None,
            token: None,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// JSON body extractor that surfaces malformed input as InvalidArgument
/// inside the standard envelope.
pub struct Body<T>(pub T);

impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(ApiError(Error::InvalidArgument(reject_text(rejection)))),
        }
    }
}

fn reject_text(rejection: JsonRejection) -> String {
    rejection.body_text()
}

/// Token issuance request (identity service stand-in).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenRequest {
    pub id: String,
    pub role: Role,
}

/// Queue action body; the entry id comes from the path.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionBody {
    pub action: crate::queue::QueueAction,
    #[serde(default)]
    pub added_time: Option<u32>,
}

/// Restructure request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestructureBody {
    pub business_id: String,
    pub start_time: u64,
    pub end_time: u64,
}

/// Rating body; the entry id comes from the path.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RatingBody {
    pub rating: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Break / resume body; the business id comes from the path.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BreakBody {
    #[serde(default)]
    pub helper_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Time-window query parameters. Open-ended by default.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    #[serde(default)]
    pub start_time: u64,
    #[serde(default = "default_end_time")]
    pub end_time: u64,
    #[serde(default)]
    pub helper_id: Option<String>,
}

pub fn default_end_time() -> u64 {
    i64::MAX as u64
}

/// Recent-actions query parameters.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

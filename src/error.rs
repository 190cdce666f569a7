//! Error taxonomy for the queue engine.
//!
//! Every engine operation returns one of these kinds; the HTTP layer maps
//! them onto status codes. No stack traces are surfaced to callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing field, gender not allowed by a service,
    /// undo outside the window, manualId on a normal enqueue.
    #[error("{0}")]
    InvalidArgument(String),

    /// No principal or an expired credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Principal lacks the role or relationship required.
    #[error("{0}")]
    Forbidden(String),

    /// Business, helper, service, or entry missing or soft-deleted.
    #[error("{0}")]
    NotFound(String),

    /// The action would violate an invariant if applied.
    #[error("{0}")]
    FailedPrecondition(String),

    /// A concurrent writer beat us; retried internally before surfacing.
    #[error("{0}")]
    Conflict(String),

    /// Store outage or a bug. The message is sanitized.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status code for this error kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) | Error::FailedPrecondition(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Internal(_) => 500,
        }
    }

    /// True when retrying the transaction may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(ffi, _)
                if ffi.code == rusqlite::ErrorCode::DatabaseBusy
                    || ffi.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::Conflict("concurrent writer held the store".to_string())
            }
            _ => Error::Internal(format!("store: {}", e)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {}", e))
    }
}

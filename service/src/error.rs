//! API error types and responses.
//!
//! One tagged kind per error family, one kind → status table. Handlers
//! translate only these kinds; anything else becomes a 500 with a fixed
//! JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use scrip_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request: bad JSON, empty fields, non-positive sum.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials. Responds 401 with no body.
    #[error("unauthorized")]
    Unauthorized,

    /// The withdrawal exceeds the user's balance.
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Resource conflict: login taken, order owned by another user.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Semantically unprocessable input: invalid or unavailable order
    /// number.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Auth failures carry no body at all.
            Self::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::PaymentRequired(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_required",
                msg.clone(),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConflictingLogin { login } => {
                Self::Conflict(format!("login {login} is already taken"))
            }
            // Unknown users only surface on credential checks.
            StoreError::UserNotFound { .. } | StoreError::UserNotFoundById { .. } => {
                Self::Unauthorized
            }
            StoreError::OrderExists { number } | StoreError::OrderCollision { number } => {
                Self::Conflict(format!("order {number} already exists"))
            }
            StoreError::BalanceExceeded => {
                Self::PaymentRequired("requested sum exceeds the current balance".to_string())
            }
            StoreError::OrderNotFound { number } => {
                Self::Unprocessable(format!("order {number} not found"))
            }
            StoreError::KeyNotFound { .. }
            | StoreError::NoFreshKeys
            | StoreError::InvalidStatus { .. }
            | StoreError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use creditgate_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The hold's reservation is no longer live.
    #[error("hold expired: {0}")]
    HoldExpired(String),

    /// Release attempted on a committed hold.
    #[error("hold already committed: {0}")]
    AlreadyCommitted(String),

    /// Reserve replayed with a different amount.
    #[error("amount mismatch: original={original}, requested={requested}")]
    AmountMismatch {
        /// Amount of the existing hold.
        original: i64,
        /// Amount of the replayed request.
        requested: i64,
    },

    /// Durable storage cannot be reached. Always a rejection, never
    /// translated into success (fail-closed).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

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
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::HoldExpired(msg) => (StatusCode::CONFLICT, "hold_expired", msg.clone(), None),
            Self::AlreadyCommitted(msg) => (
                StatusCode::CONFLICT,
                "already_committed",
                msg.clone(),
                None,
            ),
            Self::AmountMismatch {
                original,
                requested,
            } => (
                StatusCode::CONFLICT,
                "amount_mismatch",
                self.to_string(),
                Some(serde_json::json!({
                    "original": original,
                    "requested": requested
                })),
            ),
            Self::StorageUnavailable(msg) => {
                tracing::error!(error = %msg, "Rejecting request, storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    "Storage unavailable, request rejected".to_string(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::HoldNotFound {
                owner_id,
                request_id,
            } => Self::NotFound(format!(
                "no hold for owner {owner_id}, request {request_id}"
            )),
            StoreError::HoldExpired {
                owner_id,
                request_id,
            } => Self::HoldExpired(format!("owner {owner_id}, request {request_id}")),
            StoreError::AlreadyCommitted {
                owner_id,
                request_id,
            } => Self::AlreadyCommitted(format!("owner {owner_id}, request {request_id}")),
            StoreError::AmountMismatch {
                original,
                requested,
            } => Self::AmountMismatch {
                original,
                requested,
            },
            StoreError::InvalidAmount(amount) => {
                Self::BadRequest(format!("invalid amount: {amount} (must be positive)"))
            }
            StoreError::BalanceOverflow { balance, amount } => Self::BadRequest(format!(
                "amount {amount} cannot be applied to balance {balance}"
            )),
            // Storage failures reject the whole operation. A reservation
            // that cannot be verified is never treated as granted.
            StoreError::Unavailable(msg) | StoreError::Database(msg) => {
                Self::StorageUnavailable(msg)
            }
            StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

//! Reservation protocol handlers: reserve, commit, release.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use creditgate_core::{Hold, OwnerId, RequestId};
use creditgate_store::ReserveRequest;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// A hold in API responses.
#[derive(Debug, Serialize)]
pub struct HoldResponse {
    /// Hold ID.
    pub hold_id: String,
    /// Owner the hold is against.
    pub owner_id: String,
    /// Caller-supplied idempotency key.
    pub request_id: String,
    /// Amount reserved, in cents.
    pub amount_cents: i64,
    /// Lifecycle state: held, committed or released.
    pub state: String,
    /// Audit annotation.
    pub description: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Expiry timestamp (RFC 3339).
    pub expires_at: String,
}

impl From<&Hold> for HoldResponse {
    fn from(hold: &Hold) -> Self {
        Self {
            hold_id: hold.id.to_string(),
            owner_id: hold.owner_id.to_string(),
            request_id: hold.request_id.to_string(),
            amount_cents: hold.amount_cents,
            state: hold.state.as_str().to_string(),
            description: hold.description.clone(),
            created_at: hold.created_at.to_rfc3339(),
            expires_at: hold.expires_at.to_rfc3339(),
        }
    }
}

/// Reserve credits request.
///
/// `request_id` is mandatory: a paid operation without an idempotency key
/// is rejected before the engine is ever called.
#[derive(Debug, Deserialize)]
pub struct ReserveBody {
    /// Caller-supplied idempotency key.
    pub request_id: RequestId,
    /// Owner whose balance is charged.
    pub owner_id: OwnerId,
    /// Amount to reserve, in cents.
    pub amount_cents: i64,
    /// Audit annotation (optional).
    #[serde(default)]
    pub description: String,
    /// Hold TTL in seconds; the configured default applies when absent.
    pub ttl_seconds: Option<i64>,
}

/// Reserve credits response.
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    /// The hold backing this reservation.
    pub hold: HoldResponse,
    /// Whether this was an idempotent replay of an earlier reservation.
    pub replayed: bool,
}

/// Reserve credits for a paid operation.
///
/// Runs the availability gate first: when storage cannot be verified
/// healthy the request is rejected with 503 without touching the engine.
pub async fn reserve(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<ReserveBody>,
) -> Result<Json<ReserveResponse>, ApiError> {
    // Fail-closed pre-flight. Never grant the protected operation when the
    // ledger cannot be reached.
    state.store.check_health()?;

    let ttl_seconds = body.ttl_seconds.unwrap_or(state.config.default_ttl_seconds);
    if ttl_seconds <= 0 || ttl_seconds > state.config.max_ttl_seconds {
        return Err(ApiError::BadRequest(format!(
            "ttl_seconds must be between 1 and {}",
            state.config.max_ttl_seconds
        )));
    }

    tracing::debug!(
        service = %auth.service_name,
        owner_id = %body.owner_id,
        request_id = %body.request_id,
        amount_cents = %body.amount_cents,
        ttl_seconds = %ttl_seconds,
        "Processing reservation"
    );

    let outcome = state.store.reserve(&ReserveRequest {
        owner_id: body.owner_id,
        request_id: body.request_id,
        amount_cents: body.amount_cents,
        description: body.description,
        ttl: Duration::seconds(ttl_seconds),
    })?;

    Ok(Json(ReserveResponse {
        replayed: outcome.is_replay(),
        hold: HoldResponse::from(outcome.hold()),
    }))
}

/// Commit/release request: identifies a hold by its idempotency key.
#[derive(Debug, Deserialize)]
pub struct FinalizeBody {
    /// Caller-supplied idempotency key of the reservation.
    pub request_id: RequestId,
    /// Owner the hold is against.
    pub owner_id: OwnerId,
}

/// Finalize a reservation as spent.
pub async fn commit(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<FinalizeBody>,
) -> Result<Json<HoldResponse>, ApiError> {
    tracing::debug!(
        service = %auth.service_name,
        owner_id = %body.owner_id,
        request_id = %body.request_id,
        "Committing hold"
    );

    let hold = state.store.commit(&body.owner_id, &body.request_id)?;
    Ok(Json(HoldResponse::from(&hold)))
}

/// Cancel a reservation and refund its amount.
pub async fn release(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<FinalizeBody>,
) -> Result<Json<HoldResponse>, ApiError> {
    tracing::debug!(
        service = %auth.service_name,
        owner_id = %body.owner_id,
        request_id = %body.request_id,
        "Releasing hold"
    );

    let hold = state.store.release(&body.owner_id, &body.request_id)?;
    Ok(Json(HoldResponse::from(&hold)))
}

//! Balance and hold-audit handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use creditgate_core::OwnerId;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::reservations::HoldResponse;
use crate::state::AppState;

/// Balance query parameters.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Owner to look up.
    pub owner_id: OwnerId,
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The owner.
    pub owner_id: String,
    /// Balance in cents. Owners that were never funded report zero;
    /// balance records are created lazily.
    pub balance_cents: i64,
}

/// Get an owner's current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance_cents = state
        .store
        .get_balance(&query.owner_id)?
        .map_or(0, |b| b.amount_cents);

    Ok(Json(BalanceResponse {
        owner_id: query.owner_id.to_string(),
        balance_cents,
    }))
}

/// Add credits request.
#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    /// Owner to fund.
    pub owner_id: OwnerId,
    /// Amount in cents. Must be positive.
    pub amount_cents: i64,
    /// Reason for the credit (audit log only).
    #[serde(default)]
    pub description: String,
}

/// Add credits response.
#[derive(Debug, Serialize)]
pub struct AddCreditsResponse {
    /// New balance after the top-up, in cents.
    pub balance_cents: i64,
}

/// Fund an owner's balance.
///
/// The provisioning entry point for the payment/subscription system that
/// funds balances; that system lives outside this service.
pub async fn add_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<AddCreditsRequest>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let balance_cents = state.store.add_credits(&body.owner_id, body.amount_cents)?;

    tracing::info!(
        service = %auth.service_name,
        owner_id = %body.owner_id,
        amount_cents = %body.amount_cents,
        description = %body.description,
        new_balance = %balance_cents,
        "Credits added"
    );

    Ok(Json(AddCreditsResponse { balance_cents }))
}

/// Hold list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListHoldsQuery {
    /// Owner whose holds to list.
    pub owner_id: OwnerId,
    /// Maximum number of holds to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Hold list response.
#[derive(Debug, Serialize)]
pub struct ListHoldsResponse {
    /// Holds (newest first).
    pub holds: Vec<HoldResponse>,
    /// Whether there are more holds.
    pub has_more: bool,
}

/// List an owner's holds for audit (newest first).
pub async fn list_holds(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Query(query): Query<ListHoldsQuery>,
) -> Result<Json<ListHoldsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more.
    let limit = query.limit.min(100);
    let holds = state
        .store
        .list_holds_by_owner(&query.owner_id, limit + 1, query.offset)?;

    let has_more = holds.len() > limit;
    let holds: Vec<_> = holds.iter().take(limit).map(HoldResponse::from).collect();

    Ok(Json(ListHoldsResponse { holds, has_more }))
}

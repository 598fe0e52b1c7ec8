//! Hold types for creditgate.
//!
//! A hold earmarks credits against a balance while a protected operation
//! runs. The amount is deducted when the hold is created; committing the
//! hold finalizes the spend, releasing it refunds the amount.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{HoldId, OwnerId, RequestId};

/// Default time-to-live for a hold, in seconds (15 minutes).
///
/// A hold still `Held` past its `expires_at` is reclaimed by the expiry
/// reaper, refunding the amount.
pub const DEFAULT_HOLD_TTL_SECONDS: i64 = 15 * 60;

/// A hold against an owner's balance.
///
/// Created by `reserve` in state [`HoldState::Held`]; finalized by `commit`
/// or refunded by `release`/the expiry reaper. Holds are retained after they
/// reach a terminal state for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    /// Unique hold ID (ULID for time-ordering).
    pub id: HoldId,

    /// The owner whose balance the hold is against.
    pub owner_id: OwnerId,

    /// The caller-supplied idempotency key. `(owner_id, request_id)` is
    /// unique across all holds.
    pub request_id: RequestId,

    /// Amount deducted from the balance at reservation time, in cents.
    /// Always positive.
    pub amount_cents: i64,

    /// Current lifecycle state.
    pub state: HoldState,

    /// Free-text audit annotation. Not interpreted by the engine.
    pub description: String,

    /// When the hold was created.
    pub created_at: DateTime<Utc>,

    /// When the hold expires: `created_at + ttl`.
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Create a new hold in state [`HoldState::Held`].
    #[must_use]
    pub fn new(
        owner_id: OwnerId,
        request_id: RequestId,
        amount_cents: i64,
        description: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: HoldId::generate(),
            owner_id,
            request_id,
            amount_cents,
            state: HoldState::Held,
            description,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the hold's TTL has elapsed at `now`.
    ///
    /// Expiry only matters for holds still [`HoldState::Held`]; terminal
    /// holds are past reclamation.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Lifecycle state of a hold.
///
/// Transitions are one-directional: `Held → Committed` or `Held → Released`.
/// `Committed` and `Released` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    /// Credits are reserved, pending the outcome of the protected operation.
    Held,

    /// The spend was finalized. The deduction is permanent.
    Committed,

    /// The hold was cancelled or reclaimed and the amount refunded.
    Released,
}

impl HoldState {
    /// Check if this state is terminal (no further transitions).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Released)
    }

    /// Wire name of the state, matching its serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Committed => "committed",
            Self::Released => "released",
        }
    }
}

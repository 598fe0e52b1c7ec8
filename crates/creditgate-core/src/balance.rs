//! Balance types for creditgate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OwnerId;

/// A credit balance for an owner.
///
/// One record per owner, created lazily on the first reservation attempt or
/// explicitly at provisioning time. The balance is only ever mutated by
/// `reserve` (decrement), `release`/expiry reclaim (increment) and credit
/// top-ups; the storage layer guarantees it never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// The owner this balance belongs to.
    pub owner_id: OwnerId,

    /// Current balance in cents. Never negative.
    pub amount_cents: i64,

    /// When the balance record was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Create a new balance with zero credits.
    #[must_use]
    pub fn new(owner_id: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            amount_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the balance covers a deduction of `amount_cents`.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount_cents: i64) -> bool {
        self.amount_cents >= amount_cents
    }
}

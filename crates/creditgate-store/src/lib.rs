//! `RocksDB` storage and reservation engine for creditgate.
//!
//! This crate persists balances and holds and implements the
//! reserve/commit/release protocol as atomic state transitions.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `balances`: one balance record per owner, keyed by `owner_id`
//! - `holds`: hold records, keyed by `hold_id` (ULID)
//! - `holds_by_request`: idempotency index, `owner_id || request_id` → `hold_id`
//! - `holds_by_expiry`: expiry index for the reaper, populated only while a
//!   hold is `held`
//! - `holds_by_owner`: index for listing holds by owner
//!
//! Every state transition runs under a per-owner lock and writes all of its
//! mutations in a single `WriteBatch`, so concurrent reservations for the
//! same owner serialize and the balance can never go negative.
//!
//! # Example
//!
//! ```no_run
//! use creditgate_core::{OwnerId, RequestId};
//! use creditgate_store::{ReserveRequest, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/creditgate-db").unwrap();
//!
//! let owner_id = OwnerId::generate();
//! store.add_credits(&owner_id, 10_000).unwrap();
//!
//! let outcome = store
//!     .reserve(&ReserveRequest {
//!         owner_id,
//!         request_id: RequestId::new("job-1").unwrap(),
//!         amount_cents: 300,
//!         description: "metadata extraction".into(),
//!         ttl: chrono::Duration::minutes(15),
//!     })
//!     .unwrap();
//!
//! // ... run the protected operation, then:
//! store.commit(&owner_id, &outcome.hold().request_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Duration, Utc};

use creditgate_core::{Balance, Hold, OwnerId, RequestId};

/// Inputs to a reservation attempt.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    /// The owner whose balance is charged.
    pub owner_id: OwnerId,

    /// Caller-supplied idempotency key.
    pub request_id: RequestId,

    /// Amount to reserve, in cents. Must be positive.
    pub amount_cents: i64,

    /// Free-text audit annotation stored on the hold.
    pub description: String,

    /// How long the hold stays reclaimable before the reaper refunds it.
    pub ttl: Duration,
}

/// Outcome of a reservation attempt.
///
/// Replaying `reserve` with an already-seen `(owner, request id)` pair
/// returns the original hold without touching the balance. Callers that
/// treat both cases identically can use [`ReserveOutcome::into_hold`].
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// A new hold was created and the balance deducted.
    Created(Hold),

    /// An existing hold was returned unchanged (idempotent replay).
    Replayed(Hold),
}

impl ReserveOutcome {
    /// Borrow the hold regardless of whether it was created or replayed.
    #[must_use]
    pub fn hold(&self) -> &Hold {
        match self {
            Self::Created(hold) | Self::Replayed(hold) => hold,
        }
    }

    /// Consume the outcome, returning the hold.
    #[must_use]
    pub fn into_hold(self) -> Hold {
        match self {
            Self::Created(hold) | Self::Replayed(hold) => hold,
        }
    }

    /// Check if this outcome was an idempotent replay.
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// The storage trait defining all ledger operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, test doubles for failure injection).
pub trait Store: Send + Sync {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Get an owner's balance.
    ///
    /// Returns `None` if the owner has never been funded or charged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, owner_id: &OwnerId) -> Result<Option<Balance>>;

    /// Add credits to an owner's balance, creating the balance record if it
    /// does not exist. Returns the new balance in cents.
    ///
    /// This is the provisioning/top-up entry point; the payment system that
    /// funds balances sits outside this crate.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidAmount` if `amount_cents` is not positive,
    /// or an error if the database operation fails.
    fn add_credits(&self, owner_id: &OwnerId, amount_cents: i64) -> Result<i64>;

    // =========================================================================
    // Hold Lookups
    // =========================================================================

    /// Get the hold for an `(owner, request id)` pair, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_hold(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Option<Hold>>;

    /// List holds for an owner, ordered by creation time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_holds_by_owner(
        &self,
        owner_id: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hold>>;

    // =========================================================================
    // Reservation Transitions
    // =========================================================================

    /// Reserve credits: deduct `amount_cents` from the owner's balance and
    /// create a hold, atomically.
    ///
    /// If a hold already exists for `(owner, request id)`, it is returned
    /// unchanged as [`ReserveOutcome::Replayed`], regardless of its current
    /// state, and no balance mutation occurs.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if the amount is not positive.
    /// - `StoreError::InsufficientCredits` if the balance is too low.
    /// - `StoreError::AmountMismatch` if a replay carries a different amount
    ///   than the original call.
    fn reserve(&self, request: &ReserveRequest) -> Result<ReserveOutcome>;

    /// Finalize a held reservation as spent (`held` → `committed`).
    ///
    /// No balance mutation: the deduction already happened at reservation
    /// time. Idempotent: committing an already-committed hold returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - `StoreError::HoldNotFound` if no hold exists for the pair.
    /// - `StoreError::HoldExpired` if the hold's TTL elapsed or it was
    ///   already released.
    fn commit(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Hold>;

    /// Cancel a held reservation and refund its amount (`held` → `released`),
    /// atomically.
    ///
    /// Idempotent: releasing an already-released hold is a no-op that
    /// returns it unchanged (no double refund).
    ///
    /// # Errors
    ///
    /// - `StoreError::HoldNotFound` if no hold exists for the pair.
    /// - `StoreError::AlreadyCommitted` if the hold was finalized by
    ///   `commit`; committed spend is never reversible through this path.
    fn release(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Hold>;

    /// Release every hold still `held` whose `expires_at` is before `now`,
    /// refunding each amount. Returns the number of holds reclaimed.
    ///
    /// Uses the same guarded transition as [`Store::release`], so racing
    /// with an explicit release or commit skips the hold instead of
    /// double-refunding. Safe to run concurrently with itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn release_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Availability Gate
    // =========================================================================

    /// Cheap read verifying that durable storage is reachable.
    ///
    /// Callers run this before `reserve` and treat failure as a rejection of
    /// the whole request (fail-closed). It is a pre-flight policy check, not
    /// a substitute for the transactional guarantees inside the transitions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if storage cannot be reached.
    fn check_health(&self) -> Result<()>;
}

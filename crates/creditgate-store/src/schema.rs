//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Balance records, keyed by `owner_id`.
    pub const BALANCES: &str = "balances";

    /// Hold records, keyed by `hold_id` (ULID).
    pub const HOLDS: &str = "holds";

    /// Idempotency index: `owner_id || request_id` → `hold_id`.
    ///
    /// One entry per `(owner, request id)` pair for the lifetime of the
    /// hold; this is the uniqueness constraint that makes `reserve` replays
    /// return the original hold.
    pub const HOLDS_BY_REQUEST: &str = "holds_by_request";

    /// Expiry index: `expires_at (8 bytes BE millis) || hold_id` → empty.
    ///
    /// Entries exist only while a hold is `held`; commit and release delete
    /// them, so the reaper scan only visits live holds, in expiry order.
    pub const HOLDS_BY_EXPIRY: &str = "holds_by_expiry";

    /// Index: holds by owner, keyed by `owner_id || hold_id`.
    /// Value is empty (index only).
    pub const HOLDS_BY_OWNER: &str = "holds_by_owner";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::HOLDS,
        cf::HOLDS_BY_REQUEST,
        cf::HOLDS_BY_EXPIRY,
        cf::HOLDS_BY_OWNER,
    ]
}

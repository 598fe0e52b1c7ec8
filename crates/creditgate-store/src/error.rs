//! Error types for creditgate storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage and reservation operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Durable storage cannot be reached (availability gate failed).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Insufficient credits at reservation time.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in cents.
        balance: i64,
        /// Required amount in cents.
        required: i64,
    },

    /// No hold exists for the given `(owner, request id)` pair.
    #[error("hold not found for owner {owner_id}, request {request_id}")]
    HoldNotFound {
        /// The owner the hold was looked up for.
        owner_id: String,
        /// The request id the hold was looked up for.
        request_id: String,
    },

    /// `commit` called on a hold whose reservation is no longer live, either
    /// because its TTL elapsed or because it was already released.
    #[error("hold expired for owner {owner_id}, request {request_id}")]
    HoldExpired {
        /// The owner the hold belongs to.
        owner_id: String,
        /// The request id the hold belongs to.
        request_id: String,
    },

    /// `release` called on a hold already finalized by `commit`.
    #[error("hold already committed for owner {owner_id}, request {request_id}")]
    AlreadyCommitted {
        /// The owner the hold belongs to.
        owner_id: String,
        /// The request id the hold belongs to.
        request_id: String,
    },

    /// `reserve` replayed with a different amount than the original call.
    #[error("reserve replayed with mismatched amount: original={original}, requested={requested}")]
    AmountMismatch {
        /// Amount of the existing hold, in cents.
        original: i64,
        /// Amount of the replayed request, in cents.
        requested: i64,
    },

    /// A reservation or top-up amount that is not a positive integer.
    #[error("invalid amount: {0} (must be positive)")]
    InvalidAmount(i64),

    /// A credit or refund would push the balance past the representable
    /// range. The balance is left unchanged.
    #[error("balance overflow: balance={balance}, amount={amount}")]
    BalanceOverflow {
        /// Current balance in cents.
        balance: i64,
        /// Amount that could not be applied, in cents.
        amount: i64,
    },
}

//! Core types for creditgate.
//!
//! This crate provides the foundational types used throughout the creditgate
//! reservation ledger:
//!
//! - **Identifiers**: `OwnerId`, `HoldId`, `RequestId`
//! - **Balances**: `Balance`
//! - **Holds**: `Hold`, `HoldState`
//!
//! # Credit unit
//!
//! **1 credit = $0.01 (1 cent)**
//!
//! Balances and hold amounts are stored as `i64` integer cents to avoid
//! floating point precision issues. The storage layer enforces that a
//! balance never goes below zero.
//!
//! # Reservation lifecycle
//!
//! A paid operation is gated by a three-step protocol:
//!
//! 1. `reserve` deducts the amount from the owner's balance and creates a
//!    `Hold` in state [`HoldState::Held`].
//! 2. If the protected operation succeeds, `commit` finalizes the spend
//!    (`Held` → `Committed`; no balance change).
//! 3. If it fails or is abandoned, `release` (or the expiry reaper) refunds
//!    the amount (`Held` → `Released`).
//!
//! `Committed` and `Released` are terminal; a hold never re-enters `Held`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod balance;
pub mod hold;
pub mod ids;
pub mod request;

pub use balance::Balance;
pub use hold::{Hold, HoldState, DEFAULT_HOLD_TTL_SECONDS};
pub use ids::{HoldId, IdError, OwnerId};
pub use request::{RequestId, RequestIdError, MAX_REQUEST_ID_BYTES};

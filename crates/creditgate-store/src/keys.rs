//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families.

use chrono::{DateTime, Utc};

use creditgate_core::{HoldId, OwnerId, RequestId};

/// Create a balance key from an owner ID.
#[must_use]
pub fn balance_key(owner_id: &OwnerId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Create a hold key from a hold ID.
#[must_use]
pub fn hold_key(hold_id: &HoldId) -> Vec<u8> {
    hold_id.to_bytes().to_vec()
}

/// Create an idempotency index key.
///
/// Format: `owner_id (16 bytes) || request_id bytes`
///
/// Request ids are bounded-length, so the composite key is bounded too.
#[must_use]
pub fn request_key(owner_id: &OwnerId, request_id: &RequestId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + request_id.as_bytes().len());
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(request_id.as_bytes());
    key
}

/// Create an expiry index key.
///
/// Format: `expires_at millis (8 bytes big-endian) || hold_id (16 bytes)`
///
/// Big-endian timestamps make lexicographic key order equal expiry order,
/// so a forward scan from the start of the column family visits holds in
/// the order they become due.
#[must_use]
pub fn expiry_key(expires_at: DateTime<Utc>, hold_id: &HoldId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&expires_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(&hold_id.to_bytes());
    key
}

/// Extract the expiry timestamp (millis since epoch) from an expiry index key.
///
/// # Panics
///
/// Panics if the key is shorter than 8 bytes.
#[must_use]
pub fn extract_expiry_millis(key: &[u8]) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[..8]);
    i64::from_be_bytes(bytes)
}

/// Extract the hold ID from an expiry index key.
///
/// # Panics
///
/// Panics if the key is not at least 24 bytes.
#[must_use]
pub fn extract_hold_id_from_expiry_key(key: &[u8]) -> HoldId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[8..24]);
    HoldId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create an owner-hold index key.
///
/// Format: `owner_id (16 bytes) || hold_id (16 bytes)`
///
/// Since ULIDs are time-ordered, holds for an owner come back in creation
/// order.
#[must_use]
pub fn owner_hold_key(owner_id: &OwnerId, hold_id: &HoldId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(&hold_id.to_bytes());
    key
}

/// Create a prefix for iterating all holds for an owner.
#[must_use]
pub fn owner_holds_prefix(owner_id: &OwnerId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Extract the hold ID from an owner-hold index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_hold_id_from_owner_key(key: &[u8]) -> HoldId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    HoldId::from_bytes(bytes).expect("valid ULID bytes")
}

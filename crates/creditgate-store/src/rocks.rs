//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. All reservation transitions serialize per owner: each one acquires
//! the owner's entry in an in-process lock registry, re-reads current state
//! inside the critical section, and writes its mutations in a single
//! `WriteBatch`. `RocksDB` is an embedded, single-process store, so this is
//! the equivalent of a row lock plus a transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use creditgate_core::{Balance, Hold, HoldId, HoldState, OwnerId, RequestId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{ReserveOutcome, ReserveRequest, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Per-owner locks serializing reservation transitions. Entries are
    /// created on first use and retained; the set of active owners is small
    /// relative to the hold history.
    owner_locks: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            owner_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Get the lock serializing transitions for one owner.
    fn owner_lock(&self, owner_id: &OwnerId) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock();
        Arc::clone(
            locks
                .entry(*owner_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Get a hold by its primary key.
    fn get_hold_by_id(&self, hold_id: &HoldId) -> Result<Option<Hold>> {
        let cf = self.cf(cf::HOLDS)?;
        let key = keys::hold_key(hold_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Transition a `held` hold to `released` and refund its amount.
    ///
    /// Caller must hold the owner lock and have verified `hold.state` is
    /// [`HoldState::Held`] inside the critical section.
    fn release_held(&self, mut hold: Hold) -> Result<Hold> {
        debug_assert_eq!(hold.state, HoldState::Held);

        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_holds = self.cf(cf::HOLDS)?;
        let cf_expiry = self.cf(cf::HOLDS_BY_EXPIRY)?;

        let mut balance = self
            .get_balance(&hold.owner_id)?
            .unwrap_or_else(|| Balance::new(hold.owner_id));
        balance.amount_cents = balance
            .amount_cents
            .checked_add(hold.amount_cents)
            .ok_or(StoreError::BalanceOverflow {
                balance: balance.amount_cents,
                amount: hold.amount_cents,
            })?;
        balance.updated_at = Utc::now();

        let expiry_key = keys::expiry_key(hold.expires_at, &hold.id);
        hold.state = HoldState::Released;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_balances, keys::balance_key(&hold.owner_id), Self::serialize(&balance)?);
        batch.put_cf(&cf_holds, keys::hold_key(&hold.id), Self::serialize(&hold)?);
        batch.delete_cf(&cf_expiry, expiry_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            owner_id = %hold.owner_id,
            request_id = %hold.request_id,
            amount_cents = %hold.amount_cents,
            new_balance = %balance.amount_cents,
            "Hold released, amount refunded"
        );

        Ok(hold)
    }

    /// Collect hold IDs from the expiry index that are due at `now`.
    ///
    /// The index is big-endian-timestamp ordered, so a forward scan stops at
    /// the first entry that is not yet due.
    fn due_hold_ids(&self, now: DateTime<Utc>) -> Result<Vec<HoldId>> {
        let cf_expiry = self.cf(cf::HOLDS_BY_EXPIRY)?;
        let now_millis = now.timestamp_millis();

        let mut due = Vec::new();
        for item in self.db.iterator_cf(&cf_expiry, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if keys::extract_expiry_millis(&key) >= now_millis {
                break;
            }
            due.push(keys::extract_hold_id_from_expiry_key(&key));
        }

        Ok(due)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    fn get_balance(&self, owner_id: &OwnerId) -> Result<Option<Balance>> {
        let cf = self.cf(cf::BALANCES)?;
        let key = keys::balance_key(owner_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn add_credits(&self, owner_id: &OwnerId, amount_cents: i64) -> Result<i64> {
        if amount_cents <= 0 {
            return Err(StoreError::InvalidAmount(amount_cents));
        }

        let lock = self.owner_lock(owner_id);
        let _guard = lock.lock();

        let cf = self.cf(cf::BALANCES)?;
        let mut balance = self
            .get_balance(owner_id)?
            .unwrap_or_else(|| Balance::new(*owner_id));
        balance.amount_cents = balance
            .amount_cents
            .checked_add(amount_cents)
            .ok_or(StoreError::BalanceOverflow {
                balance: balance.amount_cents,
                amount: amount_cents,
            })?;
        balance.updated_at = Utc::now();

        self.db
            .put_cf(&cf, keys::balance_key(owner_id), Self::serialize(&balance)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            owner_id = %owner_id,
            amount_cents = %amount_cents,
            new_balance = %balance.amount_cents,
            "Credits added"
        );

        Ok(balance.amount_cents)
    }

    // =========================================================================
    // Hold Lookups
    // =========================================================================

    fn get_hold(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Option<Hold>> {
        let cf = self.cf(cf::HOLDS_BY_REQUEST)?;
        let key = keys::request_key(owner_id, request_id);

        let Some(hold_id_bytes) = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut bytes = [0u8; 16];
        if hold_id_bytes.len() != 16 {
            return Err(StoreError::Database(
                "malformed hold id in request index".into(),
            ));
        }
        bytes.copy_from_slice(&hold_id_bytes);
        let hold_id = HoldId::from_bytes(bytes)
            .map_err(|e| StoreError::Database(format!("malformed hold id: {e}")))?;

        self.get_hold_by_id(&hold_id)
    }

    fn list_holds_by_owner(
        &self,
        owner_id: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hold>> {
        let cf_by_owner = self.cf(cf::HOLDS_BY_OWNER)?;
        let prefix = keys::owner_holds_prefix(owner_id);

        let iter = self.db.iterator_cf(
            &cf_by_owner,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // Collect matching keys first; ULIDs are time-ordered, so reversing
        // gives newest first.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut holds = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if holds.len() >= limit {
                break;
            }

            let hold_id = keys::extract_hold_id_from_owner_key(&key);
            if let Some(hold) = self.get_hold_by_id(&hold_id)? {
                holds.push(hold);
            }
        }

        Ok(holds)
    }

    // =========================================================================
    // Reservation Transitions
    // =========================================================================

    fn reserve(&self, request: &ReserveRequest) -> Result<ReserveOutcome> {
        if request.amount_cents <= 0 {
            return Err(StoreError::InvalidAmount(request.amount_cents));
        }

        let lock = self.owner_lock(&request.owner_id);
        let _guard = lock.lock();

        // Idempotent replay: an existing hold for the pair is returned
        // unchanged, whatever its state. A replay with a different amount is
        // a client bug and rejected rather than silently answered with the
        // original amount.
        if let Some(existing) = self.get_hold(&request.owner_id, &request.request_id)? {
            if existing.amount_cents != request.amount_cents {
                return Err(StoreError::AmountMismatch {
                    original: existing.amount_cents,
                    requested: request.amount_cents,
                });
            }

            tracing::debug!(
                owner_id = %request.owner_id,
                request_id = %request.request_id,
                hold_id = %existing.id,
                "Reserve replay, returning existing hold"
            );

            return Ok(ReserveOutcome::Replayed(existing));
        }

        // Balance records are created lazily on first reservation attempt.
        let mut balance = self
            .get_balance(&request.owner_id)?
            .unwrap_or_else(|| Balance::new(request.owner_id));

        if !balance.has_sufficient_credits(request.amount_cents) {
            return Err(StoreError::InsufficientCredits {
                balance: balance.amount_cents,
                required: request.amount_cents,
            });
        }

        balance.amount_cents -= request.amount_cents;
        balance.updated_at = Utc::now();

        let hold = Hold::new(
            request.owner_id,
            request.request_id.clone(),
            request.amount_cents,
            request.description.clone(),
            request.ttl,
        );

        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_holds = self.cf(cf::HOLDS)?;
        let cf_by_request = self.cf(cf::HOLDS_BY_REQUEST)?;
        let cf_by_expiry = self.cf(cf::HOLDS_BY_EXPIRY)?;
        let cf_by_owner = self.cf(cf::HOLDS_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_balances,
            keys::balance_key(&request.owner_id),
            Self::serialize(&balance)?,
        );
        batch.put_cf(&cf_holds, keys::hold_key(&hold.id), Self::serialize(&hold)?);
        batch.put_cf(
            &cf_by_request,
            keys::request_key(&request.owner_id, &request.request_id),
            hold.id.to_bytes(),
        );
        batch.put_cf(&cf_by_expiry, keys::expiry_key(hold.expires_at, &hold.id), []);
        batch.put_cf(
            &cf_by_owner,
            keys::owner_hold_key(&request.owner_id, &hold.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            owner_id = %request.owner_id,
            request_id = %request.request_id,
            hold_id = %hold.id,
            amount_cents = %request.amount_cents,
            new_balance = %balance.amount_cents,
            expires_at = %hold.expires_at,
            "Credits reserved"
        );

        Ok(ReserveOutcome::Created(hold))
    }

    fn commit(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Hold> {
        let lock = self.owner_lock(owner_id);
        let _guard = lock.lock();

        let mut hold =
            self.get_hold(owner_id, request_id)?
                .ok_or_else(|| StoreError::HoldNotFound {
                    owner_id: owner_id.to_string(),
                    request_id: request_id.to_string(),
                })?;

        match hold.state {
            // Idempotent: a committed hold stays committed.
            HoldState::Committed => Ok(hold),

            // The reservation is gone, reclaimed by the reaper or released
            // explicitly. Either way the caller must not assume the credits
            // are still reserved.
            HoldState::Released => Err(StoreError::HoldExpired {
                owner_id: owner_id.to_string(),
                request_id: request_id.to_string(),
            }),

            HoldState::Held => {
                let now = Utc::now();
                if hold.is_expired(now) {
                    return Err(StoreError::HoldExpired {
                        owner_id: owner_id.to_string(),
                        request_id: request_id.to_string(),
                    });
                }

                let cf_holds = self.cf(cf::HOLDS)?;
                let cf_expiry = self.cf(cf::HOLDS_BY_EXPIRY)?;

                let expiry_key = keys::expiry_key(hold.expires_at, &hold.id);
                hold.state = HoldState::Committed;

                // No balance mutation: the deduction happened at reservation
                // time. Committing only pins the state so no later release
                // or reclaim can refund it.
                let mut batch = WriteBatch::default();
                batch.put_cf(&cf_holds, keys::hold_key(&hold.id), Self::serialize(&hold)?);
                batch.delete_cf(&cf_expiry, expiry_key);

                self.db
                    .write(batch)
                    .map_err(|e| StoreError::Database(e.to_string()))?;

                tracing::info!(
                    owner_id = %owner_id,
                    request_id = %request_id,
                    hold_id = %hold.id,
                    amount_cents = %hold.amount_cents,
                    "Hold committed"
                );

                Ok(hold)
            }
        }
    }

    fn release(&self, owner_id: &OwnerId, request_id: &RequestId) -> Result<Hold> {
        let lock = self.owner_lock(owner_id);
        let _guard = lock.lock();

        let hold =
            self.get_hold(owner_id, request_id)?
                .ok_or_else(|| StoreError::HoldNotFound {
                    owner_id: owner_id.to_string(),
                    request_id: request_id.to_string(),
                })?;

        match hold.state {
            // Idempotent no-op: already refunded, never refund twice.
            HoldState::Released => Ok(hold),

            HoldState::Committed => Err(StoreError::AlreadyCommitted {
                owner_id: owner_id.to_string(),
                request_id: request_id.to_string(),
            }),

            HoldState::Held => self.release_held(hold),
        }
    }

    fn release_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.due_hold_ids(now)?;

        let mut released = 0;
        for hold_id in due {
            let Some(hold) = self.get_hold_by_id(&hold_id)? else {
                continue;
            };

            let lock = self.owner_lock(&hold.owner_id);
            let _guard = lock.lock();

            // Re-read inside the critical section: a concurrent commit or
            // release may have won since the scan, in which case this hold
            // is skipped.
            let Some(hold) = self.get_hold_by_id(&hold_id)? else {
                continue;
            };
            if hold.state != HoldState::Held || !hold.is_expired(now) {
                continue;
            }

            self.release_held(hold)?;
            released += 1;
        }

        if released > 0 {
            tracing::info!(count = %released, "Expired holds reclaimed");
        }

        Ok(released)
    }

    // =========================================================================
    // Availability Gate
    // =========================================================================

    fn check_health(&self) -> Result<()> {
        let cf = self
            .db
            .cf_handle(cf::BALANCES)
            .ok_or_else(|| StoreError::Unavailable("balances column family missing".into()))?;

        // A trivial point read; the value does not matter, only that the
        // database answers.
        self.db
            .get_cf(&cf, [0u8])
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn request_id(s: &str) -> RequestId {
        RequestId::new(s).unwrap()
    }

    fn reserve_request(owner_id: OwnerId, req: &str, amount_cents: i64) -> ReserveRequest {
        ReserveRequest {
            owner_id,
            request_id: request_id(req),
            amount_cents,
            description: "metadata extraction".into(),
            ttl: Duration::minutes(15),
        }
    }

    fn balance_of(store: &RocksStore, owner_id: &OwnerId) -> i64 {
        store.get_balance(owner_id).unwrap().unwrap().amount_cents
    }

    #[test]
    fn add_credits_creates_balance_lazily() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        assert!(store.get_balance(&owner_id).unwrap().is_none());

        assert_eq!(store.add_credits(&owner_id, 5000).unwrap(), 5000);
        assert_eq!(store.add_credits(&owner_id, 1000).unwrap(), 6000);
        assert_eq!(balance_of(&store, &owner_id), 6000);
    }

    #[test]
    fn add_credits_rejects_non_positive() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        assert!(matches!(
            store.add_credits(&owner_id, 0),
            Err(StoreError::InvalidAmount(0))
        ));
        assert!(matches!(
            store.add_credits(&owner_id, -5),
            Err(StoreError::InvalidAmount(-5))
        ));
    }

    #[test]
    fn add_credits_rejects_overflow_and_leaves_balance_unchanged() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        assert_eq!(store.add_credits(&owner_id, i64::MAX).unwrap(), i64::MAX);

        let result = store.add_credits(&owner_id, 1);
        assert!(matches!(
            result,
            Err(StoreError::BalanceOverflow {
                balance: i64::MAX,
                amount: 1
            })
        ));
        assert_eq!(balance_of(&store, &owner_id), i64::MAX);
    }

    #[test]
    fn release_refund_rejects_overflow_and_keeps_hold_live() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();
        // Top up to the ceiling so the refund cannot be represented.
        store.add_credits(&owner_id, i64::MAX - 70).unwrap();

        let result = store.release(&owner_id, &request_id("r1"));
        assert!(matches!(
            result,
            Err(StoreError::BalanceOverflow { amount: 30, .. })
        ));
        assert_eq!(balance_of(&store, &owner_id), i64::MAX);
        assert_eq!(
            store
                .get_hold(&owner_id, &request_id("r1"))
                .unwrap()
                .unwrap()
                .state,
            HoldState::Held
        );
    }

    #[test]
    fn reserve_deducts_and_replay_is_idempotent() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        let request = reserve_request(owner_id, "r1", 30);

        let first = store.reserve(&request).unwrap();
        assert!(!first.is_replay());
        assert_eq!(first.hold().state, HoldState::Held);
        assert_eq!(balance_of(&store, &owner_id), 70);

        // Replay returns the same hold without a second deduction.
        let second = store.reserve(&request).unwrap();
        assert!(second.is_replay());
        assert_eq!(second.hold(), first.hold());
        assert_eq!(balance_of(&store, &owner_id), 70);
    }

    #[test]
    fn reserve_replay_with_different_amount_is_rejected() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();

        let result = store.reserve(&reserve_request(owner_id, "r1", 40));
        assert!(matches!(
            result,
            Err(StoreError::AmountMismatch {
                original: 30,
                requested: 40
            })
        ));
        assert_eq!(balance_of(&store, &owner_id), 70);
    }

    #[test]
    fn reserve_insufficient_credits_leaves_no_hold() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 10).unwrap();

        let result = store.reserve(&reserve_request(owner_id, "r2", 30));
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 10,
                required: 30
            })
        ));
        assert_eq!(balance_of(&store, &owner_id), 10);
        assert!(store
            .get_hold(&owner_id, &request_id("r2"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn reserve_unfunded_owner_fails_with_zero_balance() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        let result = store.reserve(&reserve_request(owner_id, "r1", 5));
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 0,
                required: 5
            })
        ));
    }

    #[test]
    fn reserve_rejects_non_positive_amount() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        assert!(matches!(
            store.reserve(&reserve_request(owner_id, "r1", 0)),
            Err(StoreError::InvalidAmount(0))
        ));
        assert!(matches!(
            store.reserve(&reserve_request(owner_id, "r1", -30)),
            Err(StoreError::InvalidAmount(-30))
        ));
    }

    #[test]
    fn commit_finalizes_and_blocks_release() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();
        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();

        let committed = store.commit(&owner_id, &request_id("r1")).unwrap();
        assert_eq!(committed.state, HoldState::Committed);
        assert_eq!(balance_of(&store, &owner_id), 70); // no balance change

        // Idempotent commit.
        let again = store.commit(&owner_id, &request_id("r1")).unwrap();
        assert_eq!(again, committed);

        // Committed spend is never reversible through release.
        let result = store.release(&owner_id, &request_id("r1"));
        assert!(matches!(result, Err(StoreError::AlreadyCommitted { .. })));
        assert_eq!(balance_of(&store, &owner_id), 70);
    }

    #[test]
    fn commit_unknown_hold_fails() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        let result = store.commit(&owner_id, &request_id("missing"));
        assert!(matches!(result, Err(StoreError::HoldNotFound { .. })));
    }

    #[test]
    fn commit_after_expiry_fails() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        let mut request = reserve_request(owner_id, "r1", 30);
        request.ttl = Duration::milliseconds(1);
        store.reserve(&request).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = store.commit(&owner_id, &request_id("r1"));
        assert!(matches!(result, Err(StoreError::HoldExpired { .. })));
    }

    #[test]
    fn release_refunds_once() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();
        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();
        assert_eq!(balance_of(&store, &owner_id), 70);

        let released = store.release(&owner_id, &request_id("r1")).unwrap();
        assert_eq!(released.state, HoldState::Released);
        assert_eq!(balance_of(&store, &owner_id), 100);

        // Idempotent: no double refund.
        let again = store.release(&owner_id, &request_id("r1")).unwrap();
        assert_eq!(again.state, HoldState::Released);
        assert_eq!(balance_of(&store, &owner_id), 100);
    }

    #[test]
    fn release_unknown_hold_fails() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();

        let result = store.release(&owner_id, &request_id("missing"));
        assert!(matches!(result, Err(StoreError::HoldNotFound { .. })));
    }

    #[test]
    fn commit_after_release_reports_expired() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();
        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();
        store.release(&owner_id, &request_id("r1")).unwrap();

        let result = store.commit(&owner_id, &request_id("r1"));
        assert!(matches!(result, Err(StoreError::HoldExpired { .. })));
    }

    #[test]
    fn reaper_reclaims_expired_holds() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 50).unwrap();

        let mut request = reserve_request(owner_id, "r3", 20);
        request.ttl = Duration::milliseconds(1);
        store.reserve(&request).unwrap();
        assert_eq!(balance_of(&store, &owner_id), 30);

        std::thread::sleep(std::time::Duration::from_millis(5));

        let count = store.release_expired(Utc::now()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(balance_of(&store, &owner_id), 50);

        let hold = store.get_hold(&owner_id, &request_id("r3")).unwrap().unwrap();
        assert_eq!(hold.state, HoldState::Released);

        // A later commit must not assume the credits are still reserved.
        let result = store.commit(&owner_id, &request_id("r3"));
        assert!(matches!(result, Err(StoreError::HoldExpired { .. })));

        // Second sweep finds nothing.
        assert_eq!(store.release_expired(Utc::now()).unwrap(), 0);
    }

    #[test]
    fn reaper_skips_unexpired_holds() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        let mut short = reserve_request(owner_id, "short", 10);
        short.ttl = Duration::minutes(1);
        store.reserve(&short).unwrap();

        let mut long = reserve_request(owner_id, "long", 10);
        long.ttl = Duration::minutes(30);
        store.reserve(&long).unwrap();
        assert_eq!(balance_of(&store, &owner_id), 80);

        // Sweep at a point where only the short hold is due.
        let count = store
            .release_expired(Utc::now() + Duration::minutes(10))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(balance_of(&store, &owner_id), 90);

        let short_hold = store
            .get_hold(&owner_id, &request_id("short"))
            .unwrap()
            .unwrap();
        assert_eq!(short_hold.state, HoldState::Released);
        let long_hold = store
            .get_hold(&owner_id, &request_id("long"))
            .unwrap()
            .unwrap();
        assert_eq!(long_hold.state, HoldState::Held);
    }

    #[test]
    fn reaper_skips_committed_holds() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();
        store.reserve(&reserve_request(owner_id, "r1", 30)).unwrap();
        store.commit(&owner_id, &request_id("r1")).unwrap();

        // Even well past expiry, committed spend stays spent.
        let count = store
            .release_expired(Utc::now() + Duration::hours(2))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(balance_of(&store, &owner_id), 70);
    }

    #[test]
    fn release_and_reaper_refund_exactly_once() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        let mut request = reserve_request(owner_id, "r1", 30);
        request.ttl = Duration::milliseconds(1);
        store.reserve(&request).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));

        // Explicit release wins; the sweep observes a terminal state and
        // skips the hold.
        store.release(&owner_id, &request_id("r1")).unwrap();
        assert_eq!(store.release_expired(Utc::now()).unwrap(), 0);
        assert_eq!(balance_of(&store, &owner_id), 100);
    }

    #[test]
    fn concurrent_reserves_never_overdraw() {
        let (store, dir) = create_test_store();
        let store = Arc::new(store);
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        // 10 concurrent reservations of 30 against a balance of 100:
        // exactly 3 can win.
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.reserve(&reserve_request(owner_id, &format!("r{i}"), 30))
                })
            })
            .collect();

        let mut successes = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::InsufficientCredits { .. }) => insufficient += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(insufficient, 7);
        assert_eq!(balance_of(&store, &owner_id), 10);

        drop(store);
        drop(dir);
    }

    #[test]
    fn concurrent_replays_deduct_once() {
        let (store, dir) = create_test_store();
        let store = Arc::new(store);
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.reserve(&reserve_request(owner_id, "r1", 30)))
            })
            .collect();

        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        let created = outcomes.iter().filter(|o| !o.is_replay()).count();
        assert_eq!(created, 1);
        assert_eq!(balance_of(&store, &owner_id), 70);

        // Every caller saw the same hold.
        let first = outcomes[0].hold();
        assert!(outcomes.iter().all(|o| o.hold() == first));

        drop(store);
        drop(dir);
    }

    #[test]
    fn list_holds_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let owner_id = OwnerId::generate();
        store.add_credits(&owner_id, 100).unwrap();

        store.reserve(&reserve_request(owner_id, "a", 10)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2)); // distinct ULID timestamps
        store.reserve(&reserve_request(owner_id, "b", 10)).unwrap();

        let holds = store.list_holds_by_owner(&owner_id, 10, 0).unwrap();
        assert_eq!(holds.len(), 2);
        assert_eq!(holds[0].request_id.as_str(), "b"); // newest first
        assert_eq!(holds[1].request_id.as_str(), "a");

        let page1 = store.list_holds_by_owner(&owner_id, 1, 0).unwrap();
        let page2 = store.list_holds_by_owner(&owner_id, 1, 1).unwrap();
        assert_eq!(page1[0].request_id.as_str(), "b");
        assert_eq!(page2[0].request_id.as_str(), "a");

        // Other owners see nothing.
        let other = OwnerId::generate();
        assert!(store.list_holds_by_owner(&other, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn check_health_on_open_store() {
        let (store, _dir) = create_test_store();
        store.check_health().unwrap();
    }
}

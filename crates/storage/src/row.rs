//! A single table row
//!
//! A row carries three views of its value: the last committed value, the most
//! recent uncommitted write by anyone, and a per-transaction overlay of
//! uncommitted writes. The fields sit behind a short-lived mutex that is
//! separate from the row's transactional [`TrackableRwLock`]; the former is
//! only ever held for a field update, the latter for as long as an isolation
//! strategy dictates.

use crate::lock::TrackableRwLock;
use isolab_core::{Key, TransactionId, Value};
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug)]
pub(crate) struct RowState {
    pub(crate) committed: Value,
    pub(crate) latest_uncommitted: Value,
    pub(crate) uncommitted_by_tx: FxHashMap<TransactionId, Value>,
}

/// One key of the table together with its lock
///
/// # Thread Safety
///
/// `Row` is shared as `Arc<Row>`. Field accessors take the internal mutex
/// for the duration of the call only, so they never block on the
/// transactional lock.
#[derive(Debug)]
pub struct Row {
    key: Key,
    lock: TrackableRwLock,
    state: Mutex<RowState>,
}

impl Row {
    /// Create a row whose committed and latest values are both `committed`
    pub fn new(key: Key, committed: Value) -> Self {
        Self {
            key,
            lock: TrackableRwLock::new(),
            state: Mutex::new(RowState {
                latest_uncommitted: committed.clone(),
                committed,
                uncommitted_by_tx: FxHashMap::default(),
            }),
        }
    }

    /// The row's key
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The row's transactional lock
    pub fn lock(&self) -> &TrackableRwLock {
        &self.lock
    }

    /// Last committed value
    pub fn committed(&self) -> Value {
        self.state.lock().committed.clone()
    }

    /// Most recent write by any transaction, committed or not
    pub fn latest_uncommitted(&self) -> Value {
        self.state.lock().latest_uncommitted.clone()
    }

    /// `tx`'s own uncommitted write, if it has one
    pub fn uncommitted_for(&self, tx: &TransactionId) -> Option<Value> {
        self.state.lock().uncommitted_by_tx.get(tx).cloned()
    }

    /// Value a write by `tx` replaces: its own overlay, else committed
    pub fn previous_for(&self, tx: &TransactionId) -> Value {
        let state = self.state.lock();
        state
            .uncommitted_by_tx
            .get(tx)
            .cloned()
            .unwrap_or_else(|| state.committed.clone())
    }

    /// Record an uncommitted write by `tx`
    ///
    /// Updates both the shared latest value and `tx`'s overlay entry. Used
    /// for forward writes and for undo replay alike.
    pub fn write_uncommitted(&self, tx: &TransactionId, value: Value) {
        let mut state = self.state.lock();
        state.latest_uncommitted = value.clone();
        state.uncommitted_by_tx.insert(tx.clone(), value);
    }

    /// Drop `tx`'s overlay entry
    pub fn clear_uncommitted(&self, tx: &TransactionId) {
        self.state.lock().uncommitted_by_tx.remove(tx);
    }

    /// Serializable copy of the row's fields
    pub fn view(&self) -> RowView {
        let state = self.state.lock();
        RowView {
            key: self.key.clone(),
            committed: state.committed.clone(),
            latest_uncommitted: state.latest_uncommitted.clone(),
            uncommitted_by_tx: state
                .uncommitted_by_tx
                .iter()
                .map(|(tx, value)| (tx.clone(), value.clone()))
                .collect(),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RowState> {
        self.state.lock()
    }
}

/// Point-in-time projection of a [`Row`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowView {
    /// Row key
    pub key: Key,
    /// Last committed value
    pub committed: Value,
    /// Most recent write by anyone
    pub latest_uncommitted: Value,
    /// Uncommitted writes per transaction, ordered by transaction id
    pub uncommitted_by_tx: BTreeMap<TransactionId, Value>,
}

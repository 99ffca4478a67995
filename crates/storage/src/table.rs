//! The shared table: rows plus per-transaction snapshots
//!
//! # Design
//!
//! - DashMap: sharded map of `Key -> Arc<Row>`, no table-wide lock for
//!   ordinary reads and writes
//! - Snapshot registry: `TransactionId -> Snapshot` behind its own mutex,
//!   held only around registry access
//! - FxHashMap: fast non-crypto hash for snapshot contents
//!
//! Snapshots are lazy. Opening one records nothing; the pre-commit value of
//! a key is stashed into every open snapshot the first time some other
//! transaction commits that key (copy on first divergence). A transaction
//! reading through its snapshot therefore sees the captured value when one
//! exists and the live committed value otherwise.
//!
//! Every commit walks the registry, so a commit costs O(open snapshots).
//!
//! # Lock order
//!
//! Row field mutex first, snapshot registry second. Callers must clone the
//! `Arc<Row>` out of the map before blocking on a row's transactional lock;
//! no map guard is ever held across blocking acquisition.

use crate::row::{Row, RowView};
use dashmap::DashMap;
use isolab_core::{Key, LockLevel, TransactionId, Value};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Lazily populated point-in-time view for one transaction
pub type Snapshot = FxHashMap<Key, Value>;

/// Single-table row store shared by all transactions
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - row lookup: sharded read via DashMap
/// - row creation: only locks the target shard
/// - commit application: row mutex, then registry mutex
///
/// # Example
///
/// ```ignore
/// use isolab_storage::Table;
/// use std::sync::Arc;
///
/// let table = Arc::new(Table::new());
/// table.put_committed("x", "1");
/// ```
pub struct Table {
    rows: DashMap<Key, Arc<Row>>,
    snapshots: Mutex<HashMap<TransactionId, Snapshot>>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Create with expected number of rows
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: DashMap::with_capacity(rows),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Seed a committed value outside any transaction
    ///
    /// Creates the row if needed; an existing row gets its committed and
    /// latest values replaced. Meant for loading initial data.
    pub fn put_committed(&self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let row = self.row_or_insert(&key);
        let mut state = row.state();
        state.committed = value.clone();
        state.latest_uncommitted = value;
    }

    /// Row for `key`, if it exists
    #[inline]
    pub fn row(&self, key: &Key) -> Option<Arc<Row>> {
        self.rows.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Row for `key`, created with an empty committed value if missing
    pub fn row_or_insert(&self, key: &Key) -> Arc<Row> {
        let entry = self.rows.entry(key.clone()).or_insert_with(|| {
            trace!(key = %key, "creating row");
            Arc::new(Row::new(key.clone(), Value::empty()))
        });
        Arc::clone(entry.value())
    }

    /// Whether a row exists for `key`
    pub fn contains(&self, key: &Key) -> bool {
        self.rows.contains_key(key)
    }

    // ========================================================================
    // Committed values
    // ========================================================================

    /// Committed value of `key` as seen by `tx`
    ///
    /// The value captured in `tx`'s snapshot wins; otherwise the live
    /// committed value. `None` when the key has no row.
    pub fn get_committed(&self, key: &Key, tx: &TransactionId) -> Option<Value> {
        let row = self.row(key)?;
        let state = row.state();
        let snapshots = self.snapshots.lock();
        let captured = snapshots
            .get(tx)
            .and_then(|snapshot| snapshot.get(key))
            .cloned();
        Some(captured.unwrap_or_else(|| state.committed.clone()))
    }

    /// Apply a committed write by `tx`
    ///
    /// Every other open snapshot that has not yet captured `key` receives the
    /// pre-commit value. The row's committed and latest values become `value`
    /// and `tx`'s overlay entry is cleared.
    ///
    /// # Panics
    ///
    /// Panics if no row exists for `key`. Transactions only commit keys they
    /// wrote, and writing creates the row.
    pub fn set_committed(&self, key: &Key, value: Value, tx: &TransactionId) {
        let row = match self.row(key) {
            Some(row) => row,
            None => panic!("commit by {tx} targets missing row {key}"),
        };

        let mut state = row.state();
        {
            let mut snapshots = self.snapshots.lock();
            for (owner, snapshot) in snapshots.iter_mut() {
                if owner != tx && !snapshot.contains_key(key) {
                    snapshot.insert(key.clone(), state.committed.clone());
                }
            }
        }

        trace!(tx = %tx, key = %key, value = %value, "set committed");
        state.committed = value.clone();
        state.latest_uncommitted = value;
        state.uncommitted_by_tx.remove(tx);
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Open an empty snapshot for `tx` unless one is already open
    pub fn ensure_snapshot_taken(&self, tx: &TransactionId) {
        let mut snapshots = self.snapshots.lock();
        if !snapshots.contains_key(tx) {
            debug!(tx = %tx, "snapshot opened");
            snapshots.insert(tx.clone(), Snapshot::default());
        }
    }

    /// Discard `tx`'s snapshot; no-op when none is open
    pub fn delete_snapshot(&self, tx: &TransactionId) {
        if self.snapshots.lock().remove(tx).is_some() {
            debug!(tx = %tx, "snapshot closed");
        }
    }

    /// Drop `key` from `tx`'s snapshot so reads fall through to the live
    /// committed value
    ///
    /// For a transaction that now holds `key`'s lock: nobody can commit the
    /// key until it is released, so the live value stays put. No-op when
    /// `tx` has no snapshot or it never captured `key`.
    pub fn forget_snapshot_entry(&self, tx: &TransactionId, key: &Key) {
        let mut snapshots = self.snapshots.lock();
        let forgotten = snapshots
            .get_mut(tx)
            .and_then(|snapshot| snapshot.remove(key))
            .is_some();
        if forgotten {
            trace!(tx = %tx, key = %key, "snapshot entry forgotten");
        }
    }

    /// Whether `tx` has an open snapshot
    pub fn has_snapshot(&self, tx: &TransactionId) -> bool {
        self.snapshots.lock().contains_key(tx)
    }

    /// Values captured so far in `tx`'s snapshot, ordered by key
    pub fn snapshot(&self, tx: &TransactionId) -> Option<BTreeMap<Key, Value>> {
        self.snapshots.lock().get(tx).map(|snapshot| {
            snapshot
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// Number of open snapshots
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Projection of one row
    pub fn row_view(&self, key: &Key) -> Option<RowView> {
        self.row(key).map(|row| row.view())
    }

    /// Projections of all rows, sorted by key
    pub fn rows(&self) -> Vec<RowView> {
        let rows: Vec<Arc<Row>> = self
            .rows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut views: Vec<RowView> = rows.iter().map(|row| row.view()).collect();
        views.sort_by(|a, b| a.key.cmp(&b.key));
        views
    }

    /// Whether `tx` would wait to take exclusive access to `key`
    ///
    /// A key without a row never blocks.
    pub fn is_blocked(&self, key: &Key, tx: &TransactionId) -> bool {
        self.row(key)
            .map(|row| row.lock().is_blocked(tx))
            .unwrap_or(false)
    }

    /// Whether `tx` would wait to take `level` on `key`
    pub fn would_block(&self, key: &Key, level: LockLevel, tx: &TransactionId) -> bool {
        self.row(key)
            .map(|row| row.lock().would_block(level, tx))
            .unwrap_or(false)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.len())
            .field("snapshots", &self.snapshot_count())
            .finish()
    }
}

//! State and mechanics shared by every isolation strategy
//!
//! The four strategies differ in three places only: where reads come from,
//! how long locks are held, and when the snapshot opens. Everything else
//! (undo log, overlay maintenance, commit application, rollback, terminal
//! state handling) lives here.

use isolab_core::{
    Error, IsolationLevel, Key, LockLevel, Operation, Result, TransactionId, TransactionState,
    Value,
};
use isolab_storage::{Row, Table};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::locks::TransactionLocks;

/// How long a strategy keeps the locks its reads and writes take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockDuration {
    /// Acquire and release right away; a visibility fence only
    Momentary,
    /// Keep until commit or rollback
    Held,
}

impl LockDuration {
    fn for_level(level: IsolationLevel) -> Self {
        if level.holds_locks() {
            LockDuration::Held
        } else {
            LockDuration::Momentary
        }
    }
}

#[derive(Debug)]
pub(crate) struct TransactionContext {
    pub(crate) id: TransactionId,
    pub(crate) level: IsolationLevel,
    pub(crate) table: Arc<Table>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) locks: TransactionLocks,
    pub(crate) keys_touched: BTreeSet<Key>,
    pub(crate) state: TransactionState,
    duration: LockDuration,
}

impl TransactionContext {
    pub(crate) fn new(id: TransactionId, level: IsolationLevel, table: Arc<Table>) -> Self {
        debug!(tx = %id, level = %level, "transaction started");
        Self {
            locks: TransactionLocks::new(id.clone()),
            duration: LockDuration::for_level(level),
            id,
            level,
            table,
            operations: Vec::new(),
            keys_touched: BTreeSet::new(),
            state: TransactionState::Active,
        }
    }

    /// Reject calls on a finished transaction
    pub(crate) fn ensure_active(&self, op: &'static str) -> Result<()> {
        if self.state.is_active() {
            return Ok(());
        }
        warn!(tx = %self.id, state = %self.state, op, "operation on finished transaction");
        Err(Error::TransactionClosed {
            id: self.id.clone(),
            state: self.state,
        })
    }

    /// Take `level` on `row` for the strategy's lock duration
    pub(crate) fn acquire(&mut self, level: LockLevel, row: &Row) {
        let acquired = self.locks.lock(level, row);
        if !acquired {
            return;
        }
        match self.duration {
            LockDuration::Momentary => {
                self.locks.unlock(row.key());
            }
            LockDuration::Held => self.refresh_snapshot_entry(row),
        }
    }

    /// Take exclusive access on `row` until the transaction ends
    pub(crate) fn hold_exclusive(&mut self, row: &Row) {
        let acquired = self.locks.lock(LockLevel::ReadWrite, row);
        if acquired && self.duration == LockDuration::Held {
            self.refresh_snapshot_entry(row);
        }
    }

    /// A held lock was just granted: whatever the snapshot captured for the
    /// row predates the previous holder's commit, so read live from now on
    fn refresh_snapshot_entry(&self, row: &Row) {
        self.table.forget_snapshot_entry(&self.id, row.key());
    }

    /// Own uncommitted write, else committed as seen through the snapshot
    pub(crate) fn read_own_or_committed(&self, row: &Row) -> Value {
        if let Some(own) = row.uncommitted_for(&self.id) {
            return own;
        }
        self.table
            .get_committed(row.key(), &self.id)
            .unwrap_or_else(Value::empty)
    }

    /// Value a finished transaction observes: the live committed value
    pub(crate) fn read_after_end(&self, key: &Key) -> Value {
        self.table
            .row(key)
            .map(|row| row.committed())
            .unwrap_or_else(Value::empty)
    }

    /// Row for a read of `key`, shared-locked for the strategy's duration
    ///
    /// `None` when the key has no row; nothing is locked or recorded then.
    pub(crate) fn read_row(&mut self, key: Key) -> Option<Arc<Row>> {
        let row = self.table.row(&key)?;
        self.acquire(LockLevel::Read, &row);
        self.keys_touched.insert(key);
        Some(row)
    }

    pub(crate) fn set(&mut self, key: Key, value: Value) {
        let row = self.table.row_or_insert(&key);
        self.write(&row, value);
    }

    pub(crate) fn delete(&mut self, key: Key) {
        if let Some(row) = self.table.row(&key) {
            self.write(&row, Value::empty());
        }
    }

    pub(crate) fn lock(&mut self, key: Key) {
        if let Some(row) = self.table.row(&key) {
            self.hold_exclusive(&row);
        }
    }

    /// Log and apply an uncommitted write of `value` to `row`
    ///
    /// The undo value is read once the lock is granted, after any commit
    /// the write had to wait for.
    pub(crate) fn write(&mut self, row: &Row, value: Value) {
        self.acquire(LockLevel::ReadWrite, row);
        let previous = row.previous_for(&self.id);
        self.operations
            .push(Operation::new(row.key().clone(), previous, value.clone()));
        self.keys_touched.insert(row.key().clone());
        row.write_uncommitted(&self.id, value);
    }

    /// Apply the undo log to the table and end the transaction
    pub(crate) fn commit(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let operations = std::mem::take(&mut self.operations);
        for op in &operations {
            if self.duration == LockDuration::Momentary {
                if let Some(row) = self.table.row(&op.key) {
                    self.acquire(LockLevel::ReadWrite, &row);
                }
            }
            self.table
                .set_committed(&op.key, op.to_value.clone(), &self.id);
        }

        self.finish(TransactionState::Committed);
        debug!(tx = %self.id, writes = operations.len(), "transaction committed");
    }

    /// Undo every write in reverse order and end the transaction
    pub(crate) fn rollback(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let operations = std::mem::take(&mut self.operations);
        let mut rows = Vec::new();
        for op in operations.iter().rev() {
            if let Some(row) = self.table.row(&op.key) {
                row.write_uncommitted(&self.id, op.from_value.clone());
                rows.push(row);
            }
        }
        for row in &rows {
            row.clear_uncommitted(&self.id);
        }

        self.finish(TransactionState::Aborted);
        debug!(tx = %self.id, undone = operations.len(), "transaction rolled back");
    }

    fn finish(&mut self, state: TransactionState) {
        self.locks.unlock_all();
        self.table.delete_snapshot(&self.id);
        self.keys_touched.clear();
        self.state = state;
    }

    pub(crate) fn keys_written_to(&self) -> Vec<Key> {
        let keys: BTreeSet<&Key> = self.operations.iter().map(|op| &op.key).collect();
        keys.into_iter().cloned().collect()
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        if self.state.is_active() {
            debug!(tx = %self.id, "dropping active transaction");
            self.rollback();
        }
    }
}

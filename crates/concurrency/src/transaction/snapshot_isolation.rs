//! Snapshot Isolation
//!
//! A snapshot opens when the transaction starts. Reads see the
//! transaction's own writes, otherwise the committed value as of that
//! moment. Writes to disjoint keys never conflict, which is what lets write
//! skew through.

use super::context::TransactionContext;
use super::{context_accessors, Transaction};
use isolab_core::{IsolationLevel, Key, Result, TransactionId, Value};
use isolab_storage::Table;
use std::sync::Arc;

/// Transaction reading from a point-in-time snapshot
#[derive(Debug)]
pub struct SnapshotIsolation {
    ctx: TransactionContext,
}

impl SnapshotIsolation {
    /// Start a transaction over `table` and open its snapshot
    pub fn new(id: TransactionId, table: Arc<Table>) -> Self {
        table.ensure_snapshot_taken(&id);
        Self {
            ctx: TransactionContext::new(id, IsolationLevel::SnapshotIsolation, table),
        }
    }
}

impl Transaction for SnapshotIsolation {
    fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<&mut Self> {
        self.ctx.ensure_active("set")?;
        self.ctx.set(key.into(), value.into());
        Ok(self)
    }

    fn get(&mut self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        if !self.ctx.state.is_active() {
            return Ok(self.ctx.read_after_end(&key));
        }
        Ok(match self.ctx.read_row(key) {
            Some(row) => self.ctx.read_own_or_committed(&row),
            None => Value::empty(),
        })
    }

    fn delete(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        self.ctx.ensure_active("delete")?;
        self.ctx.delete(key.into());
        Ok(self)
    }

    fn lock(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        self.ctx.ensure_active("lock")?;
        self.ctx.lock(key.into());
        Ok(self)
    }

    context_accessors!();
}

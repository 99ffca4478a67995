//! Strict Two-Phase Locking
//!
//! Every read takes a shared lock and every write an exclusive one, and
//! nothing is released before commit or rollback. Reads go through a
//! snapshot opened by the first operation, once that operation holds its
//! lock, so a transaction that had to wait starts from the state its
//! predecessor committed. Each later lock granted on another key drops that
//! key from the snapshot, so the read sees whatever was committed before the
//! lock was granted. Conflicting transactions wait for each other;
//! two that wait in a cycle deadlock, and nothing here detects that.

use super::context::TransactionContext;
use super::{context_accessors, Transaction};
use isolab_core::{IsolationLevel, Key, Result, TransactionId, Value};
use isolab_storage::Table;
use std::sync::Arc;

/// Transaction holding its locks until it ends
#[derive(Debug)]
pub struct TwoPhaseLocking {
    ctx: TransactionContext,
}

impl TwoPhaseLocking {
    /// Start a transaction over `table`; the snapshot opens lazily
    pub fn new(id: TransactionId, table: Arc<Table>) -> Self {
        Self {
            ctx: TransactionContext::new(id, IsolationLevel::TwoPhaseLocking, table),
        }
    }

    fn open_snapshot(&self) {
        self.ctx.table.ensure_snapshot_taken(&self.ctx.id);
    }
}

impl Transaction for TwoPhaseLocking {
    fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<&mut Self> {
        self.ctx.ensure_active("set")?;
        self.ctx.set(key.into(), value.into());
        self.open_snapshot();
        Ok(self)
    }

    fn get(&mut self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        if !self.ctx.state.is_active() {
            return Ok(self.ctx.read_after_end(&key));
        }
        let row = self.ctx.read_row(key);
        self.open_snapshot();
        Ok(match row {
            Some(row) => self.ctx.read_own_or_committed(&row),
            None => Value::empty(),
        })
    }

    fn delete(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        self.ctx.ensure_active("delete")?;
        self.ctx.delete(key.into());
        self.open_snapshot();
        Ok(self)
    }

    fn lock(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        self.ctx.ensure_active("lock")?;
        self.ctx.lock(key.into());
        self.open_snapshot();
        Ok(self)
    }

    context_accessors!();
}

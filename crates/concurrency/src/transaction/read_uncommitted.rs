//! Read Uncommitted
//!
//! Reads return the most recent write to a row by anyone, committed or not.
//! Locks are momentary, so concurrent writers interleave freely: both dirty
//! reads and dirty writes are possible.

use super::context::TransactionContext;
use super::{context_accessors, Transaction};
use isolab_core::{IsolationLevel, Key, Result, TransactionId, Value};
use isolab_storage::Table;
use std::sync::Arc;

/// Transaction that sees uncommitted writes
#[derive(Debug)]
pub struct ReadUncommitted {
    ctx: TransactionContext,
}

impl ReadUncommitted {
    /// Start a transaction over `table`
    pub fn new(id: TransactionId, table: Arc<Table>) -> Self {
        Self {
            ctx: TransactionContext::new(id, IsolationLevel::ReadUncommitted, table),
        }
    }
}

impl Transaction for ReadUncommitted {
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
        Ok(self
            .ctx
            .read_row(key)
            .map(|row| row.latest_uncommitted())
            .unwrap_or_else(Value::empty))
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

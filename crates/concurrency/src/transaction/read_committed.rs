//! Read Committed
//!
//! Reads see the transaction's own writes, otherwise the last committed
//! value at the time of the read. Two reads of the same key may disagree if
//! another transaction commits in between.

use super::context::TransactionContext;
use super::{context_accessors, Transaction};
use isolab_core::{IsolationLevel, Key, Result, TransactionId, Value};
use isolab_storage::Table;
use std::sync::Arc;

/// Transaction that never sees uncommitted writes of others
#[derive(Debug)]
pub struct ReadCommitted {
    ctx: TransactionContext,
}

impl ReadCommitted {
    /// Start a transaction over `table`
    pub fn new(id: TransactionId, table: Arc<Table>) -> Self {
        Self {
            ctx: TransactionContext::new(id, IsolationLevel::ReadCommitted, table),
        }
    }
}

impl Transaction for ReadCommitted {
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

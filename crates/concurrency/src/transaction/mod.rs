//! Transactions under the four isolation strategies
//!
//! Every strategy implements [`Transaction`]. The set of strategies is
//! closed, so code that picks one at runtime uses [`AnyTransaction`] rather
//! than a trait object.
//!
//! # Example
//!
//! ```ignore
//! use isolab_concurrency::{transaction_for_level, Transaction};
//! use isolab_storage::Table;
//! use std::sync::Arc;
//!
//! let table = Arc::new(Table::new());
//! let mut t1 = transaction_for_level("read-committed", "t1", Arc::clone(&table))?;
//! t1.set("x", "1")?.commit();
//! ```

mod context;
mod read_committed;
mod read_uncommitted;
mod snapshot_isolation;
mod two_phase_locking;

pub use read_committed::ReadCommitted;
pub use read_uncommitted::ReadUncommitted;
pub use snapshot_isolation::SnapshotIsolation;
pub use two_phase_locking::TwoPhaseLocking;

use crate::locks::TransactionLocks;
use isolab_core::{
    IsolationLevel, Key, Operation, Result, TransactionId, TransactionState, Value,
};
use isolab_storage::Table;
use std::sync::Arc;

/// Operations common to every isolation strategy
///
/// Mutating calls return `&mut Self` so they chain:
/// `tx.set("x", "1")?.set("y", "2")?.commit();`
///
/// Once committed or rolled back, `set`, `delete` and `lock` fail with
/// [`Error::TransactionClosed`](isolab_core::Error::TransactionClosed),
/// `commit` and `rollback` do nothing, and `get` returns the latest
/// committed value without locking.
pub trait Transaction {
    /// Write `value` to `key`, creating the row if needed
    fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<&mut Self>;

    /// Read `key`; the empty value when it has no row
    fn get(&mut self, key: impl Into<Key>) -> Result<Value>;

    /// Overwrite `key` with the empty value; no-op when it has no row
    fn delete(&mut self, key: impl Into<Key>) -> Result<&mut Self>;

    /// Hold exclusive access to `key` until commit or rollback
    fn lock(&mut self, key: impl Into<Key>) -> Result<&mut Self>;

    /// Make every write visible and release all locks
    fn commit(&mut self) -> &mut Self;

    /// Undo every write and release all locks
    fn rollback(&mut self) -> &mut Self;

    /// Transaction id
    fn id(&self) -> &TransactionId;

    /// Strategy in use
    fn isolation_level(&self) -> IsolationLevel;

    /// Lifecycle state
    fn state(&self) -> TransactionState;

    /// Undo log, oldest first
    fn operations(&self) -> &[Operation];

    /// Locks currently held
    fn locks(&self) -> &TransactionLocks;

    /// Keys read or written so far, sorted
    fn keys_touched(&self) -> Vec<Key>;

    /// Keys written so far, sorted
    fn keys_written_to(&self) -> Vec<Key>;
}

/// Implements the accessor half of [`Transaction`] against a `ctx` field.
macro_rules! context_accessors {
    () => {
        fn id(&self) -> &isolab_core::TransactionId {
            &self.ctx.id
        }

        fn isolation_level(&self) -> isolab_core::IsolationLevel {
            self.ctx.level
        }

        fn state(&self) -> isolab_core::TransactionState {
            self.ctx.state
        }

        fn operations(&self) -> &[isolab_core::Operation] {
            &self.ctx.operations
        }

        fn locks(&self) -> &crate::locks::TransactionLocks {
            &self.ctx.locks
        }

        fn keys_touched(&self) -> Vec<isolab_core::Key> {
            self.ctx.keys_touched.iter().cloned().collect()
        }

        fn keys_written_to(&self) -> Vec<isolab_core::Key> {
            self.ctx.keys_written_to()
        }

        fn commit(&mut self) -> &mut Self {
            self.ctx.commit();
            self
        }

        fn rollback(&mut self) -> &mut Self {
            self.ctx.rollback();
            self
        }
    };
}
pub(crate) use context_accessors;

/// A transaction under a strategy chosen at runtime
#[derive(Debug)]
pub enum AnyTransaction {
    /// See [`ReadUncommitted`]
    ReadUncommitted(ReadUncommitted),
    /// See [`ReadCommitted`]
    ReadCommitted(ReadCommitted),
    /// See [`SnapshotIsolation`]
    SnapshotIsolation(SnapshotIsolation),
    /// See [`TwoPhaseLocking`]
    TwoPhaseLocking(TwoPhaseLocking),
}

macro_rules! dispatch {
    ($self:expr, $tx:ident => $body:expr) => {
        match $self {
            AnyTransaction::ReadUncommitted($tx) => $body,
            AnyTransaction::ReadCommitted($tx) => $body,
            AnyTransaction::SnapshotIsolation($tx) => $body,
            AnyTransaction::TwoPhaseLocking($tx) => $body,
        }
    };
}

impl AnyTransaction {
    /// Start a transaction under `level`
    pub fn begin(level: IsolationLevel, id: impl Into<TransactionId>, table: Arc<Table>) -> Self {
        let id = id.into();
        match level {
            IsolationLevel::ReadUncommitted => {
                AnyTransaction::ReadUncommitted(ReadUncommitted::new(id, table))
            }
            IsolationLevel::ReadCommitted => {
                AnyTransaction::ReadCommitted(ReadCommitted::new(id, table))
            }
            IsolationLevel::SnapshotIsolation => {
                AnyTransaction::SnapshotIsolation(SnapshotIsolation::new(id, table))
            }
            IsolationLevel::TwoPhaseLocking => {
                AnyTransaction::TwoPhaseLocking(TwoPhaseLocking::new(id, table))
            }
        }
    }
}

impl Transaction for AnyTransaction {
    fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<&mut Self> {
        dispatch!(self, tx => { tx.set(key, value)?; });
        Ok(self)
    }

    fn get(&mut self, key: impl Into<Key>) -> Result<Value> {
        dispatch!(self, tx => tx.get(key))
    }

    fn delete(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        dispatch!(self, tx => { tx.delete(key)?; });
        Ok(self)
    }

    fn lock(&mut self, key: impl Into<Key>) -> Result<&mut Self> {
        dispatch!(self, tx => { tx.lock(key)?; });
        Ok(self)
    }

    fn commit(&mut self) -> &mut Self {
        dispatch!(self, tx => { tx.commit(); });
        self
    }

    fn rollback(&mut self) -> &mut Self {
        dispatch!(self, tx => { tx.rollback(); });
        self
    }

    fn id(&self) -> &TransactionId {
        dispatch!(self, tx => tx.id())
    }

    fn isolation_level(&self) -> IsolationLevel {
        dispatch!(self, tx => tx.isolation_level())
    }

    fn state(&self) -> TransactionState {
        dispatch!(self, tx => tx.state())
    }

    fn operations(&self) -> &[Operation] {
        dispatch!(self, tx => tx.operations())
    }

    fn locks(&self) -> &TransactionLocks {
        dispatch!(self, tx => tx.locks())
    }

    fn keys_touched(&self) -> Vec<Key> {
        dispatch!(self, tx => tx.keys_touched())
    }

    fn keys_written_to(&self) -> Vec<Key> {
        dispatch!(self, tx => tx.keys_written_to())
    }
}

/// Start a transaction for a level given by name
///
/// Accepts the names [`IsolationLevel`]'s `FromStr` accepts; anything else
/// fails with `UnknownIsolationLevel`.
pub fn transaction_for_level(
    level: &str,
    id: impl Into<TransactionId>,
    table: Arc<Table>,
) -> Result<AnyTransaction> {
    let level: IsolationLevel = level.parse()?;
    Ok(AnyTransaction::begin(level, id, table))
}

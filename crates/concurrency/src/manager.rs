//! Transaction manager
//!
//! Hands out transactions bound to one shared table and allocates their ids.
//! Generated ids are `t1`, `t2`, ... in allocation order; callers that need
//! specific names (scripts, demonstrations) pass their own. Ids that must not
//! collide across managers come from [`TransactionManager::begin_unique`].

use crate::transaction::AnyTransaction;
use isolab_core::{IsolationLevel, TransactionId};
use isolab_storage::Table;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Starts transactions against a shared [`Table`]
///
/// # Thread Safety
///
/// Id allocation is a single atomic increment; the manager can be shared
/// behind an `Arc` and used from any thread.
#[derive(Debug)]
pub struct TransactionManager {
    table: Arc<Table>,
    default_level: IsolationLevel,
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    /// Create a manager over `table`
    ///
    /// # Arguments
    /// * `table` - Table every transaction operates on
    /// * `default_level` - Level used by [`begin`](Self::begin)
    pub fn new(table: Arc<Table>, default_level: IsolationLevel) -> Self {
        Self {
            table,
            default_level,
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Shared table
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Level used by [`begin`](Self::begin)
    pub fn default_level(&self) -> IsolationLevel {
        self.default_level
    }

    /// Allocate the next generated transaction id
    pub fn next_txn_id(&self) -> TransactionId {
        let n = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        TransactionId::new(format!("t{n}"))
    }

    /// Number of ids allocated or reserved so far
    ///
    /// A named `t{n}` reserves every generated id up to `n`.
    pub fn allocated(&self) -> u64 {
        self.next_txn_id.load(Ordering::SeqCst) - 1
    }

    /// Start a transaction at the default level
    pub fn begin(&self) -> AnyTransaction {
        self.begin_with(self.default_level)
    }

    /// Start a transaction at `level` with a generated id
    pub fn begin_with(&self, level: IsolationLevel) -> AnyTransaction {
        let id = self.next_txn_id();
        self.begin_named(level, id)
    }

    /// Start a transaction at `level` with a random UUID id
    ///
    /// Does not consume a sequential id.
    pub fn begin_unique(&self, level: IsolationLevel) -> AnyTransaction {
        self.begin_named(level, TransactionId::generate())
    }

    /// Start a transaction at `level` with a caller-chosen id
    ///
    /// An id of the generated form `t{n}` pushes the sequence past `n`, so
    /// later generated ids never repeat it. Naming a transaction after an id
    /// that was already generated is the caller's problem.
    pub fn begin_named(&self, level: IsolationLevel, id: impl Into<TransactionId>) -> AnyTransaction {
        let id = id.into();
        self.reserve(&id);
        AnyTransaction::begin(level, id, Arc::clone(&self.table))
    }

    fn reserve(&self, id: &TransactionId) {
        let Some(digits) = id.as_str().strip_prefix('t') else {
            return;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return;
        }
        if let Ok(n) = digits.parse::<u64>() {
            self.next_txn_id.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
    }
}

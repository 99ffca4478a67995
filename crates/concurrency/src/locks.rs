//! Per-transaction lock inventory
//!
//! Each transaction privately owns a [`TransactionLocks`]. It maps every key
//! the transaction currently holds to the guard it holds it with, so
//! releasing a lock is dropping its guard.

use isolab_core::{Key, LockLevel, TransactionId};
use isolab_storage::{Row, TrackedReadGuard, TrackedWriteGuard};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug)]
enum HeldLock {
    Read(TrackedReadGuard),
    ReadWrite(TrackedWriteGuard),
}

impl HeldLock {
    fn level(&self) -> LockLevel {
        match self {
            HeldLock::Read(_) => LockLevel::Read,
            HeldLock::ReadWrite(_) => LockLevel::ReadWrite,
        }
    }
}

/// Locks currently held by one transaction
#[derive(Debug)]
pub struct TransactionLocks {
    owner: TransactionId,
    held: FxHashMap<Key, HeldLock>,
}

impl TransactionLocks {
    /// Empty inventory for `owner`
    pub fn new(owner: TransactionId) -> Self {
        Self {
            owner,
            held: FxHashMap::default(),
        }
    }

    /// Acquire `level` on `row`, blocking as needed
    ///
    /// Returns `true` iff this call acquired something. A lock already held
    /// at `level` or above is left alone. Upgrading from `Read` releases the
    /// shared lock before waiting for exclusive access, so another writer
    /// may slip in between.
    pub fn lock(&mut self, level: LockLevel, row: &Row) -> bool {
        let key = row.key();
        let current = self.level(key);
        if level == LockLevel::None || current >= level {
            return false;
        }

        let held = match level {
            LockLevel::Read => HeldLock::Read(row.lock().read()),
            _ => {
                if current == LockLevel::Read {
                    trace!(tx = %self.owner, key = %key, "releasing read lock for upgrade");
                    self.held.remove(key);
                }
                HeldLock::ReadWrite(row.lock().write_for(&self.owner))
            }
        };

        trace!(tx = %self.owner, key = %key, level = %level, "lock acquired");
        self.held.insert(key.clone(), held);
        true
    }

    /// Release the lock on `key`; returns whether one was held
    pub fn unlock(&mut self, key: &Key) -> bool {
        match self.held.remove(key) {
            Some(held) => {
                trace!(tx = %self.owner, key = %key, level = %held.level(), "lock released");
                true
            }
            None => false,
        }
    }

    /// Release every lock, shared ones first
    pub fn unlock_all(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let readers: Vec<Key> = self
            .held
            .iter()
            .filter(|(_, held)| held.level() == LockLevel::Read)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &readers {
            self.held.remove(key);
        }
        trace!(tx = %self.owner, count = self.held.len() + readers.len(), "all locks released");
        self.held.clear();
    }

    /// Level currently held on `key`
    pub fn level(&self, key: &Key) -> LockLevel {
        self.held
            .get(key)
            .map(HeldLock::level)
            .unwrap_or(LockLevel::None)
    }

    /// Whether any lock is held on `key`
    pub fn contains(&self, key: &Key) -> bool {
        self.held.contains_key(key)
    }

    /// Every held key with its level, ordered by key
    pub fn lock_levels(&self) -> BTreeMap<Key, LockLevel> {
        self.held
            .iter()
            .map(|(key, held)| (key.clone(), held.level()))
            .collect()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Whether nothing is held
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

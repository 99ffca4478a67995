//! Reader/writer lock with introspectable state
//!
//! A plain `RwLock` cannot tell an observer whether acquiring it would block
//! or who holds it. [`TrackableRwLock`] keeps a side-channel (reader count and
//! writer identity) behind its own small mutex so that contention can be
//! queried without touching the real lock.
//!
//! Acquisition hands out owned guards ([`TrackedReadGuard`],
//! [`TrackedWriteGuard`]) that can be stored in a transaction's lock table
//! and released by dropping them. A guard clears its side-channel entry
//! before it releases the underlying lock, so the side-channel never
//! reports a free lock that is still held.

use isolab_core::{LockLevel, TransactionId};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock, RwLock};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: Option<TransactionId>,
}

/// Shared/exclusive lock whose holders can be inspected
pub struct TrackableRwLock {
    raw: Arc<RwLock<()>>,
    state: Arc<Mutex<LockState>>,
}

impl TrackableRwLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self {
            raw: Arc::new(RwLock::new(())),
            state: Arc::new(Mutex::new(LockState::default())),
        }
    }

    /// Acquire shared access, blocking while a writer holds the lock
    pub fn read(&self) -> TrackedReadGuard {
        let guard = self.raw.read_arc();
        self.state.lock().readers += 1;
        TrackedReadGuard {
            state: Arc::clone(&self.state),
            _guard: guard,
        }
    }

    /// Acquire exclusive access on behalf of `tx`, blocking while anyone
    /// else holds the lock
    pub fn write_for(&self, tx: &TransactionId) -> TrackedWriteGuard {
        let guard = self.raw.write_arc();
        self.state.lock().writer = Some(tx.clone());
        TrackedWriteGuard {
            state: Arc::clone(&self.state),
            _guard: guard,
        }
    }

    /// Whether `requester` would have to wait for this lock
    ///
    /// True iff at least one reader is active, or a writer other than
    /// `requester` is active. An active reader counts even when it is the
    /// requester itself: upgrading to exclusive has to wait for it too.
    pub fn is_blocked(&self, requester: &TransactionId) -> bool {
        let state = self.state.lock();
        if state.readers > 0 {
            return true;
        }
        match &state.writer {
            Some(owner) => owner != requester,
            None => false,
        }
    }

    /// Whether `requester` would have to wait to take `level`
    ///
    /// Shared access waits only for a foreign writer; exclusive access
    /// follows [`is_blocked`](Self::is_blocked).
    pub fn would_block(&self, level: LockLevel, requester: &TransactionId) -> bool {
        match level {
            LockLevel::None => false,
            LockLevel::Read => {
                let state = self.state.lock();
                matches!(&state.writer, Some(owner) if owner != requester)
            }
            LockLevel::ReadWrite => self.is_blocked(requester),
        }
    }

    /// Number of active readers
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Transaction holding exclusive access, if any
    pub fn writer(&self) -> Option<TransactionId> {
        self.state.lock().writer.clone()
    }

    /// Whether nobody holds the lock
    pub fn is_free(&self) -> bool {
        let state = self.state.lock();
        state.readers == 0 && state.writer.is_none()
    }
}

impl Default for TrackableRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrackableRwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TrackableRwLock")
            .field("readers", &state.readers)
            .field("writer", &state.writer)
            .finish()
    }
}

/// Owned shared access to a [`TrackableRwLock`]; released on drop
pub struct TrackedReadGuard {
    state: Arc<Mutex<LockState>>,
    _guard: ArcRwLockReadGuard<RawRwLock, ()>,
}

impl Drop for TrackedReadGuard {
    fn drop(&mut self) {
        // The side-channel is updated first; `_guard` unlocks afterwards.
        let mut state = self.state.lock();
        state.readers = state.readers.saturating_sub(1);
    }
}

impl fmt::Debug for TrackedReadGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackedReadGuard")
    }
}

/// Owned exclusive access to a [`TrackableRwLock`]; released on drop
pub struct TrackedWriteGuard {
    state: Arc<Mutex<LockState>>,
    _guard: ArcRwLockWriteGuard<RawRwLock, ()>,
}

impl Drop for TrackedWriteGuard {
    fn drop(&mut self) {
        self.state.lock().writer = None;
    }
}

impl fmt::Debug for TrackedWriteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackedWriteGuard")
    }
}

//! Error types shared by every isolab crate
//!
//! Only domain-sized failures are errors. Absent data is the
//! [`Value::empty`](crate::Value::empty) sentinel, lock bookkeeping
//! inconsistencies are membership-checked no-ops, and broken internal
//! invariants panic.

use crate::types::{TransactionId, TransactionState};
use thiserror::Error;

/// All isolab errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Transaction construction with a level name that is not one of the four
    #[error("unknown isolation level: {0}")]
    UnknownIsolationLevel(String),

    /// Operation issued after commit or rollback
    #[error("transaction {id} is {state}")]
    TransactionClosed {
        /// The transaction that rejected the call
        id: TransactionId,
        /// Its terminal state
        state: TransactionState,
    },

    /// Malformed replay event
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Script decoding failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for isolab operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error rejected an operation on a finished transaction.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::TransactionClosed { .. })
    }

    /// Check if this error is an unrecognized isolation level.
    pub fn is_unknown_level(&self) -> bool {
        matches!(self, Error::UnknownIsolationLevel(_))
    }
}

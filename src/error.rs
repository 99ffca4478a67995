//! Unified error type for isolab.
//!
//! Wraps the errors of the member crates and the script decoding failures
//! of the replay harness behind one enum.

use isolab_core::{TransactionId, TransactionState};
use thiserror::Error;

/// All isolab errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Isolation level name not recognized
    #[error("unknown isolation level: {0}")]
    UnknownIsolationLevel(String),

    /// Operation on a committed or rolled back transaction
    #[error("transaction {id} is {state}")]
    TransactionClosed {
        /// Rejecting transaction
        id: TransactionId,
        /// Its terminal state
        state: TransactionState,
    },

    /// Malformed replay event
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Replay script could not be decoded
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

    /// Check if this error came from a malformed script.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidEvent(_) | Error::Serialization(_))
    }
}

impl From<isolab_core::Error> for Error {
    fn from(e: isolab_core::Error) -> Self {
        use isolab_core::Error as CoreError;
        match e {
            CoreError::UnknownIsolationLevel(name) => Error::UnknownIsolationLevel(name),
            CoreError::TransactionClosed { id, state } => Error::TransactionClosed { id, state },
            CoreError::InvalidEvent(msg) => Error::InvalidEvent(msg),
            CoreError::Serialization(msg) => Error::Serialization(msg),
            CoreError::Io(io_err) => Error::Io(io_err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

//! Core types for isolab
//!
//! Keys, values, transaction identity, isolation and lock levels, the undo
//! log entry and the shared error type. Every other crate in the workspace
//! builds on these.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    IsolationLevel, Key, LockLevel, Operation, TransactionId, TransactionState, Value,
    EMPTY_VALUE,
};

//! # isolab
//!
//! An in-memory, single-table transactional key-value store with four
//! classic concurrency-control strategies, built to show which anomalies
//! each one lets through.
//!
//! ## Quick Start
//!
//! ```ignore
//! use isolab::prelude::*;
//!
//! let engine = Engine::builder().seed("x", "1").build();
//!
//! let mut t1 = engine.begin_with(IsolationLevel::ReadCommitted);
//! let mut t2 = engine.begin_with(IsolationLevel::ReadCommitted);
//!
//! t1.set("x", "2")?;
//! assert_eq!(t2.get("x")?, "1");   // no dirty read
//! t1.commit();
//! assert_eq!(t2.get("x")?, "2");
//! ```
//!
//! ## Strategies
//!
//! | Level | Prevents | Permits |
//! |-------|----------|---------|
//! | [`ReadUncommitted`] | nothing | dirty read, dirty write |
//! | [`ReadCommitted`] | dirty read | read skew, write skew |
//! | [`SnapshotIsolation`] | dirty read, read skew | write skew |
//! | [`TwoPhaseLocking`] | all of the above | nothing, but may deadlock |
//!
//! ## Scripts
//!
//! [`replay`] plays an interleaving of reads, writes and commits with one
//! thread per transaction and records what each step observed.

#![warn(missing_docs)]

mod engine;
mod error;

pub mod prelude;
pub mod replay;

// Re-export main entry points
pub use engine::{Engine, EngineBuilder, EngineOptions};
pub use error::{Error, Result};

// Re-export transactions
pub use isolab_concurrency::{
    transaction_for_level, AnyTransaction, ReadCommitted, ReadUncommitted, SnapshotIsolation,
    Transaction, TransactionLocks, TwoPhaseLocking,
};

// Re-export storage and types
pub use isolab_core::{
    IsolationLevel, Key, LockLevel, Operation, TransactionId, TransactionState, Value,
    EMPTY_VALUE,
};
pub use isolab_storage::{RowView, Table};

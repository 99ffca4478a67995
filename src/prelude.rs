//! Convenient imports for isolab.
//!
//! ```ignore
//! use isolab::prelude::*;
//!
//! let engine = Engine::new();
//! let mut tx = engine.begin();
//! tx.set("key", "value")?.commit();
//! ```

// Main entry point
pub use crate::engine::{Engine, EngineBuilder, EngineOptions};

// Error handling
pub use crate::error::{Error, Result};

// Transactions
pub use isolab_concurrency::{transaction_for_level, AnyTransaction, Transaction};

// Core types
pub use isolab_core::{IsolationLevel, Key, LockLevel, TransactionId, TransactionState, Value};
pub use isolab_storage::{RowView, Table};

// Replay
pub use crate::replay::{play_events, Event, ReplayOptions, ReplayTrace};

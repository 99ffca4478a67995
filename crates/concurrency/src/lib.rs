//! Concurrency layer for isolab
//!
//! This crate implements lock-based and snapshot-based concurrency control:
//! - TransactionLocks: per-transaction lock inventory with upgrade
//! - Transaction: the operation contract shared by every isolation strategy
//! - ReadUncommitted, ReadCommitted, SnapshotIsolation, TwoPhaseLocking
//! - TransactionManager: id allocation and transaction start

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod locks;
pub mod manager;
pub mod transaction;

pub use locks::TransactionLocks;
pub use manager::TransactionManager;
pub use transaction::{
    transaction_for_level, AnyTransaction, ReadCommitted, ReadUncommitted, SnapshotIsolation,
    Transaction, TwoPhaseLocking,
};

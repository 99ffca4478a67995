//! Storage layer for isolab
//!
//! This crate implements the shared row store:
//! - TrackableRwLock: reader/writer lock whose holders can be inspected
//! - Row: committed value, latest uncommitted value and per-transaction overlay
//! - Table: sharded row map plus the per-transaction snapshot registry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod row;
pub mod table;

pub use lock::{TrackableRwLock, TrackedReadGuard, TrackedWriteGuard};
pub use row::{Row, RowView};
pub use table::{Snapshot, Table};

//! Locking Test Suite
//!
//! Explicit locks, shared/exclusive interaction, upgrades, and the
//! snapshot registry as driven through transactions.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test locking
//! ```

#[path = "../common/mod.rs"]
mod common;

mod explicit_locks;

//! Main entry point for isolab.
//!
//! This module provides the `Engine` struct, which owns the shared table and
//! starts transactions against it.

use isolab_concurrency::{AnyTransaction, TransactionManager};
use isolab_core::{IsolationLevel, Key, TransactionId, Value};
use isolab_storage::{RowView, Table};
use std::sync::Arc;
use tracing::debug;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Level used by [`Engine::begin`]
    pub default_level: IsolationLevel,
    /// Expected number of rows
    pub capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_level: IsolationLevel::ReadCommitted,
            capacity: 0,
        }
    }
}

impl EngineOptions {
    /// Strict two-phase locking by default
    pub fn strict() -> Self {
        Self {
            default_level: IsolationLevel::TwoPhaseLocking,
            ..Default::default()
        }
    }

    /// Snapshot isolation by default
    pub fn snapshot() -> Self {
        Self {
            default_level: IsolationLevel::SnapshotIsolation,
            ..Default::default()
        }
    }
}

/// The isolab engine.
///
/// Owns one table and hands out transactions bound to it. Transactions are
/// independent values; run each on its own thread to observe blocking.
///
/// # Example
///
/// ```ignore
/// use isolab::prelude::*;
///
/// let engine = Engine::builder().default_level(IsolationLevel::SnapshotIsolation).build();
/// engine.seed("x", "1");
///
/// let mut t1 = engine.begin();
/// t1.set("x", "2")?.commit();
/// ```
#[derive(Debug)]
pub struct Engine {
    manager: TransactionManager,
    options: EngineOptions,
}

impl Engine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine from explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        let table = if options.capacity > 0 {
            Table::with_capacity(options.capacity)
        } else {
            Table::new()
        };
        debug!(default_level = %options.default_level, "engine created");
        Self {
            manager: TransactionManager::new(Arc::new(table), options.default_level),
            options,
        }
    }

    /// Create a builder for engine configuration.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Active configuration.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The shared table.
    pub fn table(&self) -> Arc<Table> {
        Arc::clone(self.manager.table())
    }

    /// Seed a committed value outside any transaction.
    pub fn seed(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.manager.table().put_committed(key, value);
    }

    /// Start a transaction at the default level with a generated id.
    pub fn begin(&self) -> AnyTransaction {
        self.manager.begin()
    }

    /// Start a transaction at `level` with a generated id.
    pub fn begin_with(&self, level: IsolationLevel) -> AnyTransaction {
        self.manager.begin_with(level)
    }

    /// Start a transaction at `level` with a random UUID id.
    pub fn begin_unique(&self, level: IsolationLevel) -> AnyTransaction {
        self.manager.begin_unique(level)
    }

    /// Start a transaction at `level` with a caller-chosen id.
    pub fn begin_named(&self, level: IsolationLevel, id: impl Into<TransactionId>) -> AnyTransaction {
        self.manager.begin_named(level, id)
    }

    /// Projections of all rows, sorted by key.
    pub fn rows(&self) -> Vec<RowView> {
        self.manager.table().rows()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for engine configuration.
///
/// # Example
///
/// ```ignore
/// let engine = Engine::builder()
///     .default_level(IsolationLevel::TwoPhaseLocking)
///     .seed("x", "1")
///     .seed("y", "1")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct EngineBuilder {
    options: EngineOptions,
    seeds: Vec<(Key, Value)>,
}

impl EngineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a preset.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Level used by [`Engine::begin`].
    pub fn default_level(mut self, level: IsolationLevel) -> Self {
        self.options.default_level = level;
        self
    }

    /// Pre-size the table.
    pub fn capacity(mut self, rows: usize) -> Self {
        self.options.capacity = rows;
        self
    }

    /// Commit an initial value before any transaction runs.
    pub fn seed(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.seeds.push((key.into(), value.into()));
        self
    }

    /// Build the engine.
    pub fn build(self) -> Engine {
        let engine = Engine::with_options(self.options);
        for (key, value) in self.seeds {
            engine.seed(key, value);
        }
        engine
    }
}

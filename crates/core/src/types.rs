//! Core types for the isolation laboratory
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Key`], [`Value`]: the single table's keys and values
//! - [`TransactionId`]: identity of a transaction
//! - [`IsolationLevel`]: the four concurrency-control strategies
//! - [`LockLevel`]: how strongly a transaction holds a row
//! - [`Operation`]: undo-log entry recorded by every mutating call
//! - [`TransactionState`]: transaction lifecycle

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel text stored for absent data.
pub const EMPTY_VALUE: &str = "<empty>";

/// Key of a row in the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create a key from anything string-like
    pub fn new(key: impl Into<String>) -> Self {
        Key(key.into())
    }

    /// Borrow the key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key text is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

/// A stored value.
///
/// Absence is modelled as the sentinel [`Value::empty`] rather than an
/// `Option`, so a deleted row and a never-written row read the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(String);

impl Value {
    /// Create a value from anything string-like
    pub fn new(value: impl Into<String>) -> Self {
        Value(value.into())
    }

    /// The sentinel for absent data
    pub fn empty() -> Self {
        Value(EMPTY_VALUE.to_string())
    }

    /// Whether this is the absent-data sentinel
    pub fn is_empty(&self) -> bool {
        self.0 == EMPTY_VALUE
    }

    /// Borrow the value text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Unique identifier for a transaction
///
/// Transactions are usually named by the caller (`"t1"`, `"doctor-a"`), which
/// keeps lock owners and snapshot registry entries readable. When no name is
/// needed, [`TransactionId::generate`] produces a UUID v4 based id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a named transaction id
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    /// Create a random, unique transaction id
    ///
    /// # Examples
    ///
    /// ```
    /// use isolab_core::TransactionId;
    ///
    /// let id1 = TransactionId::generate();
    /// let id2 = TransactionId::generate();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn generate() -> Self {
        TransactionId(Uuid::new_v4().to_string())
    }

    /// Borrow the id text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        TransactionId(s)
    }
}

impl From<&TransactionId> for TransactionId {
    fn from(id: &TransactionId) -> Self {
        id.clone()
    }
}

/// The four concurrency-control strategies
///
/// | Level | Prevents | Permits |
/// |-------|----------|---------|
/// | ReadUncommitted | nothing | dirty read, dirty write |
/// | ReadCommitted | dirty read | read skew, write skew, lost update |
/// | SnapshotIsolation | dirty read, read skew | write skew |
/// | TwoPhaseLocking | dirty read, read skew, write skew | (deadlock) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Reads see the most recent write of any transaction
    #[serde(rename = "read-uncommitted", alias = "ru")]
    ReadUncommitted,
    /// Reads see committed data or the transaction's own writes
    #[serde(rename = "read-committed", alias = "rc")]
    ReadCommitted,
    /// Reads see a point-in-time snapshot opened when the transaction began
    #[serde(rename = "snapshot-isolation", alias = "si")]
    SnapshotIsolation,
    /// Locks are held from first use until commit or rollback
    #[serde(rename = "two-phase-locking", alias = "2pl")]
    TwoPhaseLocking,
}

impl IsolationLevel {
    /// All levels, weakest first
    pub const ALL: [IsolationLevel; 4] = [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::SnapshotIsolation,
        IsolationLevel::TwoPhaseLocking,
    ];

    /// Canonical kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "read-uncommitted",
            IsolationLevel::ReadCommitted => "read-committed",
            IsolationLevel::SnapshotIsolation => "snapshot-isolation",
            IsolationLevel::TwoPhaseLocking => "two-phase-locking",
        }
    }

    /// Whether locks are held until the transaction ends
    pub fn holds_locks(&self) -> bool {
        matches!(self, IsolationLevel::TwoPhaseLocking)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    /// Parse a level name
    ///
    /// Case, `-`, `_` and spaces are ignored, so `read-committed`,
    /// `ReadCommitted` and `READ_COMMITTED` all parse. Short forms
    /// `ru`, `rc`, `si` and `2pl` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "readuncommitted" | "ru" => Ok(IsolationLevel::ReadUncommitted),
            "readcommitted" | "rc" => Ok(IsolationLevel::ReadCommitted),
            "snapshotisolation" | "snapshot" | "si" => Ok(IsolationLevel::SnapshotIsolation),
            "twophaselocking" | "2pl" => Ok(IsolationLevel::TwoPhaseLocking),
            _ => Err(Error::UnknownIsolationLevel(s.to_string())),
        }
    }
}

/// How strongly a transaction holds a row's lock
///
/// Ordered so that `level >= LockLevel::Read` reads naturally.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LockLevel {
    /// Not held
    #[default]
    None,
    /// Shared
    Read,
    /// Exclusive
    ReadWrite,
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockLevel::None => write!(f, "none"),
            LockLevel::Read => write!(f, "read"),
            LockLevel::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Undo-log entry
///
/// Appended on every mutating call, applied in order on commit and replayed
/// in reverse on rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Row written
    pub key: Key,
    /// Value visible to the transaction before the write
    pub from_value: Value,
    /// Value written
    pub to_value: Value,
}

impl Operation {
    /// Create an operation record
    pub fn new(key: Key, from_value: Value, to_value: Value) -> Self {
        Self {
            key,
            from_value,
            to_value,
        }
    }
}

/// Transaction lifecycle
///
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Accepting operations
    Active,
    /// Writes applied
    Committed,
    /// Writes undone
    Aborted,
}

impl TransactionState {
    /// Check if transaction can execute operations
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    /// Check if transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

//! Scripted replay of interleaved transactions.
//!
//! A script is an ordered list of [`Event`]s, each naming the transaction
//! that performs it. Every transaction runs on its own worker thread and
//! executes its events in script order; a coordinator hands events out in
//! global order.
//!
//! Before dispatching a step the coordinator asks the row lock whether the
//! step will have to wait. A step expected to run straight through is
//! awaited before the next one is dispatched. A step expected to block is
//! given [`ReplayOptions::step_wait`] to prove otherwise, then left parked
//! while the script moves on. This is how a script expresses "t2 waits for
//! t1 to commit".
//!
//! The whole replay is bounded by [`ReplayOptions::timeout`]. When it
//! expires the trace reports what finished and which steps did not; worker
//! threads stuck in a lock cycle are left parked. Transactions the script
//! leaves open are rolled back once the replay ends, after the final rows
//! have been captured.
//!
//! # Script format
//!
//! ```json
//! [
//!   {"op": "write", "tx": "t1", "level": "2pl", "key": "x", "value": "2"},
//!   {"op": "read", "tx": "t2", "level": "2pl", "key": "x"},
//!   {"op": "commit", "tx": "t1", "level": "2pl"},
//!   {"op": "commit", "tx": "t2", "level": "2pl"}
//! ]
//! ```

use crate::error::{Error, Result};
use isolab_concurrency::{AnyTransaction, Transaction};
use isolab_core::{IsolationLevel, Key, LockLevel, TransactionId, Value};
use isolab_storage::{RowView, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ============================================================================
// Events
// ============================================================================

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Event {
    /// `tx` reads `key`
    Read {
        /// Performing transaction
        tx: TransactionId,
        /// Its isolation level
        level: IsolationLevel,
        /// Key read
        key: Key,
    },
    /// `tx` writes `value` to `key`
    Write {
        /// Performing transaction
        tx: TransactionId,
        /// Its isolation level
        level: IsolationLevel,
        /// Key written
        key: Key,
        /// Value written
        value: Value,
    },
    /// `tx` commits
    Commit {
        /// Performing transaction
        tx: TransactionId,
        /// Its isolation level
        level: IsolationLevel,
    },
}

impl Event {
    /// Read event.
    pub fn read(tx: impl Into<TransactionId>, level: IsolationLevel, key: impl Into<Key>) -> Self {
        Event::Read {
            tx: tx.into(),
            level,
            key: key.into(),
        }
    }

    /// Write event.
    pub fn write(
        tx: impl Into<TransactionId>,
        level: IsolationLevel,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Self {
        Event::Write {
            tx: tx.into(),
            level,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Commit event.
    pub fn commit(tx: impl Into<TransactionId>, level: IsolationLevel) -> Self {
        Event::Commit {
            tx: tx.into(),
            level,
        }
    }

    /// Performing transaction.
    pub fn tx(&self) -> &TransactionId {
        match self {
            Event::Read { tx, .. } | Event::Write { tx, .. } | Event::Commit { tx, .. } => tx,
        }
    }

    /// Isolation level of the performing transaction.
    pub fn level(&self) -> IsolationLevel {
        match self {
            Event::Read { level, .. } | Event::Write { level, .. } | Event::Commit { level, .. } => {
                *level
            }
        }
    }

    /// Key the event targets; `None` for commits.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Event::Read { key, .. } | Event::Write { key, .. } => Some(key),
            Event::Commit { .. } => None,
        }
    }
}

/// Decode a JSON script.
pub fn parse_events(json: &str) -> Result<Vec<Event>> {
    Ok(serde_json::from_str(json)?)
}

/// Read and decode a JSON script file.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<Event>> {
    let json = std::fs::read_to_string(path)?;
    parse_events(&json)
}

fn validate(events: &[Event]) -> Result<()> {
    let mut levels: HashMap<&TransactionId, IsolationLevel> = HashMap::new();
    for (index, event) in events.iter().enumerate() {
        let tx = event.tx();
        if tx.as_str().is_empty() {
            return Err(Error::InvalidEvent(format!("event {index}: empty transaction id")));
        }
        if event.key().map_or(false, Key::is_empty) {
            return Err(Error::InvalidEvent(format!("event {index} ({tx}): empty key")));
        }
        let level = *levels.entry(tx).or_insert_with(|| event.level());
        if level != event.level() {
            return Err(Error::InvalidEvent(format!(
                "event {index}: {tx} switches from {level} to {}",
                event.level()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Options and trace
// ============================================================================

/// Replay timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Upper bound for the whole replay
    pub timeout: Duration,
    /// Grace period for a step expected to block
    pub step_wait: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            step_wait: Duration::from_millis(50),
        }
    }
}

impl ReplayOptions {
    /// Generous timing for loaded machines
    pub fn patient() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            step_wait: Duration::from_millis(250),
        }
    }

    /// Replace the overall timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the per-step grace period
    pub fn with_step_wait(mut self, step_wait: Duration) -> Self {
        self.step_wait = step_wait;
        self
    }
}

/// Outcome of one finished step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Position in the script
    pub index: usize,
    /// Performing transaction
    pub tx: TransactionId,
    /// The event itself
    pub event: Event,
    /// Value returned by a read
    pub observed: Option<Value>,
    /// Lock the transaction holds on the event's key afterwards
    pub lock_level: LockLevel,
    /// Whether the coordinator moved on before this step finished
    pub blocked: bool,
    /// Affected rows afterwards: the event's key, or every key a commit wrote
    pub rows: Vec<RowView>,
    /// Error returned by the operation, if any
    pub error: Option<String>,
}

/// Result of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayTrace {
    /// Finished steps in completion order
    pub steps: Vec<TraceStep>,
    /// Every row once the replay stopped, sorted by key
    pub rows: Vec<RowView>,
    /// Whether the timeout expired first
    pub timed_out: bool,
    /// Script positions that never finished
    pub pending: Vec<usize>,
}

impl ReplayTrace {
    /// Finished step at script position `index`.
    pub fn step(&self, index: usize) -> Option<&TraceStep> {
        self.steps.iter().find(|step| step.index == index)
    }

    /// Value observed by the read at script position `index`.
    pub fn observed(&self, index: usize) -> Option<&Value> {
        self.step(index).and_then(|step| step.observed.as_ref())
    }

    /// Script positions in completion order.
    pub fn completion_order(&self) -> Vec<usize> {
        self.steps.iter().map(|step| step.index).collect()
    }

    /// Final row for `key`.
    pub fn row(&self, key: &Key) -> Option<&RowView> {
        self.rows.iter().find(|row| &row.key == key)
    }
}

// ============================================================================
// Workers
// ============================================================================

struct Worker {
    inbox: Sender<(usize, Event)>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(
        tx: TransactionId,
        level: IsolationLevel,
        table: Arc<Table>,
        results: Sender<TraceStep>,
    ) -> Result<Self> {
        let (inbox, events) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("replay-{tx}"))
            .spawn(move || run_worker(tx, level, table, events, results))?;
        Ok(Self { inbox, handle })
    }
}

fn run_worker(
    tx: TransactionId,
    level: IsolationLevel,
    table: Arc<Table>,
    events: Receiver<(usize, Event)>,
    results: Sender<TraceStep>,
) {
    let mut txn: Option<AnyTransaction> = None;
    for (index, event) in events {
        let txn = txn.get_or_insert_with(|| {
            AnyTransaction::begin(level, tx.clone(), Arc::clone(&table))
        });
        let step = execute(index, txn, event, &table);
        if results.send(step).is_err() {
            break;
        }
    }
}

fn execute(index: usize, txn: &mut AnyTransaction, event: Event, table: &Table) -> TraceStep {
    let mut observed = None;
    let mut error = None;
    let mut lock_level = LockLevel::None;
    let mut rows = Vec::new();

    match &event {
        Event::Read { key, .. } => {
            match txn.get(key) {
                Ok(value) => observed = Some(value),
                Err(e) => error = Some(e.to_string()),
            }
            lock_level = txn.locks().level(key);
            rows.extend(table.row_view(key));
        }
        Event::Write { key, value, .. } => {
            if let Err(e) = txn.set(key, value) {
                error = Some(e.to_string());
            }
            lock_level = txn.locks().level(key);
            rows.extend(table.row_view(key));
        }
        Event::Commit { .. } => {
            let written = txn.keys_written_to();
            txn.commit();
            rows.extend(written.iter().filter_map(|key| table.row_view(key)));
        }
    }

    TraceStep {
        index,
        tx: txn.id().clone(),
        event,
        observed,
        lock_level,
        blocked: false,
        rows,
        error,
    }
}

// ============================================================================
// Coordinator
// ============================================================================

struct Collector {
    results: Receiver<TraceStep>,
    steps: Vec<TraceStep>,
    finished: HashSet<usize>,
    parked: HashSet<usize>,
    outstanding: HashMap<TransactionId, usize>,
}

impl Collector {
    fn new(results: Receiver<TraceStep>) -> Self {
        Self {
            results,
            steps: Vec::new(),
            finished: HashSet::new(),
            parked: HashSet::new(),
            outstanding: HashMap::new(),
        }
    }

    fn dispatched(&mut self, tx: &TransactionId) {
        *self.outstanding.entry(tx.clone()).or_insert(0) += 1;
    }

    fn has_outstanding(&self, tx: &TransactionId) -> bool {
        self.outstanding.get(tx).copied().unwrap_or(0) > 0
    }

    fn record(&mut self, mut step: TraceStep) {
        if let Some(count) = self.outstanding.get_mut(&step.tx) {
            *count = count.saturating_sub(1);
        }
        step.blocked = self.parked.contains(&step.index);
        debug!(index = step.index, tx = %step.tx, blocked = step.blocked, "step finished");
        self.finished.insert(step.index);
        self.steps.push(step);
    }

    /// Collect results until `index` finishes or `until` passes
    fn wait_for(&mut self, index: usize, until: Instant) -> bool {
        while !self.finished.contains(&index) {
            if !self.next(until) {
                return false;
            }
        }
        true
    }

    /// Collect results until `count` steps finished or `until` passes
    fn wait_all(&mut self, count: usize, until: Instant) -> bool {
        while self.finished.len() < count {
            if !self.next(until) {
                return false;
            }
        }
        true
    }

    fn next(&mut self, until: Instant) -> bool {
        let now = Instant::now();
        if now >= until {
            return false;
        }
        match self.results.recv_timeout(until - now) {
            Ok(step) => {
                self.record(step);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

fn predict_block(table: &Table, event: &Event, written: Option<&BTreeSet<Key>>) -> bool {
    let tx = event.tx();
    match event {
        Event::Read { key, .. } => table.would_block(key, LockLevel::Read, tx),
        Event::Write { key, .. } => table.would_block(key, LockLevel::ReadWrite, tx),
        Event::Commit { level, .. } => {
            !level.holds_locks()
                && written.map_or(false, |keys| {
                    keys.iter()
                        .any(|key| table.would_block(key, LockLevel::ReadWrite, tx))
                })
        }
    }
}

/// Play `events` against `table`.
///
/// Fails only on invalid scripts or when a worker thread cannot be spawned;
/// operation errors and timeouts are reported inside the trace.
pub fn play_events(
    events: &[Event],
    table: Arc<Table>,
    options: &ReplayOptions,
) -> Result<ReplayTrace> {
    validate(events)?;

    let deadline = Instant::now() + options.timeout;
    let (results_tx, results_rx) = mpsc::channel();
    let mut collector = Collector::new(results_rx);
    let mut workers: HashMap<TransactionId, Worker> = HashMap::new();
    let mut written: HashMap<TransactionId, BTreeSet<Key>> = HashMap::new();
    let mut dispatched = 0;
    let mut timed_out = false;

    for (index, event) in events.iter().enumerate() {
        let tx = event.tx();
        let expect_block = collector.has_outstanding(tx)
            || predict_block(&table, event, written.get(tx));
        if let Event::Write { key, .. } = event {
            written.entry(tx.clone()).or_default().insert(key.clone());
        }

        if !workers.contains_key(tx) {
            let worker = Worker::spawn(
                tx.clone(),
                event.level(),
                Arc::clone(&table),
                results_tx.clone(),
            )?;
            workers.insert(tx.clone(), worker);
        }

        debug!(index, tx = %tx, expect_block, "dispatching step");
        let sent = workers
            .get(tx)
            .map_or(false, |worker| worker.inbox.send((index, event.clone())).is_ok());
        if !sent {
            warn!(index, tx = %tx, "worker gone, step dropped");
            continue;
        }
        collector.dispatched(tx);
        dispatched += 1;

        let until = if expect_block {
            (Instant::now() + options.step_wait).min(deadline)
        } else {
            deadline
        };
        if !collector.wait_for(index, until) {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }
            debug!(index, tx = %tx, "step parked");
            collector.parked.insert(index);
        }
    }

    if !timed_out && !collector.wait_all(dispatched, deadline) {
        timed_out = true;
    }
    if timed_out {
        warn!(timeout_ms = options.timeout.as_millis() as u64, "replay timed out");
    }

    let rows = table.rows();
    let pending: Vec<usize> = (0..events.len())
        .filter(|index| !collector.finished.contains(index))
        .collect();

    let handles: Vec<JoinHandle<()>> = workers.into_values().map(|worker| worker.handle).collect();
    if !timed_out {
        for handle in handles {
            if handle.join().is_err() {
                warn!("replay worker panicked");
            }
        }
    }

    Ok(ReplayTrace {
        steps: collector.steps,
        rows,
        timed_out,
        pending,
    })
}

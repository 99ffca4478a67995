//! Shared helpers for the integration test binaries.

#![allow(dead_code)]

use isolab::prelude::*;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long a step must stay unfinished to count as blocked
pub const BLOCK_WINDOW: Duration = Duration::from_millis(150);

/// How long a released step may take to finish
pub const RELEASE_WINDOW: Duration = Duration::from_secs(5);

/// Fresh table holding the given committed rows
pub fn seeded_table(rows: &[(&str, &str)]) -> Arc<Table> {
    let table = Arc::new(Table::new());
    for (key, value) in rows {
        table.put_committed(*key, *value);
    }
    table
}

/// Start a named transaction
pub fn begin(level: IsolationLevel, id: &str, table: &Arc<Table>) -> AnyTransaction {
    AnyTransaction::begin(level, id, Arc::clone(table))
}

/// Committed value of `key`
pub fn committed(table: &Table, key: &str) -> Value {
    table
        .row_view(&Key::from(key))
        .map(|view| view.committed)
        .unwrap_or_else(Value::empty)
}

/// Run `work` on its own thread, reporting its result over a channel
pub fn spawn_reporting<T, F>(work: F) -> (Receiver<T>, JoinHandle<()>)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(work());
    });
    (rx, handle)
}

/// Assert nothing arrives on `rx` within [`BLOCK_WINDOW`]
pub fn assert_blocked<T>(rx: &Receiver<T>, what: &str) {
    assert!(
        rx.recv_timeout(BLOCK_WINDOW).is_err(),
        "{what} should still be waiting"
    );
}

/// Wait for the value on `rx`, failing after [`RELEASE_WINDOW`]
pub fn expect_done<T>(rx: &Receiver<T>, what: &str) -> T {
    rx.recv_timeout(RELEASE_WINDOW)
        .unwrap_or_else(|_| panic!("{what} should have finished"))
}

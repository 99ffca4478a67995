//! Dirty reads and dirty writes.

use crate::common::*;
use isolab::prelude::*;
use std::sync::Arc;

// =============================================================================
// DIRTY READS
// =============================================================================

#[test]
fn test_read_committed_hides_write_until_commit() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::ReadCommitted, "t1", &table);
    let mut t2 = begin(IsolationLevel::ReadCommitted, "t2", &table);

    t2.set("x", "B").unwrap();
    assert_eq!(t1.get("x").unwrap(), "A");

    t2.commit();
    assert_eq!(t1.get("x").unwrap(), "B");
}

#[test]
fn test_read_uncommitted_sees_dirty_value() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::ReadUncommitted, "t1", &table);
    let mut t2 = begin(IsolationLevel::ReadUncommitted, "t2", &table);

    t2.set("x", "B").unwrap();
    assert_eq!(t1.get("x").unwrap(), "B");

    t2.rollback();
    assert_eq!(t1.get("x").unwrap(), "A");
}

#[test]
fn test_snapshot_isolation_hides_dirty_value() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);

    t2.set("x", "B").unwrap();
    assert_eq!(t1.get("x").unwrap(), "A");
}

#[test]
fn test_two_phase_locking_reader_waits_for_writer() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::TwoPhaseLocking, "t1", &table);
    t1.set("x", "B").unwrap();

    let reader_table = Arc::clone(&table);
    let (rx, handle) = spawn_reporting(move || {
        let mut t2 = begin(IsolationLevel::TwoPhaseLocking, "t2", &reader_table);
        let seen = t2.get("x").unwrap();
        t2.commit();
        seen
    });

    assert_blocked(&rx, "2PL read of a written key");
    t1.rollback();

    assert_eq!(expect_done(&rx, "2PL read"), "A");
    handle.join().unwrap();
}

// =============================================================================
// OWN OVERLAY
// =============================================================================

#[test]
fn test_each_transaction_reads_own_overlay() {
    for level in [
        IsolationLevel::ReadCommitted,
        IsolationLevel::SnapshotIsolation,
    ] {
        let table = seeded_table(&[("x", "A")]);
        let mut t1 = begin(level, "t1", &table);
        let mut t2 = begin(level, "t2", &table);

        t1.set("x", "B").unwrap();
        t2.set("x", "C").unwrap();

        assert_eq!(t1.get("x").unwrap(), "B", "{level}");
        assert_eq!(t2.get("x").unwrap(), "C", "{level}");

        let view = table.row_view(&Key::from("x")).unwrap();
        assert_eq!(view.uncommitted_by_tx.len(), 2);
        assert_eq!(view.latest_uncommitted, "C");
        assert_eq!(view.committed, "A");
    }
}

// =============================================================================
// DIRTY WRITES
// =============================================================================

#[test]
fn test_read_uncommitted_allows_dirty_write() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::ReadUncommitted, "t1", &table);
    let mut t2 = begin(IsolationLevel::ReadUncommitted, "t2", &table);

    t1.set("x", "B").unwrap();
    t2.set("x", "C").unwrap();

    assert_eq!(t1.get("x").unwrap(), "C");

    t2.commit();
    t1.commit();
    assert_eq!(committed(&table, "x"), "B");
}

#[test]
fn test_two_phase_locking_writer_waits_for_writer() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::TwoPhaseLocking, "t1", &table);
    t1.set("x", "B").unwrap();

    let writer_table = Arc::clone(&table);
    let (rx, handle) = spawn_reporting(move || {
        let mut t2 = begin(IsolationLevel::TwoPhaseLocking, "t2", &writer_table);
        t2.set("x", "C").unwrap().commit();
    });

    assert_blocked(&rx, "second 2PL writer");
    t1.commit();
    assert_eq!(committed(&table, "x"), "B");

    expect_done(&rx, "second 2PL writer");
    handle.join().unwrap();
    assert_eq!(committed(&table, "x"), "C");
}

//! Behavior of a transaction after it has committed or rolled back.

use crate::common::*;
use isolab::prelude::*;

#[test]
fn test_commit_then_rollback_keeps_commit() {
    for level in [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::SnapshotIsolation,
        IsolationLevel::TwoPhaseLocking,
    ] {
        let table = seeded_table(&[("x", "A")]);
        let mut tx = begin(level, "t1", &table);

        tx.set("x", "B").unwrap().commit();
        let err = tx.set("x", "C").unwrap_err();
        assert!(err.is_closed(), "{level}: {err}");

        tx.rollback();
        assert_eq!(tx.state(), TransactionState::Committed);
        assert_eq!(tx.get("x").unwrap(), "B", "{level}");
        assert_eq!(committed(&table, "x"), "B");
    }
}

#[test]
fn test_finished_transaction_rejects_writes() {
    let table = seeded_table(&[("x", "A")]);
    let mut tx = begin(IsolationLevel::ReadCommitted, "t1", &table);
    tx.rollback();

    assert!(tx.set("x", "B").unwrap_err().is_closed());
    assert!(tx.delete("x").unwrap_err().is_closed());
    assert!(tx.lock("x").unwrap_err().is_closed());
    assert_eq!(committed(&table, "x"), "A");
}

#[test]
fn test_repeated_commit_is_noop() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::ReadCommitted, "t1", &table);
    t1.set("x", "B").unwrap().commit();

    let mut t2 = begin(IsolationLevel::ReadCommitted, "t2", &table);
    t2.set("x", "C").unwrap().commit();

    t1.commit().commit();
    assert_eq!(committed(&table, "x"), "C");
}

#[test]
fn test_finished_transaction_reads_live_committed() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    t1.commit();

    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);
    t2.set("x", "B").unwrap().commit();

    assert_eq!(t1.get("x").unwrap(), "B");
    assert_eq!(t1.get("missing").unwrap(), Value::empty());
}

#[test]
fn test_state_and_bookkeeping_reset_on_commit() {
    let table = seeded_table(&[("x", "A")]);
    let mut tx = begin(IsolationLevel::TwoPhaseLocking, "t1", &table);
    tx.get("x").unwrap();
    tx.set("y", "1").unwrap();

    assert_eq!(tx.state(), TransactionState::Active);
    assert_eq!(tx.keys_written_to(), vec![Key::from("y")]);
    assert_eq!(tx.locks().len(), 2);

    tx.commit();
    assert_eq!(tx.state(), TransactionState::Committed);
    assert!(tx.keys_touched().is_empty());
    assert!(tx.keys_written_to().is_empty());
    assert!(tx.locks().is_empty());
}

//! `lock()` holds an exclusive lock until the transaction ends, at every level.

use crate::common::*;
use isolab::prelude::*;
use std::sync::Arc;

fn locked_write_then_locked_read(level: IsolationLevel) -> Value {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(level, "t1", &table);
    t1.lock("x").unwrap().set("x", "B").unwrap();

    let key = Key::from("x");
    assert!(table.is_blocked(&key, &TransactionId::from("t2")));
    assert!(!table.is_blocked(&key, &TransactionId::from("t1")));

    let reader_table = Arc::clone(&table);
    let (rx, handle) = spawn_reporting(move || {
        let mut t2 = begin(level, "t2", &reader_table);
        let seen = t2.lock("x").unwrap().get("x").unwrap();
        t2.commit();
        seen
    });

    assert_blocked(&rx, "second lock on x");
    t1.commit();

    let seen = expect_done(&rx, "second lock on x");
    handle.join().unwrap();
    seen
}

#[test]
fn test_lock_blocks_until_commit() {
    for level in [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::TwoPhaseLocking,
    ] {
        assert_eq!(locked_write_then_locked_read(level), "B", "{level}");
    }
}

#[test]
fn test_snapshot_waiter_keeps_its_snapshot() {
    // The waiter's snapshot opened before the holder committed.
    assert_eq!(
        locked_write_then_locked_read(IsolationLevel::SnapshotIsolation),
        "A"
    );
}

#[test]
fn test_lock_released_by_rollback() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::ReadCommitted, "t1", &table);
    t1.lock("x").unwrap();
    assert_eq!(t1.locks().level(&Key::from("x")), LockLevel::ReadWrite);

    let writer_table = Arc::clone(&table);
    let (rx, handle) = spawn_reporting(move || {
        let mut t2 = begin(IsolationLevel::ReadCommitted, "t2", &writer_table);
        t2.set("x", "C").unwrap().commit();
    });

    assert_blocked(&rx, "write under an explicit lock");
    t1.rollback();
    expect_done(&rx, "write under an explicit lock");
    handle.join().unwrap();

    assert_eq!(committed(&table, "x"), "C");
}

#[test]
fn test_lock_is_idempotent() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::TwoPhaseLocking, "t1", &table);

    t1.lock("x").unwrap().lock("x").unwrap();
    assert_eq!(t1.locks().len(), 1);

    let row = table.row(&Key::from("x")).unwrap();
    assert_eq!(row.lock().writer(), Some(TransactionId::from("t1")));
    t1.commit();
    assert!(row.lock().is_free());
}

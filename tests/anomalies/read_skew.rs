//! Read skew: a reader observing two rows from different points in time.

use crate::common::*;
use isolab::prelude::*;

/// T1 reads x, T2 moves value from x to y and commits, T1 reads y.
fn transfer_between_reads(level: IsolationLevel) -> (Value, Value) {
    let table = seeded_table(&[("x", "50"), ("y", "50")]);
    let mut t1 = begin(level, "t1", &table);
    let mut t2 = begin(level, "t2", &table);

    let x = t1.get("x").unwrap();
    t2.set("x", "0").unwrap().set("y", "100").unwrap().commit();
    let y = t1.get("y").unwrap();

    t1.commit();
    (x, y)
}

#[test]
fn test_read_committed_permits_read_skew() {
    let (x, y) = transfer_between_reads(IsolationLevel::ReadCommitted);
    assert_eq!(x, "50");
    assert_eq!(y, "100");
}

#[test]
fn test_snapshot_isolation_prevents_read_skew() {
    let (x, y) = transfer_between_reads(IsolationLevel::SnapshotIsolation);
    assert_eq!(x, "50");
    assert_eq!(y, "50");
}

#[test]
fn test_snapshot_reads_stable_after_concurrent_commit() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);

    t2.set("x", "B").unwrap().commit();

    assert_eq!(t1.get("x").unwrap(), "A");
    assert_eq!(t1.get("x").unwrap(), "A");
    assert_eq!(committed(&table, "x"), "B");
}

#[test]
fn test_snapshot_ignores_rows_created_later() {
    let table = seeded_table(&[]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);

    t2.set("fresh", "1").unwrap().commit();
    assert_eq!(t1.get("fresh").unwrap(), Value::empty());
}

#[test]
fn test_snapshot_released_at_end() {
    let table = seeded_table(&[("x", "A")]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);
    assert_eq!(table.snapshot_count(), 2);

    t2.set("x", "B").unwrap().commit();
    assert_eq!(table.snapshot_count(), 1);

    t1.commit();
    assert_eq!(table.snapshot_count(), 0);
    assert_eq!(t1.get("x").unwrap(), "B");
}

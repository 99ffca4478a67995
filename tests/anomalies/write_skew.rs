//! Write skew on a two-row invariant: at least one of `a` and `b` stays "true".

use crate::common::*;
use isolab::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

const TRUE: &str = "true";
const FALSE: &str = "false";

fn falses(table: &Table) -> usize {
    ["a", "b"]
        .into_iter()
        .filter(|key| committed(table, key) == FALSE)
        .count()
}

#[test]
fn test_snapshot_isolation_permits_write_skew() {
    let table = seeded_table(&[("a", TRUE), ("b", TRUE)]);
    let mut t1 = begin(IsolationLevel::SnapshotIsolation, "t1", &table);
    let mut t2 = begin(IsolationLevel::SnapshotIsolation, "t2", &table);

    let t1_sees = t1.get("b").unwrap();
    let t2_sees = t2.get("a").unwrap();
    if t1_sees == TRUE {
        t1.set("a", FALSE).unwrap();
    }
    if t2_sees == TRUE {
        t2.set("b", FALSE).unwrap();
    }
    t1.commit();
    t2.commit();

    assert_eq!(committed(&table, "a"), FALSE);
    assert_eq!(committed(&table, "b"), FALSE);
}

#[test]
fn test_read_committed_permits_write_skew() {
    let table = seeded_table(&[("a", TRUE), ("b", TRUE)]);
    let mut t1 = begin(IsolationLevel::ReadCommitted, "t1", &table);
    let mut t2 = begin(IsolationLevel::ReadCommitted, "t2", &table);

    assert_eq!(t1.get("b").unwrap(), TRUE);
    assert_eq!(t2.get("a").unwrap(), TRUE);
    t1.set("a", FALSE).unwrap();
    t2.set("b", FALSE).unwrap();
    t1.commit();
    t2.commit();

    assert_eq!(falses(&table), 2);
}

#[test]
fn test_two_phase_locking_prevents_write_skew() {
    for _ in 0..20 {
        let table = seeded_table(&[("a", TRUE), ("b", TRUE)]);
        let start = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [("t1", "a", "b"), ("t2", "b", "a")]
            .into_iter()
            .map(|(id, mine, other)| {
                let table = Arc::clone(&table);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    let mut tx = begin(IsolationLevel::TwoPhaseLocking, id, &table);
                    start.wait();
                    // Fixed order on both sides, so the two never wait in a cycle.
                    tx.lock("a").unwrap().lock("b").unwrap();
                    if tx.get(other).unwrap() == TRUE {
                        tx.set(mine, FALSE).unwrap();
                    }
                    tx.commit();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(falses(&table), 1);
    }
}

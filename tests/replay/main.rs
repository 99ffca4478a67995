//! Replay Test Suite
//!
//! Scripts of interleaved reads, writes and commits played with one thread
//! per transaction.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test replay
//! ```

#[path = "../common/mod.rs"]
mod common;

use common::*;
use isolab::prelude::*;
use isolab::replay::load_events;
use std::time::Duration;

fn level_2pl() -> IsolationLevel {
    IsolationLevel::TwoPhaseLocking
}

// =============================================================================
// BLOCKING
// =============================================================================

#[test]
fn test_two_phase_locking_reader_waits_for_commit() {
    let table = seeded_table(&[("x", "1")]);
    let events = vec![
        Event::write("t1", level_2pl(), "x", "2"),
        Event::read("t2", level_2pl(), "x"),
        Event::commit("t1", level_2pl()),
        Event::commit("t2", level_2pl()),
    ];

    let trace = play_events(&events, table, &ReplayOptions::patient()).unwrap();

    assert!(!trace.timed_out);
    assert!(trace.pending.is_empty());
    assert_eq!(trace.steps.len(), 4);

    let read = trace.step(1).unwrap();
    assert!(read.blocked);
    assert_eq!(read.observed, Some(Value::from("2")));
    assert_eq!(read.lock_level, LockLevel::Read);

    assert!(!trace.step(0).unwrap().blocked);
    assert_eq!(trace.row(&Key::from("x")).unwrap().committed, "2");
    assert_eq!(*trace.completion_order().last().unwrap(), 3);
}

#[test]
fn test_lock_cycle_times_out() {
    let table = seeded_table(&[("x", "1"), ("y", "1")]);
    let events = vec![
        Event::write("t1", level_2pl(), "x", "2"),
        Event::write("t2", level_2pl(), "y", "2"),
        Event::write("t1", level_2pl(), "y", "3"),
        Event::write("t2", level_2pl(), "x", "3"),
        Event::commit("t1", level_2pl()),
        Event::commit("t2", level_2pl()),
    ];
    let options = ReplayOptions::default()
        .with_timeout(Duration::from_millis(600))
        .with_step_wait(Duration::from_millis(30));

    let trace = play_events(&events, table, &options).unwrap();

    assert!(trace.timed_out);
    assert_eq!(trace.pending, vec![2, 3, 4, 5]);
    assert_eq!(trace.completion_order(), vec![0, 1]);
    assert_eq!(trace.row(&Key::from("x")).unwrap().committed, "1");
}

// =============================================================================
// NON-BLOCKING LEVELS
// =============================================================================

#[test]
fn test_read_committed_script_from_json() {
    let table = seeded_table(&[("x", "1")]);
    let events = isolab::replay::parse_events(
        r#"[
            {"op": "write", "tx": "t1", "level": "rc", "key": "x", "value": "2"},
            {"op": "read", "tx": "t2", "level": "rc", "key": "x"},
            {"op": "commit", "tx": "t1", "level": "rc"},
            {"op": "read", "tx": "t2", "level": "rc", "key": "x"},
            {"op": "commit", "tx": "t2", "level": "rc"}
        ]"#,
    )
    .unwrap();

    let trace = play_events(&events, table, &ReplayOptions::default()).unwrap();

    assert!(!trace.timed_out);
    assert_eq!(trace.completion_order(), vec![0, 1, 2, 3, 4]);
    assert_eq!(trace.observed(1), Some(&Value::from("1")));
    assert_eq!(trace.observed(3), Some(&Value::from("2")));
    assert!(trace.steps.iter().all(|step| !step.blocked));
}

#[test]
fn test_read_uncommitted_script_sees_dirty_value() {
    let table = seeded_table(&[("x", "1")]);
    let ru = IsolationLevel::ReadUncommitted;
    let events = vec![
        Event::write("t1", ru, "x", "2"),
        Event::read("t2", ru, "x"),
    ];

    let trace = play_events(&events, table, &ReplayOptions::default()).unwrap();

    assert_eq!(trace.observed(1), Some(&Value::from("2")));
    // t1 never committed; its transaction is rolled back once the replay ends.
    assert_eq!(trace.row(&Key::from("x")).unwrap().committed, "1");
    assert_eq!(trace.row(&Key::from("x")).unwrap().latest_uncommitted, "2");
}

#[test]
fn test_step_after_commit_reports_error() {
    let table = seeded_table(&[]);
    let rc = IsolationLevel::ReadCommitted;
    let events = vec![
        Event::write("t1", rc, "x", "1"),
        Event::commit("t1", rc),
        Event::write("t1", rc, "x", "2"),
    ];

    let trace = play_events(&events, table, &ReplayOptions::default()).unwrap();

    let step = trace.step(2).unwrap();
    assert!(step.error.as_deref().unwrap().contains("COMMITTED"));
    assert_eq!(trace.row(&Key::from("x")).unwrap().committed, "1");
}

#[test]
fn test_commit_step_records_written_rows() {
    let table = seeded_table(&[]);
    let si = IsolationLevel::SnapshotIsolation;
    let events = vec![
        Event::write("t1", si, "b", "1"),
        Event::write("t1", si, "a", "1"),
        Event::commit("t1", si),
    ];

    let trace = play_events(&events, table, &ReplayOptions::default()).unwrap();

    let keys: Vec<&str> = trace.step(2).unwrap().rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(trace.rows.len(), 2);
}

// =============================================================================
// SCRIPT FILES
// =============================================================================

#[test]
fn test_load_events_from_file() {
    let path = std::env::temp_dir().join(format!("isolab-replay-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[{"op": "read", "tx": "t1", "level": "snapshot-isolation", "key": "x"}]"#,
    )
    .unwrap();

    let events = load_events(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        events,
        vec![Event::read("t1", IsolationLevel::SnapshotIsolation, "x")]
    );
}

#[test]
fn test_load_events_missing_file() {
    let err = load_events("/nonexistent/isolab/script.json").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

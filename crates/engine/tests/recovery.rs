//! Recovery Tests
//!
//! Reopen a database after writes and deletions and check the replayed state:
//! - Deleted traces stay deleted, survivors are intact
//! - Experiment lifecycle and grants survive a restart
//! - A torn WAL tail is dropped; mid-log corruption respects the budget
//! - Read-only opens never modify the WAL

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;
use tracebase_core::{DeleteTracesRequest, ExperimentId, NewTrace, Span, TraceId, TraceStatus};
use tracebase_engine::{Database, DurabilityMode, WAL_FILE_NAME};
use tracebase_security::{Permission, Principal};

fn sys() -> Principal {
    Principal::system()
}

fn id(n: u64) -> TraceId {
    TraceId::parse(&format!("trace-{:05}", n)).unwrap()
}

/// Build a trace with a realistic span payload
fn trace(experiment: &ExperimentId, n: u64) -> NewTrace {
    NewTrace::new(experiment.clone())
        .with_id(id(n))
        .at(1_000 + n)
        .took(n % 50)
        .tag("batch", format!("{}", n / 100))
        .metadata("model", "gpt")
        .span(
            Span::new(1, "chain", 0)
                .ended_at(10)
                .with_attribute("inputs", serde_json::json!({"question": format!("q{}", n)})),
        )
        .span(
            Span::new(2, "llm", 1)
                .with_parent(1)
                .ended_at(9)
                .with_attribute(
                    "chat.usage",
                    serde_json::json!({"input_tokens": n, "output_tokens": 2, "total_tokens": n + 2}),
                ),
        )
}

#[test]
fn test_deleted_traces_stay_deleted_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");

    let experiment;
    {
        let db = Database::builder().path(&path).strict().open().unwrap();
        experiment = db
            .create_experiment(&sys(), "recovery", BTreeMap::new())
            .unwrap();
        for n in 0..300 {
            db.log_trace(&sys(), trace(&experiment, n)).unwrap();
        }
        let deleted = db
            .delete_traces(
                &sys(),
                &DeleteTracesRequest::older_than(experiment.as_str(), 1_100).with_max_traces(60),
            )
            .unwrap();
        assert_eq!(deleted, 60);
        let deleted = db
            .delete_traces(
                &sys(),
                &DeleteTracesRequest::by_ids(experiment.as_str(), ["trace-00299", "missing"]),
            )
            .unwrap();
        assert_eq!(deleted, 1);
    }

    let db = Database::builder().path(&path).strict().open().unwrap();
    assert_eq!(db.count_traces(&sys(), &experiment).unwrap(), 239);

    // Verify every trace, not a sample
    for n in 0..300 {
        let found = db.get_trace(&sys(), &id(n)).unwrap();
        if n < 60 || n == 299 {
            assert!(found.is_none(), "trace {} should be deleted", n);
        } else {
            let found = found.unwrap();
            assert_eq!(found.info.timestamp_ms, 1_000 + n);
            assert_eq!(found.info.status, TraceStatus::Ok);
            assert_eq!(found.spans.len(), 2);
            assert_eq!(found.token_usage().unwrap().input_tokens, n);
        }
    }
}

#[test]
fn test_lifecycle_and_grants_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    let alice = Principal::new("alice");

    let experiment;
    {
        let db = Database::builder()
            .path(&path)
            .buffered_with(1_000)
            .open()
            .unwrap();
        experiment = db
            .create_experiment(&sys(), "grants", BTreeMap::new())
            .unwrap();
        db.grant_permission(&sys(), &experiment, &alice, Permission::Read)
            .unwrap();
        let info = db
            .start_trace(&sys(), &experiment, BTreeMap::new(), BTreeMap::new())
            .unwrap();
        db.set_trace_tag(&sys(), &info.trace_id, "k", "v").unwrap();
        db.delete_experiment(&sys(), &experiment).unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.effective_permission(&alice, &experiment), Permission::Read);
    assert!(!db.get_experiment(&sys(), &experiment).unwrap().is_active());
    assert_eq!(db.list_experiments(&sys(), false).len(), 1);

    // Next allocated id continues after the replayed ones
    let next = db
        .create_experiment(&sys(), "after-reopen", BTreeMap::new())
        .unwrap();
    assert_eq!(next.index(), Some(experiment.index().unwrap() + 1));
}

#[test]
fn test_torn_tail_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    {
        let db = Database::builder().path(&path).strict().open().unwrap();
        for n in 0..10 {
            db.log_trace(&sys(), trace(&ExperimentId::default_experiment(), n))
                .unwrap();
        }
    }

    // A crash mid-append leaves a partial frame
    let mut wal = OpenOptions::new()
        .append(true)
        .open(path.join(WAL_FILE_NAME))
        .unwrap();
    wal.write_all(&[200, 0, 0, 0, 1, 2, 3]).unwrap();
    drop(wal);

    let db = Database::open(&path).unwrap();
    assert_eq!(
        db.count_traces(&sys(), &ExperimentId::default_experiment())
            .unwrap(),
        10
    );
}

#[test]
fn test_corruption_beyond_budget_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    {
        let db = Database::builder().path(&path).strict().open().unwrap();
        for n in 0..5 {
            db.log_trace(&sys(), trace(&ExperimentId::default_experiment(), n))
                .unwrap();
        }
    }

    // Flip a byte near the start of the log, inside the first payload
    let wal_path = path.join(WAL_FILE_NAME);
    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes[12] ^= 0xff;
    std::fs::write(&wal_path, &bytes).unwrap();

    let err = Database::open(&path).err().unwrap();
    assert!(err.is_service());

    let db = Database::builder()
        .path(&path)
        .max_corrupt_wal_records(1)
        .open()
        .unwrap();
    // The default experiment record was the corrupt one; it is recreated
    assert_eq!(db.list_experiments(&sys(), false).len(), 1);
}

#[test]
fn test_read_only_reopen_refuses_deletion() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    {
        let db = Database::open(&path).unwrap();
        db.log_trace(&sys(), trace(&ExperimentId::default_experiment(), 1))
            .unwrap();
    }

    let db = Database::builder().path(&path).read_only().open().unwrap();
    let err = db
        .delete_traces(&sys(), &DeleteTracesRequest::older_than("0", i64::MAX))
        .unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(
        db.count_traces(&sys(), &ExperimentId::default_experiment())
            .unwrap(),
        1
    );
}

#[test]
fn test_read_only_open_leaves_files_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    {
        let db = Database::builder().path(&path).strict().open().unwrap();
        for n in 0..3 {
            db.log_trace(&sys(), trace(&ExperimentId::default_experiment(), n))
                .unwrap();
        }
    }

    let wal_path = path.join(WAL_FILE_NAME);
    let mut wal = OpenOptions::new().append(true).open(&wal_path).unwrap();
    wal.write_all(&[200, 0, 0, 0, 1, 2, 3]).unwrap();
    drop(wal);
    let before = std::fs::read(&wal_path).unwrap();

    {
        let db = Database::builder().path(&path).read_only().open().unwrap();
        assert_eq!(
            db.count_traces(&sys(), &ExperimentId::default_experiment())
                .unwrap(),
            3
        );
        db.flush().unwrap();
    }
    assert_eq!(std::fs::read(&wal_path).unwrap(), before);

    let missing = temp_dir.path().join("missing");
    let err = Database::builder()
        .path(&missing)
        .read_only()
        .open()
        .err()
        .unwrap();
    assert!(err.is_not_found());
    assert!(!missing.exists());
}

#[test]
fn test_in_memory_mode_keeps_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    {
        let db = Database::builder().path(&path).in_memory().open().unwrap();
        assert_eq!(db.durability_mode(), DurabilityMode::InMemory);
        db.log_trace(&sys(), trace(&ExperimentId::default_experiment(), 1))
            .unwrap();
    }
    assert!(!path.join(WAL_FILE_NAME).exists());
    let db = Database::open(&path).unwrap();
    assert_eq!(
        db.count_traces(&sys(), &ExperimentId::default_experiment())
            .unwrap(),
        0
    );
}

//! Caller-side batching: repeat capped deletes until a short batch.

use crate::*;
use std::time::Duration;

#[test]
fn test_manual_batch_loop() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 250);

    let mut calls = 0;
    let mut total = 0;
    loop {
        let n = db.traces.delete_older_than(&exp, 200, Some(64)).unwrap();
        calls += 1;
        total += n;
        if n < 64 {
            break;
        }
    }
    assert_eq!(total, 200);
    assert_eq!(calls, 4);
    assert_eq!(db.traces.count(&exp).unwrap(), 50);
}

#[test]
fn test_purge_default_batch() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 150);

    let report = db.traces.purge(&exp, 100).unwrap();
    assert_eq!(report, PurgeReport { batches: 1, deleted: 100 });
}

#[test]
fn test_purge_with_pause() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 20);

    let purge = BatchPurge::new(exp.clone(), 20)
        .batch_size(5)
        .pause(Duration::from_millis(1));
    let report = db.traces.purge_with(&purge).unwrap();
    assert_eq!(report, PurgeReport { batches: 5, deleted: 20 });
    assert_eq!(db.traces.count(&exp).unwrap(), 0);
}

#[test]
fn test_purge_nothing_to_do() {
    let db = Tracebase::ephemeral().unwrap();
    let report = db.traces.purge(&default_exp(), 100).unwrap();
    assert_eq!(report, PurgeReport { batches: 1, deleted: 0 });
}

//! Concurrent deleters never double-count or lose a trace.

use crate::*;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::thread;

#[test]
fn test_parallel_capped_deleters_partition_the_backlog() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();

    let mut timestamps: Vec<u64> = (0..400).collect();
    timestamps.shuffle(&mut rand::thread_rng());
    for ts in timestamps {
        db.traces.log(NewTrace::new(exp.clone()).at(ts)).unwrap();
    }

    let totals = Arc::new(Mutex::new(Vec::new()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let exp = exp.clone();
            let totals = Arc::clone(&totals);
            thread::spawn(move || {
                let mut mine = 0;
                loop {
                    let n = db.traces.delete_older_than(&exp, 300, Some(7)).unwrap();
                    mine += n;
                    if n == 0 {
                        break;
                    }
                }
                totals.lock().push(mine);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let sum: u64 = totals.lock().iter().sum();
    assert_eq!(sum, 300);
    assert_eq!(db.traces.count(&exp).unwrap(), 100);
}

#[test]
fn test_delete_while_logging() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 100);

    let writer = {
        let db = db.clone();
        let exp = exp.clone();
        thread::spawn(move || {
            for ts in 1_000..1_100 {
                db.traces.log(NewTrace::new(exp.clone()).at(ts)).unwrap();
            }
        })
    };
    let deleted = db.traces.delete_older_than(&exp, 100, None).unwrap();
    writer.join().unwrap();

    assert_eq!(deleted, 100);
    assert_eq!(db.traces.count(&exp).unwrap(), 100);
}

#[test]
fn test_overlapping_id_deletes_count_each_trace_once() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    let ids: Vec<String> = seed(&db, &exp, 50)
        .into_iter()
        .map(|id| id.to_string())
        .collect();

    let totals = Arc::new(Mutex::new(0u64));
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let db = db.clone();
            let exp = exp.clone();
            let ids = ids.clone();
            let totals = Arc::clone(&totals);
            thread::spawn(move || {
                let n = db.traces.delete_ids(&exp, ids).unwrap();
                *totals.lock() += n;
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*totals.lock(), 50);
}

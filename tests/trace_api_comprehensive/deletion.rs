//! Deletion semantics: selection order, caps, counts and isolation.

use crate::*;

#[test]
fn test_capped_cutoff_deletes_oldest_first() {
    test_across_modes(|db| {
        let exp = default_exp();
        seed(&db, &exp, 150);

        assert_eq!(db.traces.delete_older_than(&exp, 100, Some(50)).unwrap(), 50);
        assert_eq!(db.traces.delete_older_than(&exp, 100, Some(50)).unwrap(), 50);
        assert_eq!(db.traces.delete_older_than(&exp, 100, Some(50)).unwrap(), 0);
        assert_eq!(db.traces.count(&exp).unwrap(), 50);

        // Survivors are exactly the traces at or after the cutoff
        let page = db
            .traces
            .search(
                &SearchTraces::new([exp.clone()])
                    .order(TraceOrder::TimestampAsc)
                    .max_results(500),
            )
            .unwrap();
        let timestamps: Vec<u64> = page.traces.iter().map(|t| t.timestamp_ms).collect();
        assert_eq!(timestamps, (100..150).collect::<Vec<_>>());
    });
}

#[test]
fn test_first_capped_batch_takes_the_oldest() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    let ids = seed(&db, &exp, 10);

    assert_eq!(db.traces.delete_older_than(&exp, 100, Some(3)).unwrap(), 3);
    for id in &ids[..3] {
        assert!(db.traces.get(id).unwrap().is_none());
    }
    for id in &ids[3..] {
        assert!(db.traces.get(id).unwrap().is_some());
    }
}

#[test]
fn test_cutoff_is_strict() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 10);

    // Trace at ts=5 is not older than 5
    assert_eq!(db.traces.delete_older_than(&exp, 5, None).unwrap(), 5);
    assert_eq!(db.traces.count(&exp).unwrap(), 5);
}

#[test]
fn test_zero_cutoff_deletes_nothing() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 3);
    assert_eq!(db.traces.delete_older_than(&exp, 0, None).unwrap(), 0);
    assert_eq!(db.traces.count(&exp).unwrap(), 3);
}

#[test]
fn test_equal_timestamps_break_ties_by_id() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    for id in ["tr-c", "tr-a", "tr-b"] {
        log_with_id(&db, &exp, id, 7);
    }

    assert_eq!(db.traces.delete_older_than(&exp, 8, Some(2)).unwrap(), 2);
    let a = TraceId::parse("tr-a").unwrap();
    let b = TraceId::parse("tr-b").unwrap();
    let c = TraceId::parse("tr-c").unwrap();
    assert!(db.traces.get(&a).unwrap().is_none());
    assert!(db.traces.get(&b).unwrap().is_none());
    assert!(db.traces.get(&c).unwrap().is_some());
}

#[test]
fn test_delete_by_ids_counts_only_existing() {
    test_across_modes(|db| {
        let exp = default_exp();
        log_with_id(&db, &exp, "a", 1);
        log_with_id(&db, &exp, "c", 2);

        assert_eq!(db.traces.delete_ids(&exp, ["a", "b", "c"]).unwrap(), 2);
        assert_eq!(db.traces.count(&exp).unwrap(), 0);
    });
}

#[test]
fn test_duplicate_ids_count_once() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    log_with_id(&db, &exp, "a", 1);
    assert_eq!(db.traces.delete_ids(&exp, ["a", "a", "a"]).unwrap(), 1);
}

#[test]
fn test_ids_from_other_experiment_untouched() {
    let db = Tracebase::ephemeral().unwrap();
    let other = db.experiments.create("other").unwrap();
    let theirs = log_with_id(&db, &other, "theirs", 1);

    assert_eq!(db.traces.delete_ids(&default_exp(), ["theirs"]).unwrap(), 0);
    assert!(db.traces.get(&theirs).unwrap().is_some());
}

#[test]
fn test_cutoff_scoped_to_experiment() {
    let db = Tracebase::ephemeral().unwrap();
    let other = db.experiments.create("other").unwrap();
    seed(&db, &default_exp(), 5);
    seed(&db, &other, 5);

    assert_eq!(db.traces.delete_older_than(&default_exp(), 100, None).unwrap(), 5);
    assert_eq!(db.traces.count(&other).unwrap(), 5);
}

#[test]
fn test_second_delete_of_same_ids_is_zero() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    log_with_id(&db, &exp, "x", 1);
    assert_eq!(db.traces.delete_ids(&exp, ["x"]).unwrap(), 1);
    assert_eq!(db.traces.delete_ids(&exp, ["x"]).unwrap(), 0);
}

#[test]
fn test_deleted_trace_tags_unreachable() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    let id = log_with_id(&db, &exp, "gone", 1);
    db.traces.delete_ids(&exp, ["gone"]).unwrap();

    let err = db.traces.set_tag(&id, "k", "v").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_in_progress_traces_are_selected_by_cutoff() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    let started = db.traces.start(&exp).unwrap();
    let cutoff = started.timestamp_ms as i64 + 1;

    assert_eq!(db.traces.delete_older_than(&exp, cutoff, None).unwrap(), 1);
    assert!(db.traces.get(&started.trace_id).unwrap().is_none());
}

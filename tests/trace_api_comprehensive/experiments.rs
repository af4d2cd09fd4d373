//! Experiment lifecycle as it affects trace deletion.

use crate::*;

#[test]
fn test_default_experiment_exists() {
    test_across_modes(|db| {
        let exp = db.experiments.get(&default_exp()).unwrap();
        assert_eq!(exp.name, "Default");
        assert!(exp.is_active());
    });
}

#[test]
fn test_created_ids_increase() {
    let db = Tracebase::ephemeral().unwrap();
    let a = db.experiments.create("a").unwrap();
    let b = db.experiments.create("b").unwrap();
    assert!(a.index().unwrap() < b.index().unwrap());
}

#[test]
fn test_duplicate_name_rejected() {
    let db = Tracebase::ephemeral().unwrap();
    db.experiments.create("dup").unwrap();
    assert!(db.experiments.create("dup").unwrap_err().is_invalid_argument());
}

#[test]
fn test_deleted_experiment_rejects_trace_deletion() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = db.experiments.create("short-lived").unwrap();
    seed(&db, &exp, 3);
    db.experiments.delete(&exp).unwrap();

    let err = db.traces.delete_older_than(&exp, 100, None).unwrap_err();
    assert!(err.is_not_found());
    assert!(db.traces.count(&exp).unwrap_err().is_not_found());
}

#[test]
fn test_restore_brings_traces_back() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = db.experiments.create("revived").unwrap();
    seed(&db, &exp, 3);
    db.experiments.delete(&exp).unwrap();
    db.experiments.restore(&exp).unwrap();

    assert_eq!(db.traces.count(&exp).unwrap(), 3);
    assert_eq!(db.traces.delete_older_than(&exp, 100, None).unwrap(), 3);
}

#[test]
fn test_restore_active_is_invalid() {
    let db = Tracebase::ephemeral().unwrap();
    assert!(db
        .experiments
        .restore(&default_exp())
        .unwrap_err()
        .is_invalid_argument());
}

#[test]
fn test_list_hides_deleted_unless_asked() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = db.experiments.create("hidden").unwrap();
    db.experiments.delete(&exp).unwrap();

    assert!(db.experiments.list().unwrap().iter().all(|e| e.experiment_id != exp));
    assert!(db.experiments.list_all().unwrap().iter().any(|e| e.experiment_id == exp));
}

#[test]
fn test_get_by_name() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = db
        .experiments
        .create_with_tags("named", [("team", "search")])
        .unwrap();
    let found = db.experiments.get_by_name("named").unwrap().unwrap();
    assert_eq!(found.experiment_id, exp);
    assert_eq!(found.tags.get("team").map(String::as_str), Some("search"));
    assert!(db.experiments.get_by_name("missing").unwrap().is_none());
}

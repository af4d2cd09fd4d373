//! Only principals with MANAGE may delete traces.

use crate::*;

fn restricted_db() -> Tracebase {
    Tracebase::builder()
        .in_memory()
        .default_permission(Permission::Read)
        .open()
        .unwrap()
}

#[test]
fn test_reader_denied() {
    let db = restricted_db();
    seed(&db, &default_exp(), 3);
    let bob = db.as_user("bob");

    let err = bob.traces.delete_older_than(&default_exp(), 100, None).unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(db.traces.count(&default_exp()).unwrap(), 3);
}

#[test]
fn test_editor_denied() {
    let db = restricted_db();
    seed(&db, &default_exp(), 3);
    db.experiments.grant(&default_exp(), "eve", Permission::Edit).unwrap();
    let eve = db.as_user("eve");

    // Editors can log but not delete
    eve.traces.log(NewTrace::new(default_exp())).unwrap();
    let err = eve.traces.delete_ids(&default_exp(), ["anything"]).unwrap_err();
    assert!(err.is_permission_denied());
}

#[test]
fn test_manager_allowed() {
    let db = restricted_db();
    seed(&db, &default_exp(), 3);
    db.experiments.grant(&default_exp(), "mia", Permission::Manage).unwrap();

    let mia = db.as_user("mia");
    assert_eq!(mia.traces.delete_older_than(&default_exp(), 100, None).unwrap(), 3);
}

#[test]
fn test_revoke_removes_access() {
    let db = restricted_db();
    seed(&db, &default_exp(), 2);
    db.experiments.grant(&default_exp(), "mia", Permission::Manage).unwrap();
    assert!(db.experiments.revoke(&default_exp(), "mia").unwrap());
    assert!(!db.experiments.revoke(&default_exp(), "mia").unwrap());

    let mia = db.as_user("mia");
    assert!(mia
        .traces
        .delete_older_than(&default_exp(), 100, None)
        .unwrap_err()
        .is_permission_denied());
}

#[test]
fn test_creator_manages_own_experiment() {
    let db = restricted_db();
    let carol = db.as_user("carol");
    let exp = carol.experiments.create("carol-exp").unwrap();
    seed(&carol, &exp, 4);
    assert_eq!(carol.traces.delete_older_than(&exp, 2, None).unwrap(), 2);
}

#[test]
fn test_users_cannot_grant() {
    let db = restricted_db();
    let carol = db.as_user("carol");
    let err = carol
        .experiments
        .grant(&default_exp(), "carol", Permission::Manage)
        .unwrap_err();
    assert!(err.is_permission_denied());
}

#[test]
fn test_read_only_database_refuses_deletion() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Tracebase::open(dir.path()).unwrap();
        seed(&db, &default_exp(), 2);
        db.close().unwrap();
    }
    let db = Tracebase::builder().path(dir.path()).read_only().open().unwrap();
    let err = db.traces.delete_older_than(&default_exp(), 100, None).unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(db.traces.count(&default_exp()).unwrap(), 2);
}

#[test]
fn test_permission_checked_after_existence() {
    let db = restricted_db();
    let bob = db.as_user("bob");
    let err = bob
        .traces
        .delete_older_than(&ExperimentId::new("nope"), 100, None)
        .unwrap_err();
    assert!(err.is_not_found());
}

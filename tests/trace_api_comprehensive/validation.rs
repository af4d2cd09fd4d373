//! Request validation: every rejected combination, before any lookup.

use crate::*;

fn request(
    exp: &str,
    cutoff: Option<i64>,
    ids: Option<Vec<&str>>,
    max: Option<i64>,
) -> DeleteTracesRequest {
    DeleteTracesRequest {
        experiment_id: exp.to_string(),
        max_timestamp_millis: cutoff,
        trace_ids: ids.map(|v| v.into_iter().map(String::from).collect()),
        max_traces: max,
    }
}

fn assert_invalid(db: &Tracebase, req: DeleteTracesRequest) {
    let err = db.traces.delete(&req).unwrap_err();
    assert!(err.is_invalid_argument(), "expected InvalidArgument for {:?}, got {:?}", req, err);
    assert_eq!(err.code(), ErrorCode::InvalidParameterValue);
}

#[test]
fn test_neither_selector() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", None, None, None));
}

#[test]
fn test_both_selectors() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", Some(1), Some(vec!["a"]), None));
}

#[test]
fn test_max_traces_with_ids() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", None, Some(vec!["a"]), Some(5)));
}

#[test]
fn test_non_positive_max_traces() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", Some(1), None, Some(0)));
    assert_invalid(&db, request("0", Some(1), None, Some(-3)));
}

#[test]
fn test_negative_cutoff() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", Some(-1), None, None));
}

#[test]
fn test_empty_id_list_counts_as_absent() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("0", None, Some(vec![]), None));
}

#[test]
fn test_blank_experiment_id() {
    let db = Tracebase::ephemeral().unwrap();
    assert_invalid(&db, request("", Some(1), None, None));
}

#[test]
fn test_validation_precedes_existence_check() {
    let db = Tracebase::ephemeral().unwrap();
    // Unknown experiment and a bad request: the request error wins
    assert_invalid(&db, request("nope", None, None, None));
}

#[test]
fn test_unknown_experiment_is_not_found() {
    let db = Tracebase::ephemeral().unwrap();
    let err = db.traces.delete_older_than(&ExperimentId::new("nope"), 100, None).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), ErrorCode::ResourceDoesNotExist);
}

#[test]
fn test_rejected_request_changes_nothing() {
    let db = Tracebase::ephemeral().unwrap();
    seed(&db, &default_exp(), 5);
    let before = db.info().version;
    assert_invalid(&db, request("0", Some(10), Some(vec!["a"]), None));
    assert_eq!(db.traces.count(&default_exp()).unwrap(), 5);
    assert_eq!(db.info().version, before);
}

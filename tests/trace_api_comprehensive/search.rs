//! Search reflects deletions immediately.

use crate::*;

#[test]
fn test_deleted_traces_leave_search() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    seed(&db, &exp, 10);
    db.traces.delete_older_than(&exp, 4, None).unwrap();

    let page = db
        .traces
        .search(&SearchTraces::new([exp]).max_results(100))
        .unwrap();
    assert_eq!(page.traces.len(), 6);
    assert!(page.traces.iter().all(|t| t.timestamp_ms >= 4));
    assert!(page.next_page_token.is_none());
}

#[test]
fn test_newest_first_by_default() {
    let db = Tracebase::ephemeral().unwrap();
    seed(&db, &default_exp(), 5);
    let page = db
        .traces
        .search(&SearchTraces::new([default_exp()]))
        .unwrap();
    let ts: Vec<u64> = page.traces.iter().map(|t| t.timestamp_ms).collect();
    assert_eq!(ts, vec![4, 3, 2, 1, 0]);
}

#[test]
fn test_paging_walks_everything_once() {
    let db = Tracebase::ephemeral().unwrap();
    seed(&db, &default_exp(), 7);

    let mut seen = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let mut request = SearchTraces::new([default_exp()]).max_results(3);
        if let Some(t) = token.take() {
            request = request.page_token(t);
        }
        let page = db.traces.search(&request).unwrap();
        seen.extend(page.traces.iter().map(|t| t.trace_id.clone()));
        match page.next_page_token {
            Some(t) => token = Some(t),
            None => break,
        }
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
}

#[test]
fn test_filter_by_tag_then_delete_matches() {
    let db = Tracebase::ephemeral().unwrap();
    let exp = default_exp();
    for ts in 0..6 {
        let env = if ts % 2 == 0 { "prod" } else { "dev" };
        db.traces
            .log(NewTrace::new(exp.clone()).at(ts).tag("env", env))
            .unwrap();
    }

    let dev = db
        .traces
        .search(&SearchTraces::new([exp.clone()]).filter(TraceFilter::new().tag("env", "dev")))
        .unwrap();
    let ids: Vec<String> = dev.traces.iter().map(|t| t.trace_id.to_string()).collect();
    assert_eq!(ids.len(), 3);

    assert_eq!(db.traces.delete_ids(&exp, ids).unwrap(), 3);
    let rest = db
        .traces
        .search(&SearchTraces::new([exp]).filter(TraceFilter::new().tag("env", "dev")))
        .unwrap();
    assert!(rest.traces.is_empty());
}

#[test]
fn test_search_over_missing_experiment() {
    let db = Tracebase::ephemeral().unwrap();
    let err = db
        .traces
        .search(&SearchTraces::new(["nope"]))
        .unwrap_err();
    assert!(err.is_not_found());
}

//! Deletions survive reopen in every durable mode.

use crate::*;

fn reopen_after_capped_delete(builder: fn(&std::path::Path) -> TracebaseBuilder) {
    let dir = tempfile::tempdir().unwrap();
    let (deleted_ids, kept_ids) = {
        let db = builder(dir.path()).open().unwrap();
        let ids = seed(&db, &default_exp(), 150);
        assert_eq!(db.traces.delete_older_than(&default_exp(), 100, Some(50)).unwrap(), 50);
        db.close().unwrap();
        (ids[..50].to_vec(), ids[50..].to_vec())
    };

    let db = builder(dir.path()).open().unwrap();
    assert_eq!(db.traces.count(&default_exp()).unwrap(), 100);
    for id in &deleted_ids {
        assert!(db.traces.get(id).unwrap().is_none(), "{} came back", id);
    }
    for id in &kept_ids {
        assert!(db.traces.get(id).unwrap().is_some());
    }

    // The next capped call continues where the first left off
    assert_eq!(db.traces.delete_older_than(&default_exp(), 100, Some(50)).unwrap(), 50);
    assert_eq!(db.traces.delete_older_than(&default_exp(), 100, Some(50)).unwrap(), 0);
}

#[test]
fn test_strict_deletions_survive_reopen() {
    reopen_after_capped_delete(|p| Tracebase::builder().path(p).strict());
}

#[test]
fn test_buffered_deletions_survive_reopen() {
    reopen_after_capped_delete(|p| Tracebase::builder().path(p).buffered_with(8));
}

#[test]
fn test_delete_by_ids_survives_drop_without_close() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Tracebase::builder().path(dir.path()).strict().open().unwrap();
        log_with_id(&db, &default_exp(), "keep", 1);
        log_with_id(&db, &default_exp(), "drop", 2);
        assert_eq!(db.traces.delete_ids(&default_exp(), ["drop", "ghost"]).unwrap(), 1);
    }

    let db = Tracebase::open(dir.path()).unwrap();
    assert!(db.traces.get(&TraceId::parse("drop").unwrap()).unwrap().is_none());
    assert!(db.traces.get(&TraceId::parse("keep").unwrap()).unwrap().is_some());
}

#[test]
fn test_experiment_ids_not_reused_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let first = {
        let db = Tracebase::open(dir.path()).unwrap();
        db.experiments.create("one").unwrap()
    };
    let db = Tracebase::open(dir.path()).unwrap();
    let second = db.experiments.create("two").unwrap();
    assert_ne!(first, second);
    assert_eq!(db.experiments.get(&first).unwrap().name, "one");
}

#[test]
fn test_ephemeral_writes_nothing() {
    let db = Tracebase::ephemeral().unwrap();
    assert!(db.is_ephemeral());
    assert!(db.path().is_none());
    assert_eq!(db.durability_mode(), DurabilityMode::InMemory);
}

#[test]
fn test_chat_attributes_survive_reopen() {
    use tracebase::ChatMessage;

    let dir = tempfile::tempdir().unwrap();
    let mut span = Span::new(1, "llm", 0);
    span.set_chat_messages(&[ChatMessage::new("user", "what is 1 + 1?")], false)
        .unwrap();
    span.set_chat_messages(&[ChatMessage::new("assistant", "2")], true)
        .unwrap();
    let id = {
        let db = Tracebase::builder().path(dir.path()).strict().open().unwrap();
        let info = db
            .traces
            .log(NewTrace::new(default_exp()).at(1).span(span.clone()))
            .unwrap();
        info.trace_id
    };

    let db = Tracebase::open(dir.path()).unwrap();
    let trace = db.traces.get(&id).unwrap().unwrap();
    let messages = trace.spans[0].chat_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(trace.spans[0], span);
}

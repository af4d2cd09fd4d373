//! Trace logging, reading and tagging

use crate::database::Database;
use std::collections::BTreeMap;
use tracebase_core::{
    deduplicate_span_names, now_millis, validate_tag_key, Error, ExperimentId, NewTrace, Result,
    Span, Trace, TraceId, TraceInfo, TraceStatus,
};
use tracebase_durability::WalRecord;
use tracebase_security::{Permission, Principal};
use tracing::debug;

impl Database {
    /// Store a trace
    ///
    /// The timestamp defaults to now and the id to a generated one. Span
    /// names repeated within the trace are suffixed `_1`, `_2`, ...
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: the id is already used, or a tag key is invalid
    /// - `NotFound`: the experiment is missing or deleted
    /// - `PermissionDenied`: no `Edit` on the experiment, or read-only database
    pub fn log_trace(&self, principal: &Principal, new: NewTrace) -> Result<TraceInfo> {
        for key in new.tags.keys() {
            validate_tag_key(key)?;
        }
        self.check_writable()?;

        let guard = self.lock_commit();
        self.resolve_active(&new.experiment_id)?;
        self.authorize(principal, &new.experiment_id, Permission::Edit)?;

        let trace_id = match new.trace_id {
            Some(id) if self.store.contains(&id) => {
                return Err(Error::invalid_argument(format!(
                    "trace '{}' already exists",
                    id
                )));
            }
            Some(id) => id,
            None => TraceId::generate(),
        };

        let mut spans = new.spans;
        deduplicate_span_names(&mut spans);
        let trace = Trace {
            info: TraceInfo {
                trace_id,
                experiment_id: new.experiment_id,
                timestamp_ms: new.timestamp_ms.unwrap_or_else(now_millis),
                execution_time_ms: new.execution_time_ms,
                status: new.status,
                request_metadata: new.request_metadata,
                tags: new.tags,
            },
            spans,
        };
        let info = trace.info.clone();
        self.commit(&guard, WalRecord::PutTrace { trace })?;
        debug!(trace = %info.trace_id, experiment = %info.experiment_id, "trace logged");
        Ok(info)
    }

    /// Open an in-progress trace stamped with the current time
    pub fn start_trace(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        request_metadata: BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
    ) -> Result<TraceInfo> {
        let mut new = NewTrace::new(experiment_id.clone()).status(TraceStatus::InProgress);
        new.request_metadata = request_metadata;
        new.tags = tags;
        self.log_trace(principal, new)
    }

    /// Finish an in-progress trace
    ///
    /// `spans` are appended to any already recorded. The execution time is
    /// `end_time_ms` (default now) minus the trace timestamp.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the trace is not in progress or `status` is
    /// not `OK`/`ERROR`.
    pub fn end_trace(
        &self,
        principal: &Principal,
        trace_id: &TraceId,
        status: TraceStatus,
        spans: Vec<Span>,
        end_time_ms: Option<u64>,
    ) -> Result<TraceInfo> {
        if !status.is_terminal() {
            return Err(Error::invalid_argument(format!(
                "a trace must end with OK or ERROR, got {}",
                status
            )));
        }
        self.check_writable()?;

        let guard = self.lock_commit();
        let mut trace = self.visible_trace(trace_id)?;
        self.authorize(principal, &trace.info.experiment_id, Permission::Edit)?;
        if trace.info.status != TraceStatus::InProgress {
            return Err(Error::invalid_argument(format!(
                "trace '{}' is not in progress",
                trace_id
            )));
        }

        let end = end_time_ms.unwrap_or_else(now_millis);
        trace.info.status = status;
        trace.info.execution_time_ms = Some(end.saturating_sub(trace.info.timestamp_ms));
        trace.spans.extend(spans);
        deduplicate_span_names(&mut trace.spans);

        let info = trace.info.clone();
        self.commit(&guard, WalRecord::PutTrace { trace })?;
        Ok(info)
    }

    /// Fetch a trace; `None` when it does not exist or its experiment is deleted
    pub fn get_trace(&self, principal: &Principal, trace_id: &TraceId) -> Result<Option<Trace>> {
        let Some(trace) = self.store.get(trace_id) else {
            return Ok(None);
        };
        if self.resolve_active(&trace.info.experiment_id).is_err() {
            return Ok(None);
        }
        self.authorize(principal, &trace.info.experiment_id, Permission::Read)?;
        Ok(Some(trace))
    }

    /// Set one tag on a trace, replacing any previous value
    pub fn set_trace_tag(
        &self,
        principal: &Principal,
        trace_id: &TraceId,
        key: &str,
        value: &str,
    ) -> Result<()> {
        validate_tag_key(key)?;
        self.check_writable()?;

        let guard = self.lock_commit();
        let trace = self.visible_trace(trace_id)?;
        self.authorize(principal, &trace.info.experiment_id, Permission::Edit)?;
        self.commit(
            &guard,
            WalRecord::SetTraceTag {
                trace_id: trace_id.clone(),
                key: key.to_string(),
                value: value.to_string(),
            },
        )?;
        Ok(())
    }

    /// Remove one tag from a trace
    ///
    /// # Errors
    ///
    /// `NotFound` when the trace or the tag does not exist.
    pub fn delete_trace_tag(&self, principal: &Principal, trace_id: &TraceId, key: &str) -> Result<()> {
        self.check_writable()?;

        let guard = self.lock_commit();
        let trace = self.visible_trace(trace_id)?;
        self.authorize(principal, &trace.info.experiment_id, Permission::Edit)?;
        if !trace.info.tags.contains_key(key) {
            return Err(Error::not_found(format!(
                "tag '{}' on trace '{}'",
                key, trace_id
            )));
        }
        self.commit(
            &guard,
            WalRecord::DeleteTraceTag {
                trace_id: trace_id.clone(),
                key: key.to_string(),
            },
        )?;
        Ok(())
    }

    /// Number of traces stored in an experiment
    pub fn count_traces(&self, principal: &Principal, experiment_id: &ExperimentId) -> Result<u64> {
        self.resolve_active(experiment_id)?;
        self.authorize(principal, experiment_id, Permission::Read)?;
        Ok(self.store.count(experiment_id) as u64)
    }

    /// Snapshot of every trace in the given experiments, oldest first per experiment
    ///
    /// Each experiment must be active and readable by `principal`.
    pub fn scan_traces(
        &self,
        principal: &Principal,
        experiment_ids: &[ExperimentId],
    ) -> Result<Vec<Trace>> {
        let mut traces = Vec::new();
        for experiment_id in experiment_ids {
            self.resolve_active(experiment_id)?;
            self.authorize(principal, experiment_id, Permission::Read)?;
            traces.extend(self.store.traces(experiment_id));
        }
        Ok(traces)
    }

    /// Stored trace whose experiment is active, or `NotFound`
    fn visible_trace(&self, trace_id: &TraceId) -> Result<Trace> {
        let trace = self
            .store
            .get(trace_id)
            .ok_or_else(|| Error::not_found(format!("trace '{}'", trace_id)))?;
        self.resolve_active(&trace.info.experiment_id)
            .map_err(|_| Error::not_found(format!("trace '{}'", trace_id)))?;
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::ephemeral().unwrap()
    }

    fn sys() -> Principal {
        Principal::system()
    }

    fn default_exp() -> ExperimentId {
        ExperimentId::default_experiment()
    }

    #[test]
    fn test_log_and_get() {
        let db = db();
        let info = db
            .log_trace(&sys(), NewTrace::new("0").at(10).tag("env", "prod"))
            .unwrap();
        assert!(info.trace_id.as_str().starts_with("tr-"));
        let trace = db.get_trace(&sys(), &info.trace_id).unwrap().unwrap();
        assert_eq!(trace.info.timestamp_ms, 10);
        assert_eq!(trace.info.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(db.count_traces(&sys(), &default_exp()).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let db = db();
        let id = TraceId::parse("t1").unwrap();
        db.log_trace(&sys(), NewTrace::new("0").with_id(id.clone()))
            .unwrap();
        let err = db
            .log_trace(&sys(), NewTrace::new("0").with_id(id))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_log_into_missing_experiment() {
        let db = db();
        let err = db.log_trace(&sys(), NewTrace::new("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_span_names_deduplicated_on_ingest() {
        let db = db();
        let info = db
            .log_trace(
                &sys(),
                NewTrace::new("0")
                    .span(Span::new(1, "llm", 0))
                    .span(Span::new(2, "llm", 1))
                    .span(Span::new(3, "parse", 2)),
            )
            .unwrap();
        let trace = db.get_trace(&sys(), &info.trace_id).unwrap().unwrap();
        let names: Vec<_> = trace.spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["llm_1", "llm_2", "parse"]);
    }

    #[test]
    fn test_start_and_end_trace() {
        let db = db();
        let info = db
            .start_trace(&sys(), &default_exp(), BTreeMap::new(), BTreeMap::new())
            .unwrap();
        assert_eq!(info.status, TraceStatus::InProgress);

        let ended = db
            .end_trace(
                &sys(),
                &info.trace_id,
                TraceStatus::Ok,
                vec![Span::new(1, "root", 0)],
                Some(info.timestamp_ms + 25),
            )
            .unwrap();
        assert_eq!(ended.status, TraceStatus::Ok);
        assert_eq!(ended.execution_time_ms, Some(25));

        let again = db
            .end_trace(&sys(), &info.trace_id, TraceStatus::Ok, vec![], None)
            .unwrap_err();
        assert!(again.is_invalid_argument());
    }

    #[test]
    fn test_end_with_non_terminal_status() {
        let db = db();
        let info = db
            .start_trace(&sys(), &default_exp(), BTreeMap::new(), BTreeMap::new())
            .unwrap();
        let err = db
            .end_trace(&sys(), &info.trace_id, TraceStatus::InProgress, vec![], None)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_tags() {
        let db = db();
        let info = db.log_trace(&sys(), NewTrace::new("0")).unwrap();
        db.set_trace_tag(&sys(), &info.trace_id, "k", "v1").unwrap();
        db.set_trace_tag(&sys(), &info.trace_id, "k", "v2").unwrap();
        let trace = db.get_trace(&sys(), &info.trace_id).unwrap().unwrap();
        assert_eq!(trace.info.tags.get("k").map(String::as_str), Some("v2"));

        db.delete_trace_tag(&sys(), &info.trace_id, "k").unwrap();
        assert!(db
            .delete_trace_tag(&sys(), &info.trace_id, "k")
            .unwrap_err()
            .is_not_found());
        assert!(db
            .set_trace_tag(&sys(), &TraceId::parse("missing").unwrap(), "k", "v")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_traces_of_deleted_experiment_are_invisible() {
        let db = db();
        let exp = db.create_experiment(&sys(), "e", BTreeMap::new()).unwrap();
        let info = db
            .log_trace(&sys(), NewTrace::new(exp.clone()))
            .unwrap();
        db.delete_experiment(&sys(), &exp).unwrap();
        assert!(db.get_trace(&sys(), &info.trace_id).unwrap().is_none());
        assert!(db.count_traces(&sys(), &exp).unwrap_err().is_not_found());

        db.restore_experiment(&sys(), &exp).unwrap();
        assert!(db.get_trace(&sys(), &info.trace_id).unwrap().is_some());
    }

    #[test]
    fn test_reader_cannot_log() {
        let db = Database::builder()
            .default_permission(Permission::Read)
            .open()
            .unwrap();
        let reader = Principal::new("reader");
        let err = db.log_trace(&reader, NewTrace::new("0")).unwrap_err();
        assert!(err.is_permission_denied());
    }
}

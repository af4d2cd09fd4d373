//! Property tests for cutoff selection.

use crate::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn capped_delete_removes_the_oldest_eligible(
        timestamps in prop::collection::vec(0u64..500, 0..80),
        cutoff in 0i64..600,
        cap in prop::option::of(1i64..40),
    ) {
        let db = Tracebase::ephemeral().unwrap();
        let exp = default_exp();
        let mut infos: Vec<TraceInfo> = timestamps
            .iter()
            .map(|ts| db.traces.log(NewTrace::new(exp.clone()).at(*ts)).unwrap())
            .collect();
        infos.sort_by(|a, b| (a.timestamp_ms, &a.trace_id).cmp(&(b.timestamp_ms, &b.trace_id)));

        let eligible: Vec<&TraceInfo> = infos
            .iter()
            .filter(|i| (i.timestamp_ms as i64) < cutoff)
            .collect();
        let expected = match cap {
            Some(c) => eligible.len().min(c as usize),
            None => eligible.len(),
        };

        let deleted = db.traces.delete_older_than(&exp, cutoff, cap).unwrap();
        prop_assert_eq!(deleted as usize, expected);

        for (i, info) in eligible.iter().enumerate() {
            let present = db.traces.get(&info.trace_id).unwrap().is_some();
            prop_assert_eq!(present, i >= expected);
        }
        for info in infos.iter().filter(|i| (i.timestamp_ms as i64) >= cutoff) {
            prop_assert!(db.traces.get(&info.trace_id).unwrap().is_some());
        }
    }

    #[test]
    fn id_delete_counts_intersection(
        present in prop::collection::btree_set("[a-z]{1,4}", 0..20),
        requested in prop::collection::vec("[a-z]{1,4}", 1..20),
    ) {
        let db = Tracebase::ephemeral().unwrap();
        let exp = default_exp();
        for (ts, id) in present.iter().enumerate() {
            log_with_id(&db, &exp, id, ts as u64);
        }
        let unique: std::collections::BTreeSet<&String> = requested.iter().collect();
        let expected = unique.into_iter().filter(|id| present.contains(*id)).count();

        let deleted = db.traces.delete_ids(&exp, requested.clone()).unwrap();
        prop_assert_eq!(deleted as usize, expected);
    }
}

//! Output formatting for human and JSON modes.

use tracebase_core::{Error, Experiment, TraceInfo};
use tracebase_executor::Output;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a command result.
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(output).unwrap_or_default(),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string(&err.to_wire()).unwrap_or_default(),
        OutputMode::Human => format!("(error) {}: {}", err.code(), err),
    }
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Unit => "OK".to_string(),
        Output::Bool(b) => format!("(boolean) {}", b),
        Output::Uint(n) => format!("(integer) {}", n),
        Output::Pong { version } => format!("PONG {}", version),
        Output::DatabaseInfo(info) => format!(
            "path: {}\ndurability: {}\nread_only: {}\nexperiments: {}\ntraces: {}\nversion: {}",
            info.path.as_deref().unwrap_or("(ephemeral)"),
            info.durability,
            info.read_only,
            info.experiments,
            info.traces,
            info.version
        ),
        Output::ExperimentId(id) => format!("\"{}\"", id),
        Output::Experiment(exp) => experiment_line(exp),
        Output::MaybeExperiment(None) | Output::MaybeTrace(None) => "(nil)".to_string(),
        Output::MaybeExperiment(Some(exp)) => experiment_line(exp),
        Output::Experiments(list) if list.is_empty() => "(empty list)".to_string(),
        Output::Experiments(list) => numbered(list.iter().map(experiment_line)),
        Output::TraceInfo(info) => trace_line(info),
        Output::MaybeTrace(Some(trace)) => {
            let mut out = trace_line(&trace.info);
            for span in &trace.spans {
                out.push_str(&format!("\n  span {} {}", span.encoded_id(), span.name));
            }
            out
        }
        Output::TracePage(page) => {
            let mut out = if page.traces.is_empty() {
                "(empty list)".to_string()
            } else {
                numbered(page.traces.iter().map(trace_line))
            };
            if let Some(token) = &page.next_page_token {
                out.push_str(&format!("\nnext page: {}", token));
            }
            out
        }
        Output::TracesDeleted(n) => format!("(integer) {} deleted", n),
        Output::PurgeReport(report) => format!(
            "(integer) {} deleted in {} batches",
            report.deleted, report.batches
        ),
    }
}

fn numbered(lines: impl Iterator<Item = String>) -> String {
    lines
        .enumerate()
        .map(|(i, line)| format!("{}) {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn experiment_line(exp: &Experiment) -> String {
    format!("{} {:?} [{:?}]", exp.experiment_id, exp.name, exp.lifecycle_stage)
}

fn trace_line(info: &TraceInfo) -> String {
    let mut line = format!(
        "{} ts={} status={}",
        info.trace_id, info.timestamp_ms, info.status
    );
    for (k, v) in &info.tags {
        line.push_str(&format!(" {}={}", k, v));
    }
    line
}

//! ArgMatches → Command conversion.
//!
//! Numbers are parsed here; everything the database validates (cutoff
//! sign, selector conflicts, id syntax) is passed through untouched so the
//! error the user sees is the database's own.

use std::collections::BTreeMap;

use clap::ArgMatches;
use tracebase_api::{SearchTraces, TraceFilter, TraceOrder};
use tracebase_core::{DeleteTracesRequest, NewTrace, TraceId, TraceStatus};
use tracebase_executor::Command;
use tracebase_security::Permission;

/// The result of parsing user input.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// A command to execute.
    Execute(Command),
    /// A REPL-only meta-command.
    Meta(MetaCommand),
}

/// REPL meta-commands.
#[derive(Debug, PartialEq)]
pub enum MetaCommand {
    /// Switch principal; `None` goes back to the default.
    User { name: Option<String> },
    Help { command: Option<String> },
    Quit,
    Clear,
}

/// Check for REPL meta-commands before delegating to clap.
pub fn check_meta_command(line: &str) -> Option<MetaCommand> {
    let mut parts = line.trim().split_whitespace();
    match parts.next()? {
        "quit" | "exit" => Some(MetaCommand::Quit),
        "clear" => Some(MetaCommand::Clear),
        "help" => Some(MetaCommand::Help {
            command: parts.next().map(str::to_string),
        }),
        "user" => Some(MetaCommand::User {
            name: parts.next().map(str::to_string),
        }),
        _ => None,
    }
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "ping" => Ok(CliAction::Execute(Command::Ping)),
        "info" => Ok(CliAction::Execute(Command::Info)),
        "flush" => Ok(CliAction::Execute(Command::Flush)),
        "experiment" => parse_experiment(sub_matches).map(CliAction::Execute),
        "permission" => parse_permission(sub_matches).map(CliAction::Execute),
        "trace" => parse_trace(sub_matches).map(CliAction::Execute),
        other => Err(format!("Unknown command: {}", other)),
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn required(m: &ArgMatches, name: &str) -> Result<String, String> {
    m.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing <{}>", name))
}

fn number<T: std::str::FromStr>(m: &ArgMatches, name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    m.get_one::<String>(name)
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| format!("Invalid {}: {}", name, e))
}

fn tags(m: &ArgMatches) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();
    if let Some(values) = m.get_many::<String>("tag") {
        for raw in values {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| format!("Invalid tag '{}': expected KEY=VALUE", raw))?;
            out.insert(key.to_string(), value.to_string());
        }
    }
    Ok(out)
}

fn status(m: &ArgMatches) -> Result<Option<TraceStatus>, String> {
    m.get_one::<String>("status")
        .map(|s| s.parse::<TraceStatus>())
        .transpose()
        .map_err(|e| e.to_string())
}

// =========================================================================
// Experiments
// =========================================================================

fn parse_experiment(matches: &ArgMatches) -> Result<Command, String> {
    let (sub, m) = matches.subcommand().ok_or("No experiment subcommand")?;
    match sub {
        "create" => Ok(Command::ExperimentCreate {
            name: required(m, "name")?,
            tags: tags(m)?,
        }),
        "get" => Ok(Command::ExperimentGet {
            experiment_id: required(m, "id")?,
        }),
        "find" => Ok(Command::ExperimentGetByName {
            name: required(m, "name")?,
        }),
        "list" => Ok(Command::ExperimentList {
            include_deleted: m.get_flag("all"),
        }),
        "delete" => Ok(Command::ExperimentDelete {
            experiment_id: required(m, "id")?,
        }),
        "restore" => Ok(Command::ExperimentRestore {
            experiment_id: required(m, "id")?,
        }),
        other => Err(format!("Unknown experiment subcommand: {}", other)),
    }
}

fn parse_permission(matches: &ArgMatches) -> Result<Command, String> {
    let (sub, m) = matches.subcommand().ok_or("No permission subcommand")?;
    match sub {
        "grant" => {
            let permission = required(m, "level")?
                .parse::<Permission>()
                .map_err(|e| e.to_string())?;
            Ok(Command::PermissionGrant {
                experiment_id: required(m, "experiment")?,
                principal: required(m, "user")?,
                permission,
            })
        }
        "revoke" => Ok(Command::PermissionRevoke {
            experiment_id: required(m, "experiment")?,
            principal: required(m, "user")?,
        }),
        other => Err(format!("Unknown permission subcommand: {}", other)),
    }
}

// =========================================================================
// Traces
// =========================================================================

fn parse_trace(matches: &ArgMatches) -> Result<Command, String> {
    let (sub, m) = matches.subcommand().ok_or("No trace subcommand")?;
    match sub {
        "log" => {
            let mut trace = NewTrace::new(required(m, "experiment")?);
            if let Some(raw) = m.get_one::<String>("id") {
                trace = trace.with_id(TraceId::parse(raw).map_err(|e| e.to_string())?);
            }
            if let Some(ts) = number::<u64>(m, "timestamp")? {
                trace = trace.at(ts);
            }
            if let Some(ms) = number::<u64>(m, "duration")? {
                trace = trace.took(ms);
            }
            if let Some(s) = status(m)? {
                trace = trace.status(s);
            }
            trace.tags = tags(m)?;
            Ok(Command::TraceLog(trace))
        }
        "get" => Ok(Command::TraceGet {
            trace_id: required(m, "id")?,
        }),
        "count" => Ok(Command::TraceCount {
            experiment_id: required(m, "experiment")?,
        }),
        "search" => {
            let experiments: Vec<String> = m
                .get_many::<String>("experiment")
                .map(|v| v.cloned().collect())
                .unwrap_or_default();
            let mut filter = TraceFilter::new();
            if let Some(s) = status(m)? {
                filter = filter.status(s);
            }
            for (key, value) in tags(m)? {
                filter = filter.tag(key, value);
            }
            let mut request = SearchTraces::new(experiments).filter(filter);
            if m.get_flag("oldest-first") {
                request = request.order(TraceOrder::TimestampAsc);
            }
            if let Some(max) = number::<usize>(m, "max")? {
                request = request.max_results(max);
            }
            if let Some(token) = m.get_one::<String>("page-token") {
                request = request.page_token(token.clone());
            }
            Ok(Command::TraceSearch(request))
        }
        "tag" => Ok(Command::TraceSetTag {
            trace_id: required(m, "id")?,
            key: required(m, "key")?,
            value: required(m, "value")?,
        }),
        "untag" => Ok(Command::TraceDeleteTag {
            trace_id: required(m, "id")?,
            key: required(m, "key")?,
        }),
        "delete" => Ok(Command::TraceDelete(DeleteTracesRequest {
            experiment_id: required(m, "experiment")?,
            max_timestamp_millis: number::<i64>(m, "before-ms")?,
            trace_ids: m
                .get_many::<String>("ids")
                .map(|v| v.cloned().collect()),
            max_traces: number::<i64>(m, "max")?,
        })),
        "purge" => Ok(Command::TracePurge {
            experiment_id: required(m, "experiment")?,
            max_timestamp_millis: number::<i64>(m, "before-ms")?
                .ok_or("Missing <before-ms>")?,
            batch_size: number::<u64>(m, "batch")?,
            pause_ms: number::<u64>(m, "pause-ms")?,
        }),
        other => Err(format!("Unknown trace subcommand: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_repl_cli;

    fn parse(line: &str) -> Result<CliAction, String> {
        let args = shlex::split(line).unwrap();
        let matches = build_repl_cli()
            .try_get_matches_from(args)
            .map_err(|e| e.to_string())?;
        matches_to_action(&matches)
    }

    #[test]
    fn test_delete_by_cutoff() {
        let action = parse("trace delete -e 1 --before-ms 100 --max 50").unwrap();
        assert_eq!(
            action,
            CliAction::Execute(Command::TraceDelete(
                DeleteTracesRequest::older_than("1", 100).with_max_traces(50)
            ))
        );
    }

    #[test]
    fn test_delete_by_ids() {
        let action = parse("trace delete -e 1 --ids a,b,c").unwrap();
        assert_eq!(
            action,
            CliAction::Execute(Command::TraceDelete(DeleteTracesRequest::by_ids(
                "1",
                ["a", "b", "c"]
            )))
        );
    }

    #[test]
    fn test_delete_passes_bad_combinations_through() {
        let action = parse("trace delete -e 1 --before-ms -5 --ids a").unwrap();
        match action {
            CliAction::Execute(Command::TraceDelete(req)) => {
                assert_eq!(req.max_timestamp_millis, Some(-5));
                assert!(req.validate().is_err());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_number_is_cli_error() {
        assert!(parse("trace delete -e 1 --before-ms soon").is_err());
    }

    #[test]
    fn test_log_with_tags() {
        let action = parse("trace log -e 0 --timestamp 5 -t env=prod --status error").unwrap();
        match action {
            CliAction::Execute(Command::TraceLog(t)) => {
                assert_eq!(t.timestamp_ms, Some(5));
                assert_eq!(t.status, TraceStatus::Error);
                assert_eq!(t.tags.get("env").map(String::as_str), Some("prod"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_tag_rejected() {
        assert!(parse("experiment create demo --tag novalue").is_err());
    }

    #[test]
    fn test_meta_commands() {
        assert_eq!(check_meta_command("quit"), Some(MetaCommand::Quit));
        assert_eq!(
            check_meta_command("user alice"),
            Some(MetaCommand::User {
                name: Some("alice".into())
            })
        );
        assert_eq!(check_meta_command("trace get x"), None);
    }
}

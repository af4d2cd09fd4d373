//! The clap command tree.
//!
//! Built with the builder API so the same tree parses both the process
//! arguments and each REPL line.

use clap::{Arg, ArgAction, Command};

/// Full CLI, global flags included.
pub fn build_cli() -> Command {
    Command::new("tracebase")
        .about("Experiment trace store with durable trace deletion")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .global(true)
                .help("Database directory (default: .tracebase)"),
        )
        .arg(
            Arg::new("connect")
                .long("connect")
                .value_name("ADDR")
                .global(true)
                .conflicts_with("db")
                .help("Talk to a running server instead of opening a directory"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .value_name("NAME")
                .global(true)
                .help("Principal to act as"),
        )
        .arg(
            Arg::new("read-only")
                .long("read-only")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Open the database read-only"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Print JSON"),
        )
        .subcommands(repl_commands())
        .subcommand(
            Command::new("serve")
                .about("Serve the database over TCP")
                .arg(
                    Arg::new("listen")
                        .long("listen")
                        .value_name("ADDR")
                        .help("Address to bind (default: 127.0.0.1:7717)"),
                )
                .arg(
                    Arg::new("allow-system")
                        .long("allow-system")
                        .action(ArgAction::SetTrue)
                        .help("Accept requests made as the system principal"),
                ),
        )
}

/// Tree used to parse one REPL line.
pub fn build_repl_cli() -> Command {
    Command::new("tracebase")
        .no_binary_name(true)
        .disable_version_flag(true)
        .subcommand_required(true)
        .subcommands(repl_commands())
}

fn repl_commands() -> Vec<Command> {
    vec![
        Command::new("ping").about("Check the database is alive"),
        Command::new("info").about("Show database counters"),
        Command::new("flush").about("Flush buffered WAL records"),
        experiment_command(),
        permission_command(),
        trace_command(),
    ]
}

fn tag_arg() -> Arg {
    Arg::new("tag")
        .long("tag")
        .short('t')
        .value_name("KEY=VALUE")
        .action(ArgAction::Append)
}

fn experiment_arg() -> Arg {
    Arg::new("experiment")
        .long("experiment")
        .short('e')
        .value_name("ID")
        .required(true)
}

fn experiment_command() -> Command {
    Command::new("experiment")
        .about("Manage experiments")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create an experiment")
                .arg(Arg::new("name").required(true))
                .arg(tag_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Show an experiment")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("find")
                .about("Look an experiment up by name")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("list").about("List experiments").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Include deleted experiments"),
            ),
        )
        .subcommand(
            Command::new("delete")
                .about("Soft-delete an experiment")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore a deleted experiment")
                .arg(Arg::new("id").required(true)),
        )
}

fn permission_command() -> Command {
    Command::new("permission")
        .about("Manage experiment permissions")
        .subcommand_required(true)
        .subcommand(
            Command::new("grant")
                .about("Grant a permission level")
                .arg(Arg::new("experiment").required(true))
                .arg(Arg::new("user").required(true))
                .arg(
                    Arg::new("level")
                        .required(true)
                        .help("NO_PERMISSIONS, READ, EDIT or MANAGE"),
                ),
        )
        .subcommand(
            Command::new("revoke")
                .about("Remove a grant")
                .arg(Arg::new("experiment").required(true))
                .arg(Arg::new("user").required(true)),
        )
}

fn trace_command() -> Command {
    Command::new("trace")
        .about("Log, inspect and delete traces")
        .subcommand_required(true)
        .subcommand(
            Command::new("log")
                .about("Store a finished trace")
                .arg(experiment_arg())
                .arg(Arg::new("id").long("id").value_name("TRACE_ID"))
                .arg(
                    Arg::new("timestamp")
                        .long("timestamp")
                        .value_name("MS")
                        .help("Creation time in ms since epoch (default: now)"),
                )
                .arg(Arg::new("status").long("status").value_name("STATUS"))
                .arg(Arg::new("duration").long("duration").value_name("MS"))
                .arg(tag_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Show a trace")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("count")
                .about("Count traces in an experiment")
                .arg(Arg::new("experiment").required(true)),
        )
        .subcommand(
            Command::new("search")
                .about("Search trace summaries")
                .arg(experiment_arg().action(ArgAction::Append))
                .arg(Arg::new("status").long("status").value_name("STATUS"))
                .arg(tag_arg())
                .arg(Arg::new("max").long("max").value_name("N"))
                .arg(Arg::new("page-token").long("page-token").value_name("TOKEN"))
                .arg(
                    Arg::new("oldest-first")
                        .long("oldest-first")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("tag")
                .about("Set a trace tag")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("value").required(true)),
        )
        .subcommand(
            Command::new("untag")
                .about("Remove a trace tag")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("key").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete traces older than a cutoff, or by id")
                .arg(experiment_arg())
                .arg(
                    Arg::new("before-ms")
                        .long("before-ms")
                        .value_name("MS")
                        .allow_hyphen_values(true)
                        .help("Delete traces created strictly before this time"),
                )
                .arg(
                    Arg::new("ids")
                        .long("ids")
                        .value_name("ID,ID,...")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Delete exactly these traces"),
                )
                .arg(
                    Arg::new("max")
                        .long("max")
                        .value_name("N")
                        .allow_hyphen_values(true)
                        .help("Delete at most N of the oldest matching traces"),
                ),
        )
        .subcommand(
            Command::new("purge")
                .about("Delete everything older than a cutoff in batches")
                .arg(experiment_arg())
                .arg(
                    Arg::new("before-ms")
                        .long("before-ms")
                        .value_name("MS")
                        .required(true)
                        .allow_hyphen_values(true),
                )
                .arg(Arg::new("batch").long("batch").value_name("N"))
                .arg(Arg::new("pause-ms").long("pause-ms").value_name("MS")),
        )
}

//! Tracebase CLI
//!
//! Three modes:
//! - **Shell mode**: `tracebase [flags] COMMAND` runs one command and exits
//! - **REPL mode**: `tracebase [flags]` opens a prompt when stdin is a TTY
//! - **Pipe mode**: `echo "trace count 0" | tracebase` reads commands from stdin
//!
//! `tracebase serve` exposes the opened directory over TCP; `--connect`
//! talks to such a server instead of opening a directory.
//!
//! Logging goes to stderr and is configured with `TRACEBASE_LOG`
//! (e.g. `TRACEBASE_LOG=tracebase_engine=debug`).

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::process;
use std::sync::Arc;

use tracebase_engine::Database;
use tracebase_server::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_output, OutputMode};
use parse::{matches_to_action, CliAction};
use state::SessionState;

fn main() {
    init_logging();

    let matches = build_cli().get_matches();
    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let user = matches.get_one::<String>("user").cloned();

    let mut state = match open_session(&matches, user) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Some(("serve", serve_matches)) = matches.subcommand() {
        process::exit(run_serve(&state, serve_matches));
    }

    if matches.subcommand().is_some() {
        let exit_code = run_shell_mode(&matches, &mut state, output_mode);
        process::exit(exit_code);
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, output_mode);
    } else {
        let exit_code = repl::run_pipe(&mut state, output_mode);
        process::exit(exit_code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TRACEBASE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_session(matches: &clap::ArgMatches, user: Option<String>) -> Result<SessionState, String> {
    if let Some(addr) = matches.get_one::<String>("connect") {
        return SessionState::remote(addr, user)
            .map_err(|e| format!("Failed to connect to {}: {}", addr, e));
    }

    let path = matches
        .get_one::<String>("db")
        .map(|s| s.as_str())
        .unwrap_or(".tracebase");
    let mut builder = Database::builder().path(path);
    if matches.get_flag("read-only") {
        builder = builder.read_only();
    }
    let db = builder
        .open()
        .map_err(|e| format!("Failed to open database at {}: {}", path, e))?;
    Ok(SessionState::local(Arc::new(db), user))
}

fn run_shell_mode(matches: &clap::ArgMatches, state: &mut SessionState, mode: OutputMode) -> i32 {
    match matches_to_action(matches) {
        Ok(CliAction::Execute(cmd)) => match state.execute(cmd) {
            Ok(output) => {
                println!("{}", format_output(&output, mode));
                0
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Ok(CliAction::Meta(_)) => {
            eprintln!("(error) Meta-commands are only available in REPL mode");
            1
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}

fn run_serve(state: &SessionState, matches: &clap::ArgMatches) -> i32 {
    let db = match state.database() {
        Some(db) => db,
        None => {
            eprintln!("(error) serve needs a local database, not --connect");
            return 1;
        }
    };
    let mut config = ServerConfig::default();
    if let Some(listen) = matches.get_one::<String>("listen") {
        config = config.with_listen(listen.clone());
    }
    config.allow_system = matches.get_flag("allow-system");

    let server = match Server::new(db, config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("(error) {}", e);
            return 1;
        }
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("(error) could not start runtime: {}", e);
            return 1;
        }
    };
    match runtime.block_on(server.serve()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}

//! Interactive REPL and pipe mode.

use std::io::{self, BufRead};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands::build_repl_cli;
use crate::format::{format_error, format_output, OutputMode};
use crate::parse::{check_meta_command, matches_to_action, CliAction, MetaCommand};
use crate::state::SessionState;

const HISTORY_FILE: &str = ".tracebase_history";

/// Outcome of one input line.
enum LineResult {
    Continue,
    Failed,
    Quit,
}

/// Run the interactive prompt until `quit` or EOF.
pub fn run_repl(state: &mut SessionState, mode: OutputMode) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("(error) could not start line editor: {}", e);
            return;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if let LineResult::Quit = run_line(state, &line, mode) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("(error) {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
}

/// Execute stdin line by line. Returns the process exit code.
pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let mut exit_code = 0;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("(error) {}", e);
                return 1;
            }
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match run_line(state, &line, mode) {
            LineResult::Continue => {}
            LineResult::Failed => exit_code = 1,
            LineResult::Quit => break,
        }
    }
    exit_code
}

fn run_line(state: &mut SessionState, line: &str, mode: OutputMode) -> LineResult {
    if let Some(meta) = check_meta_command(line) {
        return run_meta(state, meta);
    }

    let args = match shlex::split(line) {
        Some(args) => args,
        None => {
            eprintln!("(error) unbalanced quotes");
            return LineResult::Failed;
        }
    };
    let matches = match build_repl_cli().try_get_matches_from(args) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            return LineResult::Failed;
        }
    };

    match matches_to_action(&matches) {
        Ok(CliAction::Execute(cmd)) => match state.execute(cmd) {
            Ok(output) => {
                println!("{}", format_output(&output, mode));
                LineResult::Continue
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                LineResult::Failed
            }
        },
        Ok(CliAction::Meta(meta)) => run_meta(state, meta),
        Err(e) => {
            eprintln!("(error) {}", e);
            LineResult::Failed
        }
    }
}

fn run_meta(state: &mut SessionState, meta: MetaCommand) -> LineResult {
    match meta {
        MetaCommand::Quit => LineResult::Quit,
        MetaCommand::Clear => {
            print!("\x1b[2J\x1b[H");
            LineResult::Continue
        }
        MetaCommand::User { name } => {
            state.set_user(name);
            LineResult::Continue
        }
        MetaCommand::Help { command } => {
            let mut cli = build_repl_cli();
            let help = match command.as_deref() {
                Some(name) => match cli.find_subcommand_mut(name) {
                    Some(sub) => sub.render_help().to_string(),
                    None => {
                        eprintln!("(error) unknown command '{}'", name);
                        return LineResult::Failed;
                    }
                },
                None => cli.render_help().to_string(),
            };
            println!("{}", help);
            println!("Meta-commands: help [COMMAND], user [NAME], clear, quit");
            LineResult::Continue
        }
    }
}

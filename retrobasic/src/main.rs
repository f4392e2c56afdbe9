//! retrobasic CLI

use clap::{Parser, Subcommand};
use retrobasic::config::CONFIG_FILE;
use retrobasic::interp::{HostEnvironment, Interpreter, StdinInput};
use retrobasic::lexer::{ScanOptions, tokenize_with};
use retrobasic::repl::Repl;
use retrobasic::{Config, Error, parser, report_error};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "retrobasic", version, about = "retrobasic - a BASIC-derived scripting language")]
struct Cli {
    /// Configuration file (default: ./retrobasic.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program
    Run {
        /// Source file to run
        file: PathBuf,
        /// Abort after this many statements
        #[arg(long)]
        max_steps: Option<u64>,
        /// Maximum user-function call depth
        #[arg(long)]
        max_call_depth: Option<usize>,
        /// Print global variables after the run
        #[arg(long)]
        dump_vars: bool,
    },
    /// Parse and dump AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
        /// Include REM and ' comments
        #[arg(long)]
        keep_comments: bool,
    },
    /// Start an interactive session
    Repl,
}

fn main() -> ExitCode {
    retrobasic::init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let ok = match cli.command {
        Command::Run {
            file,
            max_steps,
            max_call_depth,
            dump_vars,
        } => {
            let mut config = config;
            if max_steps.is_some() {
                config.limits.max_steps = max_steps;
            }
            if let Some(depth) = max_call_depth {
                config.limits.max_call_depth = depth;
            }
            run_file(&file, &config, dump_vars)
        }
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file, keep_comments } => tokenize_file(&file, ScanOptions { keep_comments }),
        Command::Repl => match Repl::new(&config) {
            Ok(mut repl) => repl.run().map_err(|err| eprintln!("REPL error: {err}")).is_ok(),
            Err(err) => {
                eprintln!("REPL error: {err}");
                false
            }
        },
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn read_source(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            eprintln!("Error: cannot read {}: {err}", path.display());
            None
        }
    }
}

fn report(path: &Path, source: &str, error: &Error) {
    let filename = path.display().to_string();
    if report_error(&filename, source, error).is_err() {
        eprintln!("Error: {error}");
    }
}

fn run_file(path: &Path, config: &Config, dump_vars: bool) -> bool {
    let Some(source) = read_source(path) else {
        return false;
    };
    let program = match tokenize_with(&source, config.scan_options()).and_then(parser::parse) {
        Ok(program) => program,
        Err(err) => {
            report(path, &source, &err);
            return false;
        }
    };

    let mut host = HostEnvironment::with_stdlib();
    host.set_input(StdinInput);
    let options = retrobasic::ExecOptions {
        stream_output: true,
        ..config.exec_options()
    };
    let mut interpreter = Interpreter::new(host, options);
    let result = interpreter.run(&program);
    if dump_vars {
        for (name, value) in interpreter.variables() {
            println!("{name} = {value}");
        }
    }
    match result {
        Ok(result) => {
            if let Some(reason) = result.halt_reason {
                tracing::debug!(%reason, "program halted");
            }
            true
        }
        Err(err) => {
            report(path, &source, &err.into());
            false
        }
    }
}

fn parse_file(path: &Path) -> bool {
    let Some(source) = read_source(path) else {
        return false;
    };
    match parser::parse_source(&source) {
        Ok(program) => match serde_json::to_string_pretty(&program) {
            Ok(json) => {
                println!("{json}");
                true
            }
            Err(err) => {
                eprintln!("Error: {err}");
                false
            }
        },
        Err(err) => {
            report(path, &source, &err);
            false
        }
    }
}

fn tokenize_file(path: &Path, options: ScanOptions) -> bool {
    let Some(source) = read_source(path) else {
        return false;
    };
    match tokenize_with(&source, options) {
        Ok(tokens) => {
            for token in &tokens {
                println!(
                    "{:?} {:?} @ {}:{} ({}..{})",
                    token.kind, token.lexeme, token.line, token.column, token.span.start, token.span.end
                );
            }
            true
        }
        Err(err) => {
            report(path, &source, &err);
            false
        }
    }
}

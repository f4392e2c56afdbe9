//! Interactive session
//!
//! [`Session`] holds the interpreter and the pending multi-line buffer;
//! [`Repl`] wraps it in a `rustyline` editor.

use crate::ast::{ExprKind, Program, StmtKind};
use crate::config::Config;
use crate::error::Error;
use crate::interp::{HostEnvironment, Interpreter, StdinInput};
use crate::lexer::ScanOptions;
use crate::parser;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const CONTINUATION_PROMPT: &str = "... ";

/// What feeding one line produced
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// The buffered input is an unfinished block
    Incomplete,
    /// The input ran; `error` is set when it failed part way
    Ran { output: Vec<String>, error: Option<String> },
}

/// Interpreter state that outlives a single line
pub struct Session {
    interpreter: Interpreter,
    scan: ScanOptions,
    buffer: String,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        let mut host = HostEnvironment::with_stdlib();
        host.set_input(StdinInput);
        Session {
            interpreter: Interpreter::new(host, config.exec_options()),
            scan: config.scan_options(),
            buffer: String::new(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn is_buffering(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Add a line. Blocks left open (`FOR` without `NEXT`, `SUB` without
    /// `END SUB`, ...) keep buffering until they parse.
    pub fn feed(&mut self, line: &str) -> Feed {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        let program = match self.parse(&self.buffer) {
            Ok(program) => program,
            Err(err) if is_incomplete(&err, &self.buffer) => return Feed::Incomplete,
            Err(err) => {
                let source = std::mem::take(&mut self.buffer);
                // A lone expression is printed
                return match self.parse(&format!("PRINT {source}")) {
                    Ok(program) if !source.contains('\n') => self.run(&program),
                    _ => Feed::Ran {
                        output: Vec::new(),
                        error: Some(err.to_string()),
                    },
                };
            }
        };
        self.buffer.clear();

        match self.bare_variable(&program) {
            Some(name) => match self.parse(&format!("PRINT {name}")) {
                Ok(print) => self.run(&print),
                Err(err) => Feed::Ran {
                    output: Vec::new(),
                    error: Some(err.to_string()),
                },
            },
            None => self.run(&program),
        }
    }

    /// Drop a half-entered block.
    pub fn cancel(&mut self) {
        self.buffer.clear();
    }

    /// Forget all definitions and variables.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.interpreter.reset();
    }

    /// `name = value` lines for `:vars`
    pub fn describe_vars(&self) -> Vec<String> {
        self.interpreter
            .variables()
            .iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect()
    }

    fn parse(&self, source: &str) -> crate::error::Result<Program> {
        crate::lexer::tokenize_with(source, self.scan).and_then(parser::parse)
    }

    fn run(&mut self, program: &Program) -> Feed {
        let result = self.interpreter.run(program);
        let output = self.interpreter.take_outputs();
        Feed::Ran {
            output,
            error: result.err().map(|err| err.to_string()),
        }
    }

    /// A line holding just a known variable name, which would otherwise
    /// parse as a call with no arguments.
    fn bare_variable(&self, program: &Program) -> Option<String> {
        let [stmt] = program.statements.as_slice() else {
            return None;
        };
        let StmtKind::Call(call) = &stmt.kind else {
            return None;
        };
        let ExprKind::Call { callee, args } = &call.kind else {
            return None;
        };
        match &callee.kind {
            ExprKind::Variable(name) if args.is_empty() && self.interpreter.has_variable(name) => Some(name.clone()),
            _ => None,
        }
    }
}

/// A parse error at the very end of the input, or a FOR still waiting for
/// its NEXT, means more lines may fix it.
fn is_incomplete(err: &Error, source: &str) -> bool {
    if !matches!(err, Error::Parser { .. }) {
        return false;
    }
    err.message().ends_with("without NEXT") || err.span().is_some_and(|span| span.start >= source.trim_end().len())
}

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    prompt: String,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(config: &Config) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = config
            .repl
            .history_file
            .as_ref()
            .and_then(|file| dirs_home().map(|home| home.join(file)));

        let mut repl = Repl {
            editor,
            session: Session::new(config),
            prompt: config.repl.prompt.clone(),
            history_path,
        };
        if let Some(path) = &repl.history_path {
            let _ = repl.editor.load_history(path);
        }
        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("retrobasic {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            let prompt = if self.session.is_buffering() {
                CONTINUATION_PROMPT
            } else {
                self.prompt.as_str()
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() && !self.session.is_buffering() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(trimmed);

                    if trimmed.starts_with(':') && !self.session.is_buffering() {
                        if self.handle_command(trimmed) {
                            break;
                        }
                        continue;
                    }

                    if let Feed::Ran { output, error } = self.session.feed(&line) {
                        for text in output {
                            println!("{text}");
                        }
                        if let Some(message) = error {
                            eprintln!("{message}");
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    self.session.cancel();
                    println!("^C");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
        Ok(())
    }

    /// Handle `:` commands. Returns true to quit.
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => true,
            ":help" | ":h" | ":?" => {
                print_help();
                false
            }
            ":vars" => {
                for line in self.session.describe_vars() {
                    println!("{line}");
                }
                false
            }
            ":reset" => {
                self.session.reset();
                println!("State cleared.");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help, :h, :?   Show this help");
    println!("  :quit, :q       Exit");
    println!("  :vars           List global variables");
    println!("  :reset          Forget variables, functions and types");
    println!();
    println!("Statements run as they are entered. Blocks (FOR, SUB, TRY, ...)");
    println!("continue on the next line until closed. A bare expression is printed.");
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

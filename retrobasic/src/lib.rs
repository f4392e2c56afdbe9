//! retrobasic: a BASIC-derived scripting language
//!
//! Source goes through [`lexer::tokenize`], [`parser::parse`] and then a
//! tree-walking [`interp::Interpreter`]. [`execute_source`] does all three.

pub mod ast;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod util;

pub use ast::{Position, Program, Span};
pub use config::Config;
pub use error::{Error, Result, report_error};
pub use interp::{ExecOptions, ExecutionResult, HaltReason, HostEnvironment, Interpreter, RuntimeError, Value, execute};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a stderr `tracing` subscriber.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=retrobasic=debug`
/// for calls and registrations or `=trace` for member resolution.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(filter)
                .try_init();
        }
    });
}

/// Parse and run source text with the default host.
pub fn execute_source(source: &str, options: ExecOptions) -> Result<ExecutionResult> {
    let program = parser::parse_source(source)?;
    Ok(execute(&program, options)?)
}

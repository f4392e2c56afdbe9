//! Error types and reporting

use crate::ast::{Position, Span};
use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Front-end and execution errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("Lexer error at {position}: {message}")]
    Lexer {
        message: String,
        span: Span,
        position: Position,
    },

    #[error("Parser error at {position}: {message}")]
    Parser {
        message: String,
        span: Span,
        position: Position,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Config error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn lexer(message: impl Into<String>, span: Span, position: Position) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
            position,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span, position: Position) -> Self {
        Self::Parser {
            message: message.into(),
            span,
            position,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } => Some(*span),
            Self::Runtime(err) => Some(err.span),
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Lexer { position, .. } | Self::Parser { position, .. } => Some(*position),
            Self::Runtime(err) => Some(err.position),
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. } | Self::Parser { message, .. } => message,
            Self::Runtime(err) => &err.message,
            Self::Io { message } | Self::Config { message } => message,
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Runtime(_) => "Runtime",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &Error) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind_label();
    // Synthetic runtime positions carry an empty span at 0; render those
    // without a label rather than pointing at the first character.
    match error.span().filter(|span| span.end > span.start) {
        Some(span) => Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source))),
        None => Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source))),
    }
}

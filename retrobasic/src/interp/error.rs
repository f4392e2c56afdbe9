//! Runtime errors for the interpreter

use super::context::HaltReason;
use crate::ast::{Position, Span};
use crate::lexer::Token;
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub position: Position,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value of the wrong type for an operator, parameter, or field
    TypeMismatch,
    /// Name is neither a variable, a function, nor a host entry
    UnknownIdentifier,
    /// Field missing from a typed record
    UnknownField,
    /// `obj.name` matched nothing
    UnknownMethod,
    /// `obj.name` matched several overloads
    AmbiguousMethod,
    /// No overload accepts the argument list
    NoOverload,
    /// Calling something that is not a function
    NotCallable,
    DivisionByZero,
    IndexOutOfRange,
    /// Second TYPE, or a repeated overload signature / property accessor
    DuplicateDefinition,
    /// FOR step evaluated to zero at run time
    InvalidStep,
    /// Control transfer with no enclosing target (`EXIT FOR` outside a loop)
    InvalidControl,
    /// Failure reported by a host function
    Host,
    /// INPUT with nothing left to read
    Input,
    /// Raised by `ERROR msg [, code]`
    User { code: Option<String> },
    /// Statement budget exhausted
    StepBudget,
    /// Call depth budget exhausted
    CallDepth,
    /// END or STOP reached inside a function called from an expression.
    /// The enclosing block turns it back into a halt.
    Halt(HaltReason),
}

impl RuntimeError {
    /// An error without a location yet; see [`RuntimeError::at`].
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            span: Span::default(),
            position: Position::default(),
        }
    }

    pub fn user(message: impl Into<String>, code: Option<String>, span: Span, position: Position) -> Self {
        RuntimeError {
            kind: ErrorKind::User { code },
            message: message.into(),
            span,
            position,
        }
    }

    /// Attach the offending token's location unless one is already set.
    pub fn at(mut self, token: &Token) -> Self {
        if self.position == Position::default() {
            self.span = token.span;
            self.position = token.position();
        }
        self
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(ErrorKind::TypeMismatch, format!("type mismatch: expected {expected}, got {got}"))
    }

    pub fn unknown_identifier(name: &str, hint: &str) -> Self {
        Self::new(ErrorKind::UnknownIdentifier, format!("unknown identifier '{name}'{hint}"))
    }

    pub fn not_callable(what: &str) -> Self {
        Self::new(ErrorKind::NotCallable, format!("{what} is not callable"))
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn index_out_of_range(index: f64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfRange,
            format!("index {index} out of range for length {len}"),
        )
    }

    pub fn invalid_control(what: &str) -> Self {
        Self::new(ErrorKind::InvalidControl, what.to_string())
    }

    pub fn halt(reason: HaltReason) -> Self {
        Self::new(ErrorKind::Halt(reason), format!("{reason} inside a function"))
    }

    /// The halt this error carries, if it is one
    pub fn halt_reason(&self) -> Option<HaltReason> {
        match self.kind {
            ErrorKind::Halt(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn host(name: &str, message: &str) -> Self {
        Self::new(ErrorKind::Host, format!("{name}: {message}"))
    }

    /// Stable code exposed to `CATCH` handlers as `e.code`.
    pub fn code(&self) -> &str {
        match &self.kind {
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::UnknownIdentifier => "UNKNOWN_IDENTIFIER",
            ErrorKind::UnknownField => "UNKNOWN_FIELD",
            ErrorKind::UnknownMethod => "UNKNOWN_METHOD",
            ErrorKind::AmbiguousMethod => "AMBIGUOUS_METHOD",
            ErrorKind::NoOverload => "NO_OVERLOAD",
            ErrorKind::NotCallable => "NOT_CALLABLE",
            ErrorKind::DivisionByZero => "DIVISION_BY_ZERO",
            ErrorKind::IndexOutOfRange => "INDEX_OUT_OF_RANGE",
            ErrorKind::DuplicateDefinition => "DUPLICATE_DEFINITION",
            ErrorKind::InvalidStep => "INVALID_STEP",
            ErrorKind::InvalidControl => "INVALID_CONTROL",
            ErrorKind::Host => "HOST_ERROR",
            ErrorKind::Input => "INPUT_ERROR",
            ErrorKind::User { code: Some(code) } => code,
            ErrorKind::User { code: None } => "USER_ERROR",
            ErrorKind::StepBudget => "STEP_BUDGET",
            ErrorKind::CallDepth => "CALL_DEPTH",
            ErrorKind::Halt(HaltReason::End) => "END",
            ErrorKind::Halt(HaltReason::Stop) => "STOP",
        }
    }

    /// Budget errors abort the run; `TRY` does not catch them.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::StepBudget | ErrorKind::CallDepth)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position == Position::default() {
            write!(f, "Runtime error: {}", self.message)
        } else {
            write!(f, "Runtime error at {}: {}", self.position, self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

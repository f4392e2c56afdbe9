//! Tree-walking interpreter
//!
//! [`Interpreter`] owns an [`ExecutionContext`](context::ExecutionContext)
//! and a [`HostEnvironment`]. Statements return a control signal; genuine
//! faults travel as [`RuntimeError`].

mod call;
mod context;
mod error;
mod eval;
mod expr;
mod functions;
mod host;
mod resolve;
mod stdlib;
mod types;
mod value;

pub use context::{HaltReason, RefTarget};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{DEFAULT_MAX_CALL_DEPTH, ExecOptions, ExecutionResult, Interpreter, execute, execute_with_host};
pub use functions::{FunctionTable, Overload, OverloadSet, PropertyTable};
pub use host::{
    HostEntry, HostEnvironment, HostFunction, HostNamespace, HostResult, InputSource, NativeFn, NativeFunction,
    NativeNamespace, NoInput, ScriptedInput, StdinInput,
};
pub use resolve::{Resolution, Scope, resolve_member};
pub use stdlib::UFCS_PROBE_NAMESPACES;
pub use types::{TypeDef, TypeRegistry, check_type, matches_type};
pub use value::{ArrayRef, ERROR_TYPE, OBJECT_TYPE, Record, RecordRef, Value, format_number};

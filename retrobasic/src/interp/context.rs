//! Execution context: the flat variable map, call frames, and output
//!
//! Calls do not nest scopes. The caller's map is parked in a [`Frame`] and
//! the callee runs against a copy of it; restoring the frame discards every
//! callee write except those routed through a [`RefTarget`].

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::functions::{FunctionTable, PropertyTable};
use super::types::TypeRegistry;
use super::value::{ArrayRef, RecordRef, Value};
use crate::ast::{LoopBindings, Stmt};
use crate::util::strip_type_suffix;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    End,
    Stop,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::End => write!(f, "END"),
            HaltReason::Stop => write!(f, "STOP"),
        }
    }
}

/// Where a `REF` parameter reads and writes
#[derive(Debug, Clone)]
pub enum RefTarget {
    /// A variable in a parked caller frame
    Variable { frame: usize, key: String },
    Field { record: RecordRef, name: String },
    Element { array: ArrayRef, index: usize },
}

/// A caller's variables, parked for the duration of a call
#[derive(Debug, Default)]
pub struct Frame {
    vars: HashMap<String, Value>,
    refs: HashMap<String, RefTarget>,
}

/// A deferred block with the loop bindings of the program it came from
#[derive(Debug, Clone)]
pub struct Deferred {
    pub body: Rc<Vec<Stmt>>,
    pub bindings: Rc<LoopBindings>,
}

#[derive(Default)]
pub struct ExecutionContext {
    vars: HashMap<String, Value>,
    refs: HashMap<String, RefTarget>,
    frames: Vec<Frame>,
    pub functions: FunctionTable,
    pub types: TypeRegistry,
    pub properties: PropertyTable,
    pub outputs: Vec<String>,
    pending_line: Option<String>,
    pub stream_output: bool,
    pub defers: Vec<Deferred>,
    pub with_stack: Vec<Value>,
    spawned: BTreeSet<String>,
    pub steps: u64,
    pub call_depth: usize,
}

fn key(name: &str) -> String {
    strip_type_suffix(name).to_string()
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------

    pub fn get_var(&self, name: &str) -> InterpResult<Option<Value>> {
        let key = key(name);
        match self.refs.get(&key) {
            Some(target) => self.read_ref(target).map(Some),
            None => Ok(self.vars.get(&key).cloned()),
        }
    }

    pub fn has_var(&self, name: &str) -> bool {
        let key = key(name);
        self.refs.contains_key(&key) || self.vars.contains_key(&key)
    }

    pub fn set_var(&mut self, name: &str, value: Value) -> InterpResult<()> {
        let key = key(name);
        match self.refs.get(&key).cloned() {
            Some(target) => self.write_ref(&target, value),
            None => {
                self.vars.insert(key, value);
                Ok(())
            }
        }
    }

    /// Bind a name in the current scope, dropping any REF alias it had.
    pub fn bind_local(&mut self, name: &str, value: Value) {
        let key = key(name);
        self.refs.remove(&key);
        self.vars.insert(key, value);
    }

    pub fn bind_ref(&mut self, name: &str, target: RefTarget) {
        self.refs.insert(key(name), target);
    }

    /// A REF target aliasing the current scope's variable `name`.
    ///
    /// Must be called before the caller frame is pushed; `frame` is the index
    /// the frame will get. Chains of REF collapse to the original slot.
    pub fn local_target(&self, name: &str) -> Option<RefTarget> {
        let key = key(name);
        if let Some(target) = self.refs.get(&key) {
            return Some(target.clone());
        }
        self.vars.contains_key(&key).then(|| RefTarget::Variable {
            frame: self.frames.len(),
            key,
        })
    }

    pub fn read_ref(&self, target: &RefTarget) -> InterpResult<Value> {
        match target {
            RefTarget::Variable { frame, key } => self
                .frames
                .get(*frame)
                .and_then(|f| f.vars.get(key))
                .cloned()
                .ok_or_else(|| RuntimeError::unknown_identifier(key, "")),
            RefTarget::Field { record, name } => record
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::new(ErrorKind::UnknownField, format!("unknown field '{name}'"))),
            RefTarget::Element { array, index } => {
                let items = array.borrow();
                items
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| RuntimeError::index_out_of_range(*index as f64, items.len()))
            }
        }
    }

    pub fn write_ref(&mut self, target: &RefTarget, value: Value) -> InterpResult<()> {
        match target {
            RefTarget::Variable { frame, key } => match self.frames.get_mut(*frame) {
                Some(frame) => {
                    frame.vars.insert(key.clone(), value);
                    Ok(())
                }
                None => Err(RuntimeError::unknown_identifier(key, "")),
            },
            RefTarget::Field { record, name } => {
                record.borrow_mut().set(name, value);
                Ok(())
            }
            RefTarget::Element { array, index } => {
                let mut items = array.borrow_mut();
                let len = items.len();
                match items.get_mut(*index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(RuntimeError::index_out_of_range(*index as f64, len)),
                }
            }
        }
    }

    /// Visible variable names, for suggestions
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().chain(self.refs.keys()).map(String::as_str)
    }

    /// Global variables: the outermost scope
    pub fn globals(&self) -> BTreeMap<String, Value> {
        let vars = self.frames.first().map_or(&self.vars, |frame| &frame.vars);
        vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    // ---------------------------------------------------------------
    // Frames
    // ---------------------------------------------------------------

    /// Park the caller's scope and start the callee on a snapshot of it,
    /// with REF aliases read through to plain values.
    pub fn push_frame(&mut self) -> InterpResult<()> {
        let mut snapshot = self.vars.clone();
        for (name, target) in &self.refs {
            snapshot.insert(name.clone(), self.read_ref(target)?);
        }
        let vars = std::mem::replace(&mut self.vars, snapshot);
        let refs = std::mem::take(&mut self.refs);
        self.frames.push(Frame { vars, refs });
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.vars = frame.vars;
            self.refs = frame.refs;
        }
    }

    // ---------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------

    /// Append text to the current output line without ending it.
    pub fn write(&mut self, text: &str) {
        self.pending_line.get_or_insert_with(String::new).push_str(text);
    }

    /// Finish the current output line with `text`.
    pub fn write_line(&mut self, text: &str) {
        let mut line = self.pending_line.take().unwrap_or_default();
        line.push_str(text);
        if self.stream_output {
            println!("{line}");
        }
        self.outputs.push(line);
    }

    /// Emit a partial line left by a trailing `;` or `,`.
    pub fn flush_pending(&mut self) {
        if self.pending_line.is_some() {
            self.write_line("");
        }
    }

    // ---------------------------------------------------------------
    // SPAWN bookkeeping
    // ---------------------------------------------------------------

    /// Record a routine name. Returns false if it was already recorded.
    pub fn spawn(&mut self, name: &str) -> bool {
        self.spawned.insert(name.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_insensitive_storage() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("name$", Value::str("Ada")).unwrap();
        assert_eq!(ctx.get_var("name").unwrap(), Some(Value::str("Ada")));
        assert_eq!(ctx.get_var("Name").unwrap(), None);
    }

    #[test]
    fn test_frame_restores_caller_scope() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("x", Value::Number(1.0)).unwrap();
        ctx.push_frame().unwrap();
        assert_eq!(ctx.get_var("x").unwrap(), Some(Value::Number(1.0)));
        ctx.set_var("x", Value::Number(2.0)).unwrap();
        ctx.set_var("y", Value::Number(3.0)).unwrap();
        ctx.pop_frame();
        assert_eq!(ctx.get_var("x").unwrap(), Some(Value::Number(1.0)));
        assert!(!ctx.has_var("y"));
    }

    #[test]
    fn test_ref_writes_reach_caller() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("n", Value::Number(5.0)).unwrap();
        let target = ctx.local_target("n").unwrap();
        ctx.push_frame().unwrap();
        ctx.bind_ref("x", target);
        ctx.set_var("x", Value::Number(6.0)).unwrap();
        assert_eq!(ctx.get_var("x").unwrap(), Some(Value::Number(6.0)));
        ctx.pop_frame();
        assert_eq!(ctx.get_var("n").unwrap(), Some(Value::Number(6.0)));
    }

    #[test]
    fn test_ref_chain_collapses() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("n", Value::Number(1.0)).unwrap();
        let outer = ctx.local_target("n").unwrap();
        ctx.push_frame().unwrap();
        ctx.bind_ref("a", outer);
        let inner = ctx.local_target("a").unwrap();
        assert!(matches!(inner, RefTarget::Variable { frame: 0, .. }));
        ctx.push_frame().unwrap();
        ctx.bind_ref("b", inner);
        ctx.set_var("b", Value::Number(9.0)).unwrap();
        ctx.pop_frame();
        ctx.pop_frame();
        assert_eq!(ctx.get_var("n").unwrap(), Some(Value::Number(9.0)));
    }

    #[test]
    fn test_globals_from_inside_call() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("g", Value::Number(1.0)).unwrap();
        ctx.push_frame().unwrap();
        ctx.set_var("local", Value::Number(2.0)).unwrap();
        let globals = ctx.globals();
        assert!(globals.contains_key("g"));
        assert!(!globals.contains_key("local"));
    }

    #[test]
    fn test_partial_lines() {
        let mut ctx = ExecutionContext::new();
        ctx.write("a");
        ctx.write("b");
        ctx.write_line("c");
        ctx.write("tail");
        ctx.flush_pending();
        ctx.flush_pending();
        assert_eq!(ctx.outputs, vec!["abc", "tail"]);
    }

    #[test]
    fn test_spawn_is_case_insensitive() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.spawn("Worker"));
        assert!(!ctx.spawn("WORKER"));
    }
}

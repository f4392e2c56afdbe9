//! Statement execution
//!
//! Statements return a [`Signal`] instead of unwinding: IF, WITH, TRY and
//! SELECT bodies hand RETURN/EXIT/CONTINUE/END upward unchanged, and only
//! genuine faults travel as `Err(RuntimeError)`.

use super::context::{Deferred, ExecutionContext, HaltReason};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::host::HostEnvironment;
use super::types::check_type;
use super::value::{ERROR_TYPE, Record, Value, format_number, parse_decimal};
use crate::ast::{
    BinaryOp, CaseTest, CatchClause, ExitKind, Expr, ExprKind, LoopBinding, LoopBindings, LoopCondition, LoopKind,
    PrintItem, PrintSeparator, Program, Stmt, StmtId, StmtKind, TypeAnnotation,
};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// Default call depth budget
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Largest element count `DIM` will allocate
pub const MAX_DIM_ELEMENTS: usize = 1 << 24;

/// Execution limits and output behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Abort after this many executed statements
    pub max_steps: Option<u64>,
    pub max_call_depth: usize,
    /// Echo each completed output line to stdout as it is produced
    pub stream_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions {
            max_steps: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            stream_output: false,
        }
    }
}

/// What one run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Lines printed during this run
    pub outputs: Vec<String>,
    /// Global variables after the run
    pub variables: BTreeMap<String, Value>,
    pub halt_reason: Option<HaltReason>,
}

/// Control transfer out of a statement
#[derive(Debug)]
pub(super) enum Signal {
    None,
    /// Continue the current block at this index (FOR/NEXT)
    Jump(usize),
    Halt(HaltReason),
    Return(Option<Value>),
    Exit(ExitKind),
    Continue(Option<LoopKind>),
}

/// A FOR loop between its FOR and NEXT
struct ActiveFor {
    binding: LoopBinding,
    var: String,
    limit: f64,
    step: f64,
}

fn for_continues(value: f64, limit: f64, step: f64) -> bool {
    if step > 0.0 { value <= limit } else { value >= limit }
}

fn loop_name(kind: LoopKind) -> &'static str {
    match kind {
        LoopKind::For => "FOR",
        LoopKind::While => "WHILE",
        LoopKind::Do => "DO",
    }
}

/// Tree-walking interpreter. State persists across [`Interpreter::run`]
/// calls, so a REPL can feed it one program per line.
pub struct Interpreter {
    pub(super) ctx: ExecutionContext,
    pub(super) host: HostEnvironment,
    pub(super) options: ExecOptions,
    /// FOR/NEXT pairing for the statements currently executing
    pub(super) bindings: Rc<LoopBindings>,
    /// Declarations already registered before this run started
    hoisted: HashSet<StmtId>,
}

impl Interpreter {
    pub fn new(host: HostEnvironment, options: ExecOptions) -> Self {
        Interpreter {
            ctx: ExecutionContext::new(),
            host,
            options,
            bindings: Rc::default(),
            hoisted: HashSet::new(),
        }
    }

    /// Execute a program against the current state.
    ///
    /// Top-level TYPE, FUNCTION and PROPERTY declarations are registered
    /// first, so code may call functions declared further down.
    pub fn run(&mut self, program: &Program) -> InterpResult<ExecutionResult> {
        let first_output = self.ctx.outputs.len();
        self.bindings = Rc::new(program.loop_bindings.clone());
        self.hoisted.clear();
        self.ctx.steps = 0;
        self.ctx.call_depth = 0;
        self.ctx.stream_output = self.options.stream_output;

        let outcome = self
            .hoist(&program.statements)
            .and_then(|()| self.exec_block(&program.statements));
        let outcome = self.finish_scope(outcome);
        self.ctx.flush_pending();
        self.ctx.with_stack.clear();

        let halt_reason = match outcome? {
            Signal::Halt(reason) => Some(reason),
            Signal::Exit(ExitKind::Loop(kind)) => {
                return Err(RuntimeError::invalid_control(&format!(
                    "EXIT {} outside of a loop",
                    loop_name(kind)
                )));
            }
            Signal::Continue(_) => return Err(RuntimeError::invalid_control("CONTINUE outside of a loop")),
            // RETURN or EXIT SUB at top level ends the program quietly
            Signal::None | Signal::Jump(_) | Signal::Return(_) | Signal::Exit(_) => None,
        };
        Ok(ExecutionResult {
            outputs: self.ctx.outputs[first_output..].to_vec(),
            variables: self.ctx.globals(),
            halt_reason,
        })
    }

    /// Every line printed since the last [`Interpreter::take_outputs`]
    pub fn outputs(&self) -> &[String] {
        &self.ctx.outputs
    }

    pub fn take_outputs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.ctx.outputs)
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.ctx.globals()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.ctx.has_var(name)
    }

    /// Forget all variables, functions, types and properties.
    pub fn reset(&mut self) {
        self.ctx = ExecutionContext::new();
        self.bindings = Rc::default();
        self.hoisted.clear();
    }

    pub fn host_mut(&mut self) -> &mut HostEnvironment {
        &mut self.host
    }

    pub fn options(&self) -> ExecOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ExecOptions) {
        self.options = options;
    }

    fn hoist(&mut self, stmts: &[Stmt]) -> InterpResult<()> {
        for stmt in stmts {
            if let StmtKind::TypeDecl(decl) = &stmt.kind {
                self.ctx.types.define(decl).map_err(|e| e.at(&stmt.token))?;
                self.hoisted.insert(stmt.id);
            }
        }
        for stmt in stmts {
            let registered = match &stmt.kind {
                StmtKind::Function(decl) => self.ctx.functions.define(decl, stmt.id, Rc::clone(&self.bindings)),
                StmtKind::Property(decl) => self.ctx.properties.define(decl, stmt.id, Rc::clone(&self.bindings)),
                _ => continue,
            };
            registered.map_err(|e| e.at(&stmt.token))?;
            self.hoisted.insert(stmt.id);
        }
        Ok(())
    }

    pub(super) fn tick(&mut self) -> InterpResult<()> {
        self.ctx.steps += 1;
        if let Some(max) = self.options.max_steps {
            if self.ctx.steps > max {
                return Err(RuntimeError::new(
                    ErrorKind::StepBudget,
                    format!("step budget of {max} statements exceeded"),
                ));
            }
        }
        Ok(())
    }

    /// Drain the current defer stack, last registered first.
    ///
    /// An error from a deferred block replaces the outcome. Fatal errors
    /// skip the remaining deferred blocks.
    pub(super) fn finish_scope(&mut self, outcome: InterpResult<Signal>) -> InterpResult<Signal> {
        if matches!(&outcome, Err(e) if e.is_fatal()) {
            self.ctx.defers.clear();
            return outcome;
        }
        let mut outcome = outcome;
        while let Some(deferred) = self.ctx.defers.pop() {
            let saved = std::mem::replace(&mut self.bindings, deferred.bindings);
            let result = self.exec_block(&deferred.body);
            self.bindings = saved;
            match result {
                Ok(Signal::Halt(reason)) => outcome = Ok(Signal::Halt(reason)),
                Ok(_) => {}
                Err(err) => {
                    let fatal = err.is_fatal();
                    outcome = Err(err);
                    if fatal {
                        self.ctx.defers.clear();
                        break;
                    }
                }
            }
        }
        outcome
    }

    // ---------------------------------------------------------------
    // Blocks
    // ---------------------------------------------------------------

    pub(super) fn exec_block(&mut self, stmts: &[Stmt]) -> InterpResult<Signal> {
        let mut pc = 0;
        let mut loops: Vec<ActiveFor> = Vec::new();
        while let Some(stmt) = stmts.get(pc) {
            self.tick().map_err(|e| e.at(&stmt.token))?;
            let signal = match self.exec_stmt(stmt, &mut loops) {
                Ok(signal) => signal,
                // END inside a called function abandons this statement
                Err(err) => match err.halt_reason() {
                    Some(reason) => return Ok(Signal::Halt(reason)),
                    None => return Err(err.at(&stmt.token)),
                },
            };
            pc = match signal {
                Signal::None => pc + 1,
                Signal::Jump(target) => target,
                Signal::Exit(ExitKind::Loop(LoopKind::For)) if !loops.is_empty() => {
                    match loops.pop() {
                        Some(active) => active.binding.next_index + 1,
                        None => pc + 1,
                    }
                }
                Signal::Continue(None | Some(LoopKind::For)) if !loops.is_empty() => {
                    match loops.last() {
                        Some(active) => active.binding.next_index,
                        None => pc + 1,
                    }
                }
                other => return Ok(other),
            };
        }
        Ok(Signal::None)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, loops: &mut Vec<ActiveFor>) -> InterpResult<Signal> {
        match &stmt.kind {
            StmtKind::Assign { target, value, .. } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
                Ok(Signal::None)
            }
            StmtKind::Print { items, newline } => self.exec_print(items, *newline),
            StmtKind::Input { prompt, targets } => self.exec_input(prompt.as_deref(), targets),
            StmtKind::If {
                branches,
                else_branch,
                ..
            } => {
                for branch in branches {
                    if self.eval(&branch.cond)?.is_truthy() {
                        return self.exec_block(&branch.body);
                    }
                }
                match else_branch {
                    Some(body) => self.exec_block(body),
                    None => Ok(Signal::None),
                }
            }
            StmtKind::For { var, start, end, step } => self.exec_for(stmt, var, start, end, step.as_ref(), loops),
            StmtKind::Next { .. } => self.exec_next(stmt, loops),
            StmtKind::While { cond, body } => self.exec_while(cond, body),
            StmtKind::DoLoop { pre, post, body } => self.exec_do(pre.as_ref(), post.as_ref(), body),
            StmtKind::Try { body, catch, finally } => self.exec_try(body, catch.as_ref(), finally.as_deref()),
            StmtKind::Raise { message, code } => {
                let message = self.eval(message)?.to_string();
                let code = match code {
                    Some(code) => Some(self.eval(code)?.to_string()),
                    None => None,
                };
                Err(RuntimeError::user(message, code, stmt.token.span, stmt.token.position()))
            }
            StmtKind::Defer { body } => {
                self.ctx.defers.push(Deferred {
                    body: Rc::new(body.clone()),
                    bindings: Rc::clone(&self.bindings),
                });
                Ok(Signal::None)
            }
            StmtKind::Function(decl) => {
                if !self.hoisted.contains(&stmt.id) {
                    self.ctx.functions.define(decl, stmt.id, Rc::clone(&self.bindings))?;
                }
                Ok(Signal::None)
            }
            StmtKind::Property(decl) => {
                if !self.hoisted.contains(&stmt.id) {
                    self.ctx.properties.define(decl, stmt.id, Rc::clone(&self.bindings))?;
                }
                Ok(Signal::None)
            }
            StmtKind::TypeDecl(decl) => {
                if !self.hoisted.contains(&stmt.id) {
                    self.ctx.types.define(decl)?;
                }
                Ok(Signal::None)
            }
            StmtKind::With { target, body } => {
                let target = self.eval(target)?;
                self.ctx.with_stack.push(target);
                let result = self.exec_block(body);
                self.ctx.with_stack.pop();
                result
            }
            StmtKind::Select {
                selector,
                cases,
                else_body,
            } => {
                let selector = self.eval(selector)?;
                for case in cases {
                    for test in &case.tests {
                        if self.case_matches(&selector, test).map_err(|e| e.at(&case.token))? {
                            return self.exec_block(&case.body);
                        }
                    }
                }
                match else_body {
                    Some(body) => self.exec_block(body),
                    None => Ok(Signal::None),
                }
            }
            StmtKind::Exit(kind) => Ok(Signal::Exit(*kind)),
            StmtKind::Continue(kind) => Ok(Signal::Continue(*kind)),
            StmtKind::Dim { name, size, ty } => self.exec_dim(name, size.as_ref(), ty.as_ref()),
            StmtKind::Spawn { name } => {
                let fresh = self.ctx.spawn(name);
                tracing::debug!(routine = %name, fresh, "spawn");
                if fresh {
                    self.ctx.write_line(&format!("Spawned routine {name}"));
                } else {
                    self.ctx.write_line(&format!("Routine {name} already running"));
                }
                Ok(Signal::None)
            }
            StmtKind::Return(value) => match value {
                Some(expr) => Ok(Signal::Return(Some(self.eval(expr)?))),
                None => Ok(Signal::Return(None)),
            },
            StmtKind::Call(expr) => {
                self.eval(expr)?;
                Ok(Signal::None)
            }
            StmtKind::End => Ok(Signal::Halt(HaltReason::End)),
            StmtKind::Stop => Ok(Signal::Halt(HaltReason::Stop)),
        }
    }

    // ---------------------------------------------------------------
    // Loops
    // ---------------------------------------------------------------

    fn binding_for(&self, stmt: &Stmt) -> InterpResult<LoopBinding> {
        self.bindings
            .get(stmt.id)
            .ok_or_else(|| RuntimeError::invalid_control("FOR/NEXT without a loop binding"))
    }

    fn exec_for(
        &mut self,
        stmt: &Stmt,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        loops: &mut Vec<ActiveFor>,
    ) -> InterpResult<Signal> {
        let binding = self.binding_for(stmt)?;
        let start = self.eval(start)?.as_number().map_err(|e| e.at(&start.token))?;
        let limit = self.eval(end)?.as_number().map_err(|e| e.at(&end.token))?;
        let step = match step {
            Some(expr) => self.eval(expr)?.as_number().map_err(|e| e.at(&expr.token))?,
            None => 1.0,
        };
        if step == 0.0 {
            return Err(RuntimeError::new(ErrorKind::InvalidStep, format!("FOR {var} has STEP 0")));
        }
        self.assign_variable(var, Value::Number(start))?;
        // Re-entering a FOR discards its previous activation and anything nested in it
        if let Some(pos) = loops.iter().position(|l| l.binding.for_index == binding.for_index) {
            loops.truncate(pos);
        }
        if for_continues(start, limit, step) {
            loops.push(ActiveFor {
                binding,
                var: var.to_string(),
                limit,
                step,
            });
            Ok(Signal::Jump(binding.for_index + 1))
        } else {
            Ok(Signal::Jump(binding.next_index + 1))
        }
    }

    fn exec_next(&mut self, stmt: &Stmt, loops: &mut Vec<ActiveFor>) -> InterpResult<Signal> {
        let binding = self.binding_for(stmt)?;
        let Some(pos) = loops.iter().rposition(|l| l.binding.for_index == binding.for_index) else {
            return Err(RuntimeError::invalid_control("NEXT reached without an active FOR"));
        };
        loops.truncate(pos + 1);
        let Some(active) = loops.last() else {
            return Err(RuntimeError::invalid_control("NEXT reached without an active FOR"));
        };
        let current = self
            .ctx
            .get_var(&active.var)?
            .ok_or_else(|| RuntimeError::unknown_identifier(&active.var, ""))?
            .as_number()?;
        let next = current + active.step;
        let (var, limit, step) = (active.var.clone(), active.limit, active.step);
        self.assign_variable(&var, Value::Number(next))?;
        if for_continues(next, limit, step) {
            Ok(Signal::Jump(binding.for_index + 1))
        } else {
            loops.pop();
            Ok(Signal::Jump(binding.next_index + 1))
        }
    }

    fn exec_while(&mut self, cond: &Expr, body: &[Stmt]) -> InterpResult<Signal> {
        let mut first = true;
        loop {
            if !first {
                self.tick()?;
            }
            first = false;
            if !self.eval(cond)?.is_truthy() {
                return Ok(Signal::None);
            }
            match self.exec_block(body)? {
                Signal::None | Signal::Continue(None | Some(LoopKind::While)) => {}
                Signal::Exit(ExitKind::Loop(LoopKind::While)) => return Ok(Signal::None),
                other => return Ok(other),
            }
        }
    }

    fn condition_holds(&mut self, condition: &LoopCondition) -> InterpResult<bool> {
        let truthy = self.eval(&condition.cond)?.is_truthy();
        Ok(truthy != condition.until)
    }

    fn exec_do(
        &mut self,
        pre: Option<&LoopCondition>,
        post: Option<&LoopCondition>,
        body: &[Stmt],
    ) -> InterpResult<Signal> {
        let mut first = true;
        loop {
            if !first {
                self.tick()?;
            }
            first = false;
            if let Some(pre) = pre {
                if !self.condition_holds(pre)? {
                    return Ok(Signal::None);
                }
            }
            match self.exec_block(body)? {
                Signal::None | Signal::Continue(None | Some(LoopKind::Do)) => {}
                Signal::Exit(ExitKind::Loop(LoopKind::Do)) => return Ok(Signal::None),
                other => return Ok(other),
            }
            if let Some(post) = post {
                if !self.condition_holds(post)? {
                    return Ok(Signal::None);
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // TRY / SELECT
    // ---------------------------------------------------------------

    fn exec_try(
        &mut self,
        body: &[Stmt],
        catch: Option<&CatchClause>,
        finally: Option<&[Stmt]>,
    ) -> InterpResult<Signal> {
        let outcome = match self.exec_block(body) {
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => match catch {
                Some(clause) => {
                    tracing::debug!(code = err.code(), "caught runtime error");
                    if let Some(var) = &clause.var {
                        self.ctx.set_var(var, error_record(&err))?;
                    }
                    self.exec_block(&clause.body)
                }
                None => Err(err),
            },
            ok => ok,
        };
        if let Some(finally) = finally {
            match self.exec_block(finally)? {
                Signal::None => {}
                signal => return Ok(signal),
            }
        }
        outcome
    }

    fn case_matches(&mut self, selector: &Value, test: &CaseTest) -> InterpResult<bool> {
        Ok(match test {
            CaseTest::Value(expr) => selector.loose_eq(&self.eval(expr)?),
            CaseTest::Range(low, high) => {
                let low = self.eval(low)?;
                let high = self.eval(high)?;
                loose_cmp(selector, &low).is_some_and(|o| o.is_ge())
                    && loose_cmp(selector, &high).is_some_and(|o| o.is_le())
            }
            CaseTest::Is(op, expr) => {
                let operand = self.eval(expr)?;
                match op {
                    BinaryOp::Eq => selector.loose_eq(&operand),
                    BinaryOp::NotEq => !selector.loose_eq(&operand),
                    BinaryOp::Lt => loose_cmp(selector, &operand).is_some_and(|o| o.is_lt()),
                    BinaryOp::Gt => loose_cmp(selector, &operand).is_some_and(|o| o.is_gt()),
                    BinaryOp::LtEq => loose_cmp(selector, &operand).is_some_and(|o| o.is_le()),
                    BinaryOp::GtEq => loose_cmp(selector, &operand).is_some_and(|o| o.is_ge()),
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("CASE IS does not support {other}"),
                        ));
                    }
                }
            }
        })
    }

    // ---------------------------------------------------------------
    // I/O and declarations
    // ---------------------------------------------------------------

    fn exec_print(&mut self, items: &[PrintItem], newline: bool) -> InterpResult<Signal> {
        let mut text = String::new();
        for item in items {
            let value = self.eval(&item.expr)?;
            text.push_str(&value.to_string());
            if item.separator == Some(PrintSeparator::Comma) {
                text.push('\t');
            }
        }
        if newline {
            self.ctx.write_line(&text);
        } else {
            self.ctx.write(&text);
        }
        Ok(Signal::None)
    }

    fn exec_input(&mut self, prompt: Option<&str>, targets: &[Expr]) -> InterpResult<Signal> {
        for (i, target) in targets.iter().enumerate() {
            let prompt = match prompt {
                Some(prompt) if i == 0 => prompt,
                _ => "? ",
            };
            let line = self
                .host
                .read_line(prompt)
                .ok_or_else(|| RuntimeError::new(ErrorKind::Input, "INPUT: no more input"))?;
            let wants_string = matches!(&target.kind, ExprKind::Variable(name) if name.ends_with('$'));
            let value = match parse_decimal(line.trim()) {
                Some(n) if !wants_string => Value::Number(n),
                _ => Value::Str(line),
            };
            self.assign(target, value)?;
        }
        Ok(Signal::None)
    }

    fn exec_dim(&mut self, name: &str, size: Option<&Expr>, ty: Option<&TypeAnnotation>) -> InterpResult<Signal> {
        let ty = ty.cloned().unwrap_or_else(|| TypeAnnotation::infer_from_suffix(name));
        let value = match size {
            Some(size) => {
                let n = self.eval(size)?.as_number()?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(RuntimeError::new(
                        ErrorKind::IndexOutOfRange,
                        format!("DIM {name} size must be a non-negative integer"),
                    ));
                }
                // n is the highest index, so n + 1 elements
                if n >= MAX_DIM_ELEMENTS as f64 {
                    return Err(RuntimeError::new(
                        ErrorKind::IndexOutOfRange,
                        format!("DIM {name} size {} exceeds the limit of {MAX_DIM_ELEMENTS} elements", format_number(n)),
                    ));
                }
                let items = (0..=n as usize)
                    .map(|_| self.ctx.types.default_value(&ty))
                    .collect::<InterpResult<Vec<_>>>()?;
                Value::array(items)
            }
            None => self.ctx.types.default_value(&ty)?,
        };
        self.ctx.set_var(name, value)?;
        Ok(Signal::None)
    }

    // ---------------------------------------------------------------
    // Assignment
    // ---------------------------------------------------------------

    pub(super) fn assign(&mut self, target: &Expr, value: Value) -> InterpResult<()> {
        let result = match &target.kind {
            ExprKind::Variable(name) => self.assign_variable(name, value),
            ExprKind::Member { object, name } => {
                let object = self.eval(object)?;
                self.set_member(&object, name, value)
            }
            ExprKind::WithField(name) => {
                let object = self.with_target()?;
                self.set_member(&object, name, value)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.set_index(&object, &index, value)
            }
            ExprKind::Call { callee, args } if args.len() == 1 && matches!(callee.kind, ExprKind::Variable(_)) => {
                let object = self.eval(callee)?;
                let index = self.eval(&args[0])?;
                self.set_index(&object, &index, value)
            }
            _ => Err(RuntimeError::new(ErrorKind::TypeMismatch, "cannot assign to this expression")),
        };
        result.map_err(|e| e.at(&target.token))
    }

    /// Variable assignment; `$` names hold strings, `% ! & #` names numbers.
    pub(super) fn assign_variable(&mut self, name: &str, value: Value) -> InterpResult<()> {
        check_type(&value, &TypeAnnotation::infer_from_suffix(name), &format!("variable {name}"))?;
        self.ctx.set_var(name, value)
    }

    pub(super) fn with_target(&self) -> InterpResult<Value> {
        self.ctx
            .with_stack
            .last()
            .cloned()
            .ok_or_else(|| RuntimeError::invalid_control("'.field' used outside of a WITH block"))
    }

    fn set_member(&mut self, object: &Value, name: &str, value: Value) -> InterpResult<()> {
        let Value::Record(record) = object else {
            return Err(RuntimeError::type_mismatch("record", &object.type_name()));
        };
        let (type_name, has_field, is_object) = {
            let record = record.borrow();
            (record.type_name.clone(), record.has_field(name), record.is_object())
        };
        if has_field {
            if let Some(def) = self.ctx.types.get(&type_name) {
                if let Some(ty) = def.field_type(name) {
                    check_type(&value, ty, &format!("field {type_name}.{name}"))?;
                }
            }
            record.borrow_mut().set(name, value);
            return Ok(());
        }
        if let Some(setter) = self.ctx.properties.setter(&type_name, name) {
            self.call_overload(setter, vec![object.clone().into(), value.into()])?;
            return Ok(());
        }
        if is_object {
            record.borrow_mut().insert(name, value);
            return Ok(());
        }
        Err(RuntimeError::new(
            ErrorKind::UnknownField,
            format!("{type_name} has no field '{name}'"),
        ))
    }

    fn set_index(&mut self, object: &Value, index: &Value, value: Value) -> InterpResult<()> {
        match (object, index) {
            (Value::Array(items), _) => {
                let mut items = items.borrow_mut();
                let i = super::expr::array_index(index, items.len())?;
                if let Some(slot) = items.get_mut(i) {
                    *slot = value;
                }
                Ok(())
            }
            (Value::Record(_), Value::Str(key)) => self.set_member(object, key, value),
            _ => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("cannot assign into {} by {} index", object.type_name(), index.type_name()),
            )),
        }
    }
}

/// Ordering used by CASE ranges and CASE IS: numbers numerically, strings
/// case-insensitively, anything else incomparable.
fn loose_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Str(x), Value::Str(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        _ => None,
    }
}

/// The record `CATCH e` binds
fn error_record(err: &RuntimeError) -> Value {
    Value::record(Record::new(
        ERROR_TYPE,
        vec![
            ("message".to_string(), Value::str(err.message.clone())),
            ("code".to_string(), Value::str(err.code())),
            ("line".to_string(), Value::Number(err.position.line as f64)),
            ("column".to_string(), Value::Number(err.position.column as f64)),
        ],
    ))
}

/// Run a parsed program with the built-in host.
pub fn execute(program: &Program, options: ExecOptions) -> InterpResult<ExecutionResult> {
    execute_with_host(program, HostEnvironment::with_stdlib(), options)
}

/// Run a parsed program against a caller-supplied host.
pub fn execute_with_host(
    program: &Program,
    host: HostEnvironment,
    options: ExecOptions,
) -> InterpResult<ExecutionResult> {
    Interpreter::new(host, options).run(program)
}

//! Calls: direct, UFCS, host, and the user-function frame protocol

use super::context::RefTarget;
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::eval::{Interpreter, Signal};
use super::expr::{STACK_GROW_SIZE, STACK_RED_ZONE, array_index};
use super::functions::Overload;
use super::host::{HostEntry, HostFunction};
use super::resolve::{Resolution, Scope, resolve_member, unknown_method};
use super::types::check_type;
use super::value::Value;
use crate::ast::{ExitKind, Expr, ExprKind, FunctionDecl, TypeAnnotation};
use std::rc::Rc;

/// An evaluated argument, with the slot it came from when it has one
pub(super) struct Arg {
    pub value: Value,
    pub place: Option<RefTarget>,
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg { value, place: None }
    }
}

impl Interpreter {
    fn scope(&self) -> Scope<'_> {
        Scope {
            functions: &self.ctx.functions,
            properties: &self.ctx.properties,
            host: &self.host,
        }
    }

    // ---------------------------------------------------------------
    // Argument evaluation
    // ---------------------------------------------------------------

    /// Evaluate arguments for a user function, keeping REF-able slots.
    fn eval_args(&mut self, exprs: &[Expr]) -> InterpResult<Vec<Arg>> {
        let mut args = Vec::with_capacity(exprs.len());
        for expr in exprs {
            if let ExprKind::Spread(inner) = &expr.kind {
                let value = self.eval(inner)?;
                let mut values = Vec::new();
                self.spread_into(&value, &mut values).map_err(|e| e.at(&expr.token))?;
                args.extend(values.into_iter().map(Arg::from));
            } else {
                args.push(self.eval_arg(expr).map_err(|e| e.at(&expr.token))?);
            }
        }
        Ok(args)
    }

    /// Evaluate one argument once, noting its slot if it is a variable,
    /// a record field or an array element.
    fn eval_arg(&mut self, expr: &Expr) -> InterpResult<Arg> {
        match &expr.kind {
            ExprKind::Variable(name) if self.ctx.has_var(name) => {
                let place = self.ctx.local_target(name);
                let value = self.eval(expr)?;
                Ok(Arg { value, place })
            }
            ExprKind::Member { object, name } => {
                let object = self.eval(object)?;
                self.field_arg(object, name)
            }
            ExprKind::WithField(name) => {
                let object = self.with_target()?;
                self.field_arg(object, name)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.element_arg(object, &index)
            }
            ExprKind::Call { callee, args } if args.len() == 1 => {
                let array = match &callee.kind {
                    ExprKind::Variable(name) => match self.ctx.get_var(name)? {
                        Some(value @ Value::Array(_)) => Some(value),
                        _ => None,
                    },
                    _ => None,
                };
                match array {
                    Some(array) => {
                        let index = self.eval(&args[0])?;
                        self.element_arg(array, &index)
                    }
                    None => Ok(self.eval(expr)?.into()),
                }
            }
            _ => Ok(self.eval(expr)?.into()),
        }
    }

    fn field_arg(&mut self, object: Value, name: &str) -> InterpResult<Arg> {
        if let Value::Record(record) = &object {
            let field = record
                .borrow()
                .fields
                .iter()
                .find(|(field, _)| field.eq_ignore_ascii_case(name))
                .map(|(field, value)| (field.clone(), value.clone()));
            if let Some((field, value)) = field {
                return Ok(Arg {
                    value,
                    place: Some(RefTarget::Field {
                        record: Rc::clone(record),
                        name: field,
                    }),
                });
            }
        }
        Ok(self.member_value(&object, name)?.into())
    }

    fn element_arg(&mut self, object: Value, index: &Value) -> InterpResult<Arg> {
        let value = self.index_value(&object, index)?;
        let place = match &object {
            Value::Array(array) => Some(RefTarget::Element {
                array: Rc::clone(array),
                index: array_index(index, array.borrow().len())?,
            }),
            _ => None,
        };
        Ok(Arg { value, place })
    }

    // ---------------------------------------------------------------
    // Call dispatch
    // ---------------------------------------------------------------

    pub(super) fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> InterpResult<Value> {
        match &callee.kind {
            ExprKind::Variable(name) => self.call_by_name(name, args),
            ExprKind::Member { object, name } => {
                let object = self.eval(object)?;
                self.call_method(object, name, args)
            }
            _ => {
                let value = self.eval(callee)?;
                self.call_value(value, args)
            }
        }
    }

    /// `F(args)`: a variable holding a callable or array, then the overload
    /// set, then the host registry.
    fn call_by_name(&mut self, name: &str, args: &[Expr]) -> InterpResult<Value> {
        if let Some(value) = self.ctx.get_var(name)? {
            if !value.is_callable() && !matches!(value, Value::Array(_)) {
                return Err(RuntimeError::not_callable(&format!("'{name}' ({})", value.type_name())));
            }
            return self.call_value(value, args);
        }
        if self.ctx.functions.contains(name) {
            return self.call_named_function(name, args);
        }
        match self.host.get(name) {
            Some(HostEntry::Function(function)) => {
                let values = self.eval_values(args)?;
                self.invoke_host(&function, &values)
            }
            Some(HostEntry::Namespace(_)) => Err(RuntimeError::not_callable(&format!("namespace {name}"))),
            None => Err(self.unknown_identifier(name)),
        }
    }

    fn call_named_function(&mut self, name: &str, args: &[Expr]) -> InterpResult<Value> {
        let Some(set) = self.ctx.functions.get(name).cloned() else {
            return Err(self.unknown_identifier(name));
        };
        let args = self.eval_args(args)?;
        let values: Vec<Value> = args.iter().map(|a| a.value.clone()).collect();
        let overload = set.select(&values)?;
        self.call_user(overload, args)
    }

    pub(super) fn call_value(&mut self, callee: Value, args: &[Expr]) -> InterpResult<Value> {
        match callee {
            Value::Function(name) => self.call_named_function(&name, args),
            Value::BoundFunction { overload, receiver } => {
                let mut all = vec![Arg::from(*receiver)];
                all.extend(self.eval_args(args)?);
                self.call_overload(overload, all)
            }
            Value::HostFunction(function) => {
                let values = self.eval_values(args)?;
                self.invoke_host(&function, &values)
            }
            Value::BoundHost { function, receiver } => {
                let mut values = vec![*receiver];
                values.extend(self.eval_values(args)?);
                self.invoke_host(&function, &values)
            }
            Value::Array(_) if args.len() == 1 => {
                let index = self.eval(&args[0])?;
                self.index_value(&callee, &index)
            }
            other => Err(RuntimeError::not_callable(&other.type_name())),
        }
    }

    /// `receiver.name(args)`
    fn call_method(&mut self, receiver: Value, name: &str, args: &[Expr]) -> InterpResult<Value> {
        match resolve_member(&receiver, name, &self.scope())? {
            Resolution::Field(value) => self.call_value(value, args),
            Resolution::Property(getter) => {
                let value = self.call_user(getter, vec![receiver.into()])?;
                self.call_value(value, args)
            }
            Resolution::Overload(overload) => {
                let mut all = vec![Arg::from(receiver)];
                all.extend(self.eval_args(args)?);
                self.call_overload(overload, all)
            }
            Resolution::Namespace { entry, bind_receiver } => match entry {
                HostEntry::Function(function) => {
                    let mut values = if bind_receiver { vec![receiver] } else { Vec::new() };
                    values.extend(self.eval_values(args)?);
                    self.invoke_host(&function, &values)
                }
                HostEntry::Namespace(ns) => Err(RuntimeError::not_callable(&format!("namespace {}", ns.name()))),
            },
            Resolution::NotFound { suggestion } => Err(unknown_method(&receiver, name, suggestion.as_deref())),
        }
    }

    /// `receiver.name` without a call
    pub(super) fn member_value(&mut self, receiver: &Value, name: &str) -> InterpResult<Value> {
        match resolve_member(receiver, name, &self.scope())? {
            Resolution::Field(value) => Ok(value),
            Resolution::Property(getter) => self.call_user(getter, vec![receiver.clone().into()]),
            Resolution::Overload(overload) => Ok(Value::BoundFunction {
                overload,
                receiver: Box::new(receiver.clone()),
            }),
            Resolution::Namespace {
                entry: HostEntry::Function(function),
                bind_receiver: true,
            } => Ok(Value::BoundHost {
                function,
                receiver: Box::new(receiver.clone()),
            }),
            Resolution::Namespace { entry, .. } => Ok(entry.into_value()),
            Resolution::NotFound { suggestion } => Err(unknown_method(receiver, name, suggestion.as_deref())),
        }
    }

    fn invoke_host(&mut self, function: &Rc<dyn HostFunction>, args: &[Value]) -> InterpResult<Value> {
        tracing::debug!(function = function.name(), args = args.len(), "host call");
        function
            .invoke(args)
            .map_err(|message| RuntimeError::host(function.name(), &message))
    }

    /// Call a specific overload after checking it accepts the arguments.
    pub(super) fn call_overload(&mut self, overload: Rc<Overload>, args: Vec<Arg>) -> InterpResult<Value> {
        let values: Vec<Value> = args.iter().map(|a| a.value.clone()).collect();
        if !overload.accepts(&values) {
            let types: Vec<String> = values.iter().map(Value::type_name).collect();
            return Err(RuntimeError::new(
                ErrorKind::NoOverload,
                format!("{} does not accept ({})", overload.describe(), types.join(", ")),
            ));
        }
        self.call_user(overload, args)
    }

    // ---------------------------------------------------------------
    // User function frames
    // ---------------------------------------------------------------

    /// Run a user function body in a fresh frame.
    ///
    /// The caller's variables are parked and the callee starts on a copy.
    /// The callee's own defer stack drains before the caller's state comes
    /// back, and everything is restored whether or not the body failed.
    pub(super) fn call_user(&mut self, overload: Rc<Overload>, args: Vec<Arg>) -> InterpResult<Value> {
        if self.ctx.call_depth >= self.options.max_call_depth {
            return Err(RuntimeError::new(
                ErrorKind::CallDepth,
                format!("call depth limit of {} exceeded", self.options.max_call_depth),
            ));
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.call_user_inner(overload, args))
    }

    fn call_user_inner(&mut self, overload: Rc<Overload>, args: Vec<Arg>) -> InterpResult<Value> {
        let decl = Rc::clone(&overload.decl);
        tracing::debug!(function = %overload.describe(), depth = self.ctx.call_depth, "call");

        self.ctx.push_frame()?;
        let saved_defers = std::mem::take(&mut self.ctx.defers);
        let saved_with = std::mem::take(&mut self.ctx.with_stack);
        let saved_bindings = std::mem::replace(&mut self.bindings, Rc::clone(&overload.bindings));
        self.ctx.call_depth += 1;

        let outcome = self.bind_params(&decl, args).and_then(|()| self.exec_block(&decl.body));
        let outcome = self.finish_scope(outcome);

        self.ctx.call_depth -= 1;
        self.bindings = saved_bindings;
        self.ctx.with_stack = saved_with;
        self.ctx.defers = saved_defers;
        self.ctx.pop_frame();

        let value = match outcome? {
            Signal::Return(Some(value)) => value,
            Signal::None | Signal::Jump(_) | Signal::Return(None) | Signal::Exit(ExitKind::Sub | ExitKind::Function) => {
                self.default_return(&decl)?
            }
            Signal::Halt(reason) => return Err(RuntimeError::halt(reason)),
            Signal::Exit(ExitKind::Loop(_)) => {
                return Err(RuntimeError::invalid_control(&format!("EXIT loop escaped from {}", decl.name)));
            }
            Signal::Continue(_) => {
                return Err(RuntimeError::invalid_control(&format!("CONTINUE escaped from {}", decl.name)));
            }
        };
        if let Some(ty) = &decl.return_type {
            check_type(&value, ty, &format!("{} return value", decl.name))?;
        }
        Ok(value)
    }

    /// Result of a body that falls off the end. An undeclared return type
    /// follows the function name's suffix, and `ANY` gives 0.
    fn default_return(&self, decl: &FunctionDecl) -> InterpResult<Value> {
        let ty = match &decl.return_type {
            Some(ty) => ty.clone(),
            None => TypeAnnotation::infer_from_suffix(&decl.name),
        };
        match ty {
            TypeAnnotation::Any => Ok(Value::Number(0.0)),
            ty => self.ctx.types.default_value(&ty),
        }
    }

    /// Bind parameters left to right in the callee frame. Defaults are
    /// evaluated here, so they see earlier parameters.
    fn bind_params(&mut self, decl: &FunctionDecl, args: Vec<Arg>) -> InterpResult<()> {
        let mut args = args.into_iter();
        for param in &decl.params {
            if param.variadic {
                let rest: Vec<Value> = args.by_ref().map(|arg| arg.value).collect();
                self.ctx.bind_local(&param.name, Value::array(rest));
                continue;
            }
            let ty = param.effective_type();
            let what = format!("parameter {} of {}", param.name, decl.name);
            match args.next() {
                Some(Arg { value, place }) => {
                    check_type(&value, &ty, &what)?;
                    match place {
                        Some(target) if param.by_ref => self.ctx.bind_ref(&param.name, target),
                        _ => self.ctx.bind_local(&param.name, value),
                    }
                }
                None => {
                    let value = match &param.default {
                        Some(expr) => self.eval(expr)?,
                        None if ty == TypeAnnotation::Any => Value::Number(0.0),
                        None => self.ctx.types.default_value(&ty)?,
                    };
                    check_type(&value, &ty, &what)?;
                    self.ctx.bind_local(&param.name, value);
                }
            }
        }
        Ok(())
    }
}

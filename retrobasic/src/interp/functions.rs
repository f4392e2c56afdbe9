//! User function overload sets and property accessors

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::types::matches_type;
use super::value::Value;
use crate::ast::{Accessor, FunctionDecl, LoopBindings, PropertyDecl, StmtId, TypeAnnotation};
use std::collections::HashMap;
use std::rc::Rc;

/// One member of an overload set.
///
/// The body's FOR/NEXT bindings travel with it: statement ids are only
/// unique within one parse, and a REPL session accumulates many parses.
#[derive(Debug)]
pub struct Overload {
    pub name: String,
    pub decl: Rc<FunctionDecl>,
    pub signature: Vec<TypeAnnotation>,
    pub bindings: Rc<LoopBindings>,
    origin: StmtId,
}

impl Overload {
    pub fn new(decl: FunctionDecl, origin: StmtId, bindings: Rc<LoopBindings>) -> Self {
        let signature = decl.params.iter().map(|p| p.effective_type()).collect();
        Overload {
            name: decl.name.clone(),
            decl: Rc::new(decl),
            signature,
            bindings,
            origin,
        }
    }

    fn fixed_params(&self) -> usize {
        self.decl.params.iter().filter(|p| !p.variadic).count()
    }

    fn is_variadic(&self) -> bool {
        self.decl.params.last().is_some_and(|p| p.variadic)
    }

    /// Arguments that must be supplied (trailing defaults may be omitted)
    pub fn min_arity(&self) -> usize {
        self.decl
            .params
            .iter()
            .rposition(|p| !p.variadic && p.default.is_none())
            .map_or(0, |i| i + 1)
    }

    /// Element type a variadic parameter accepts
    fn variadic_element_type(&self) -> TypeAnnotation {
        match self.decl.params.last().and_then(|p| p.ty.clone()) {
            Some(TypeAnnotation::Array) | None => TypeAnnotation::Any,
            Some(ty) => ty,
        }
    }

    fn param_accepts(&self, index: usize, value: &Value) -> bool {
        if index < self.fixed_params() {
            matches_type(value, &self.signature[index])
        } else {
            self.is_variadic() && matches_type(value, &self.variadic_element_type())
        }
    }

    /// Arity and per-argument type match
    pub fn accepts(&self, args: &[Value]) -> bool {
        let arity_ok = args.len() >= self.min_arity() && (self.is_variadic() || args.len() <= self.fixed_params());
        arity_ok && args.iter().enumerate().all(|(i, arg)| self.param_accepts(i, arg))
    }

    /// Whether `receiver` fits the first parameter (UFCS)
    pub fn accepts_receiver(&self, receiver: &Value) -> bool {
        !self.decl.params.is_empty() && self.param_accepts(0, receiver)
    }

    /// `Name(T1, T2...)` for diagnostics
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .decl
            .params
            .iter()
            .zip(&self.signature)
            .map(|(param, ty)| {
                if param.variadic {
                    format!("{}...", self.variadic_element_type())
                } else {
                    ty.to_string()
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    fn signature_key(&self) -> String {
        self.describe().to_ascii_uppercase()
    }

    fn same_origin(&self, other: &Overload) -> bool {
        self.origin == other.origin && Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}

/// All overloads sharing a name
#[derive(Debug, Clone)]
pub struct OverloadSet {
    pub name: String,
    pub overloads: Vec<Rc<Overload>>,
}

fn describe_args(args: &[Value]) -> String {
    args.iter().map(Value::type_name).collect::<Vec<_>>().join(", ")
}

fn describe_candidates(candidates: &[Rc<Overload>]) -> String {
    candidates.iter().map(|o| o.describe()).collect::<Vec<_>>().join(", ")
}

impl OverloadSet {
    /// Pick the single overload accepting `args`.
    pub fn select(&self, args: &[Value]) -> InterpResult<Rc<Overload>> {
        let matching: Vec<Rc<Overload>> = self.overloads.iter().filter(|o| o.accepts(args)).cloned().collect();
        match matching.as_slice() {
            [only] => Ok(Rc::clone(only)),
            [] => Err(RuntimeError::new(
                ErrorKind::NoOverload,
                format!(
                    "no overload of {} accepts ({}); candidates: {}",
                    self.name,
                    describe_args(args),
                    describe_candidates(&self.overloads)
                ),
            )),
            several => Err(RuntimeError::new(
                ErrorKind::AmbiguousMethod,
                format!(
                    "ambiguous call to {}({}): candidates {}",
                    self.name,
                    describe_args(args),
                    describe_candidates(several)
                ),
            )),
        }
    }
}

/// Function name → overload set, case-insensitive
#[derive(Debug, Default)]
pub struct FunctionTable {
    sets: HashMap<String, OverloadSet>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an overload. A repeated signature is an error unless it comes
    /// from the same declaration being executed again.
    pub fn define(&mut self, decl: &FunctionDecl, origin: StmtId, bindings: Rc<LoopBindings>) -> InterpResult<()> {
        let overload = Overload::new(decl.clone(), origin, bindings);
        let set = self
            .sets
            .entry(decl.name.to_ascii_uppercase())
            .or_insert_with(|| OverloadSet {
                name: decl.name.clone(),
                overloads: Vec::new(),
            });
        let key = overload.signature_key();
        if let Some(existing) = set.overloads.iter().find(|o| o.signature_key() == key) {
            if existing.same_origin(&overload) {
                return Ok(());
            }
            return Err(RuntimeError::new(
                ErrorKind::DuplicateDefinition,
                format!("{} is already defined", overload.describe()),
            ));
        }
        tracing::debug!(function = %overload.describe(), "registered overload");
        set.overloads.push(Rc::new(overload));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OverloadSet> {
        self.sets.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overloads named `name` whose first parameter accepts `receiver`
    pub fn receivers(&self, name: &str, receiver: &Value) -> Vec<Rc<Overload>> {
        self.get(name)
            .map(|set| {
                set.overloads
                    .iter()
                    .filter(|o| o.accepts_receiver(receiver))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.values().map(|set| set.name.as_str())
    }
}

/// GET/SET accessors for one `Type.Name`
#[derive(Debug, Default, Clone)]
pub struct PropertyEntry {
    pub getter: Option<Rc<Overload>>,
    pub setter: Option<Rc<Overload>>,
}

/// Property accessors keyed by (type, property), case-insensitive
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: HashMap<(String, String), PropertyEntry>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, decl: &PropertyDecl, origin: StmtId, bindings: Rc<LoopBindings>) -> InterpResult<()> {
        let function = FunctionDecl {
            name: format!("{}.{}", decl.type_name, decl.name),
            params: decl.params.clone(),
            return_type: decl.return_type.clone(),
            body: decl.body.clone(),
            is_sub: decl.accessor == Accessor::Set,
        };
        let accessor = Rc::new(Overload::new(function, origin, bindings));
        let entry = self
            .entries
            .entry((decl.type_name.to_ascii_uppercase(), decl.name.to_ascii_uppercase()))
            .or_default();
        let slot = match decl.accessor {
            Accessor::Get => &mut entry.getter,
            Accessor::Set => &mut entry.setter,
        };
        if let Some(existing) = slot {
            if existing.same_origin(&accessor) {
                return Ok(());
            }
            let which = if decl.accessor == Accessor::Get { "GET" } else { "SET" };
            return Err(RuntimeError::new(
                ErrorKind::DuplicateDefinition,
                format!("PROPERTY {}.{} {which} is already defined", decl.type_name, decl.name),
            ));
        }
        tracing::debug!(property = %accessor.name, "registered property");
        *slot = Some(accessor);
        Ok(())
    }

    fn entry(&self, type_name: &str, name: &str) -> Option<&PropertyEntry> {
        self.entries
            .get(&(type_name.to_ascii_uppercase(), name.to_ascii_uppercase()))
    }

    pub fn getter(&self, type_name: &str, name: &str) -> Option<Rc<Overload>> {
        self.entry(type_name, name).and_then(|e| e.getter.clone())
    }

    pub fn setter(&self, type_name: &str, name: &str) -> Option<Rc<Overload>> {
        self.entry(type_name, name).and_then(|e| e.setter.clone())
    }
}

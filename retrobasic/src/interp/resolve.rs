//! Member resolution for `receiver.name`
//!
//! Resolution is a pure lookup over the receiver's runtime type and the
//! registered tables. The evaluator decides what to do with the outcome.

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::functions::{FunctionTable, Overload, PropertyTable};
use super::host::{HostEntry, HostEnvironment};
use super::stdlib::UFCS_PROBE_NAMESPACES;
use super::value::Value;
use crate::util::{SUGGESTION_THRESHOLD, find_similar_name, format_suggestion_hint};
use std::rc::Rc;

/// What `receiver.name` refers to
pub enum Resolution {
    /// A record field's current value
    Field(Value),
    /// A property getter to invoke with the receiver as `self`
    Property(Rc<Overload>),
    /// A user overload taking the receiver as its first argument
    Overload(Rc<Overload>),
    /// A host entry; `bind_receiver` is set for the built-in namespace probe
    Namespace { entry: HostEntry, bind_receiver: bool },
    NotFound { suggestion: Option<String> },
}

impl Resolution {
    fn kind(&self) -> &'static str {
        match self {
            Resolution::Field(_) => "field",
            Resolution::Property(_) => "property",
            Resolution::Overload(_) => "overload",
            Resolution::Namespace { .. } => "namespace",
            Resolution::NotFound { .. } => "not found",
        }
    }
}

/// Tables consulted during resolution
pub struct Scope<'a> {
    pub functions: &'a FunctionTable,
    pub properties: &'a PropertyTable,
    pub host: &'a HostEnvironment,
}

/// Resolve `receiver.name`.
///
/// Order: namespace member, record field, property getter, a single user
/// overload whose first parameter accepts the receiver, then (for
/// non-records) the built-in namespaces. Several matching overloads is an
/// error naming every candidate.
pub fn resolve_member(receiver: &Value, name: &str, scope: &Scope<'_>) -> InterpResult<Resolution> {
    let resolution = resolve_inner(receiver, name, scope)?;
    tracing::trace!(receiver = %receiver.type_name(), member = name, outcome = resolution.kind(), "resolved member");
    Ok(resolution)
}

fn resolve_inner(receiver: &Value, name: &str, scope: &Scope<'_>) -> InterpResult<Resolution> {
    if let Value::Namespace(ns) = receiver {
        return Ok(match ns.get_member(name) {
            Some(entry) => Resolution::Namespace {
                entry,
                bind_receiver: false,
            },
            None => Resolution::NotFound {
                suggestion: find_similar_name(name, ns.member_names(), SUGGESTION_THRESHOLD),
            },
        });
    }

    if let Value::Record(record) = receiver {
        let record = record.borrow();
        if let Some(value) = record.get(name) {
            return Ok(Resolution::Field(value.clone()));
        }
        if let Some(getter) = scope.properties.getter(&record.type_name, name) {
            return Ok(Resolution::Property(getter));
        }
    }

    let candidates = scope.functions.receivers(name, receiver);
    match candidates.as_slice() {
        [only] => return Ok(Resolution::Overload(Rc::clone(only))),
        [] => {}
        several => {
            let names: Vec<String> = several.iter().map(|o| o.describe()).collect();
            return Err(RuntimeError::new(
                ErrorKind::AmbiguousMethod,
                format!(
                    "ambiguous method '{name}' for {}: candidates {}",
                    receiver.type_name(),
                    names.join(", ")
                ),
            ));
        }
    }

    if !matches!(receiver, Value::Record(_)) {
        for ns_name in UFCS_PROBE_NAMESPACES {
            if let Some(entry) = scope.host.namespace(ns_name).and_then(|ns| ns.get_member(name)) {
                return Ok(Resolution::Namespace {
                    entry,
                    bind_receiver: true,
                });
            }
        }
    }

    Ok(Resolution::NotFound {
        suggestion: suggest(receiver, name, scope),
    })
}

fn suggest(receiver: &Value, name: &str, scope: &Scope<'_>) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();
    if let Value::Record(record) = receiver {
        candidates.extend(record.borrow().fields.iter().map(|(field, _)| field.clone()));
    }
    candidates.extend(scope.functions.names().map(str::to_string));
    for ns_name in UFCS_PROBE_NAMESPACES {
        if let Some(ns) = scope.host.namespace(ns_name) {
            candidates.extend(ns.member_names());
        }
    }
    find_similar_name(name, &candidates, SUGGESTION_THRESHOLD)
}

/// The `UNKNOWN_METHOD` error for a failed resolution
pub fn unknown_method(receiver: &Value, name: &str, suggestion: Option<&str>) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::UnknownMethod,
        format!(
            "unknown method '{name}' for {}{}",
            receiver.type_name(),
            format_suggestion_hint(suggestion)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionDecl, Param, StmtId, TypeAnnotation};
    use crate::interp::value::Record;

    fn unary(name: &str, ty: TypeAnnotation) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: vec![Param {
                name: "self".into(),
                by_ref: false,
                ty: Some(ty),
                default: None,
                variadic: false,
            }],
            return_type: None,
            body: Vec::new(),
            is_sub: false,
        }
    }

    struct Tables {
        functions: FunctionTable,
        properties: PropertyTable,
        host: HostEnvironment,
    }

    impl Tables {
        fn new(decls: &[FunctionDecl]) -> Self {
            let mut functions = FunctionTable::new();
            for (i, decl) in decls.iter().enumerate() {
                functions.define(decl, StmtId(i as u32), Rc::default()).unwrap();
            }
            Tables {
                functions,
                properties: PropertyTable::new(),
                host: HostEnvironment::with_stdlib(),
            }
        }

        fn scope(&self) -> Scope<'_> {
            Scope {
                functions: &self.functions,
                properties: &self.properties,
                host: &self.host,
            }
        }
    }

    fn vector() -> Value {
        Value::record(Record::new("Vector", vec![("x".into(), 3.0.into()), ("y".into(), 4.0.into())]))
    }

    #[test]
    fn test_field_wins_over_function() {
        let tables = Tables::new(&[unary("x", TypeAnnotation::Named("Vector".into()))]);
        let resolved = resolve_member(&vector(), "X", &tables.scope()).unwrap();
        assert!(matches!(resolved, Resolution::Field(Value::Number(n)) if n == 3.0));
    }

    #[test]
    fn test_single_overload_binds() {
        let tables = Tables::new(&[
            unary("Length", TypeAnnotation::Named("Vector".into())),
            unary("Length", TypeAnnotation::String),
        ]);
        let Resolution::Overload(o) = resolve_member(&vector(), "length", &tables.scope()).unwrap() else {
            panic!("expected overload");
        };
        assert_eq!(o.describe(), "Length(Vector)");
    }

    #[test]
    fn test_two_matching_overloads_are_ambiguous() {
        let tables = Tables::new(&[
            unary("Area", TypeAnnotation::Named("Vector".into())),
            unary("Area", TypeAnnotation::Any),
        ]);
        let err = resolve_member(&vector(), "Area", &tables.scope()).err().unwrap();
        assert_eq!(err.code(), "AMBIGUOUS_METHOD");
        assert!(err.message.contains("Area(Vector)"));
        assert!(err.message.contains("Area(ANY)"));
    }

    #[test]
    fn test_builtin_namespace_probe_for_strings() {
        let tables = Tables::new(&[]);
        let resolved = resolve_member(&Value::str("abc"), "upper", &tables.scope()).unwrap();
        assert!(matches!(resolved, Resolution::Namespace { bind_receiver: true, .. }));
    }

    #[test]
    fn test_records_skip_namespace_probe() {
        let tables = Tables::new(&[]);
        let resolved = resolve_member(&vector(), "upper", &tables.scope()).unwrap();
        assert!(matches!(resolved, Resolution::NotFound { .. }));
    }

    #[test]
    fn test_namespace_member_lookup() {
        let tables = Tables::new(&[]);
        let math = tables.host.get("MATH").unwrap().into_value();
        let resolved = resolve_member(&math, "sqrt", &tables.scope()).unwrap();
        assert!(matches!(resolved, Resolution::Namespace { bind_receiver: false, .. }));
        let Resolution::NotFound { suggestion } = resolve_member(&math, "sqrtt", &tables.scope()).unwrap() else {
            panic!("expected not found");
        };
        assert_eq!(suggestion.as_deref(), Some("SQRT"));
    }

    #[test]
    fn test_not_found_suggests_function() {
        let tables = Tables::new(&[unary("Length", TypeAnnotation::Named("Vector".into()))]);
        let Resolution::NotFound { suggestion } = resolve_member(&vector(), "Lenght", &tables.scope()).unwrap() else {
            panic!("expected not found");
        };
        assert_eq!(suggestion.as_deref(), Some("Length"));
        let err = unknown_method(&vector(), "Lenght", suggestion.as_deref());
        assert_eq!(err.code(), "UNKNOWN_METHOD");
        assert!(err.message.contains("did you mean 'Length'"));
    }
}

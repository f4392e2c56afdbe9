//! Record type definitions and type-annotation checks

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::value::{Record, Value};
use crate::ast::{FieldDecl, TypeAnnotation, TypeDecl};
use std::collections::HashMap;
use std::rc::Rc;

/// Nesting limit for default-initialising records whose fields are records
const MAX_DEFAULT_DEPTH: usize = 32;

/// A registered `TYPE ... END TYPE`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub spread: Option<Vec<String>>,
}

impl TypeDef {
    pub fn from_decl(decl: &TypeDecl) -> Self {
        TypeDef {
            name: decl.name.clone(),
            fields: decl.fields.clone(),
            spread: decl.spread.clone(),
        }
    }

    pub fn field_type(&self, name: &str) -> Option<&TypeAnnotation> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| &field.ty)
    }

    /// Canonical field name as declared
    pub fn field_name(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.name.as_str())
    }

    /// Field order used when spreading a record: SPREAD order, else declaration order.
    pub fn spread_order(&self) -> Vec<String> {
        match &self.spread {
            Some(order) => order.clone(),
            None => self.fields.iter().map(|f| f.name.clone()).collect(),
        }
    }
}

/// Type table, keyed case-insensitively
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Rc<TypeDef>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, decl: &TypeDecl) -> InterpResult<()> {
        let key = decl.name.to_ascii_uppercase();
        if self.types.contains_key(&key) {
            return Err(RuntimeError::new(
                ErrorKind::DuplicateDefinition,
                format!("TYPE {} is already defined", decl.name),
            ));
        }
        tracing::debug!(name = %decl.name, fields = decl.fields.len(), "registered type");
        self.types.insert(key, Rc::new(TypeDef::from_decl(decl)));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<TypeDef>> {
        self.types.get(&name.to_ascii_uppercase()).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.values().map(|def| def.name.as_str())
    }

    /// Default value for an annotation
    pub fn default_value(&self, ty: &TypeAnnotation) -> InterpResult<Value> {
        self.default_value_depth(ty, 0)
    }

    fn default_value_depth(&self, ty: &TypeAnnotation, depth: usize) -> InterpResult<Value> {
        Ok(match ty {
            TypeAnnotation::Number | TypeAnnotation::Bool | TypeAnnotation::Any | TypeAnnotation::Function => {
                Value::Number(0.0)
            }
            TypeAnnotation::String => Value::str(""),
            TypeAnnotation::Array => Value::array(Vec::new()),
            TypeAnnotation::Named(name) => {
                let def = self.get(name).ok_or_else(|| unknown_type(name))?;
                if depth >= MAX_DEFAULT_DEPTH {
                    return Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!("TYPE {} nests itself too deeply to default-initialise", def.name),
                    ));
                }
                let fields = def
                    .fields
                    .iter()
                    .map(|field| Ok((field.name.clone(), self.default_value_depth(&field.ty, depth + 1)?)))
                    .collect::<InterpResult<Vec<_>>>()?;
                Value::record(Record::new(def.name.clone(), fields))
            }
        })
    }
}

fn unknown_type(name: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::TypeMismatch, format!("unknown TYPE {name}"))
}

/// Whether a runtime value satisfies an annotation
pub fn matches_type(value: &Value, ty: &TypeAnnotation) -> bool {
    match ty {
        TypeAnnotation::Any => true,
        TypeAnnotation::Number | TypeAnnotation::Bool => matches!(value, Value::Number(_)),
        TypeAnnotation::String => matches!(value, Value::Str(_)),
        TypeAnnotation::Array => matches!(value, Value::Array(_)),
        TypeAnnotation::Function => value.is_callable(),
        TypeAnnotation::Named(name) => match value {
            Value::Record(record) => record.borrow().type_name.eq_ignore_ascii_case(name),
            _ => false,
        },
    }
}

/// Type check producing a `TYPE_MISMATCH` naming what was expected
pub fn check_type(value: &Value, ty: &TypeAnnotation, what: &str) -> InterpResult<()> {
    if matches_type(value, ty) {
        Ok(())
    } else {
        Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("type mismatch: {what} expects {ty}, got {}", value.type_name()),
        ))
    }
}

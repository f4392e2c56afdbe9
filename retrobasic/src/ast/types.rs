//! Type annotations

use serde::{Deserialize, Serialize};

/// A declared `AS` type, or the type inferred from a name suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeAnnotation {
    Number,
    String,
    Bool,
    Array,
    Function,
    Any,
    /// A `TYPE ... END TYPE` record name
    Named(String),
}

impl TypeAnnotation {
    /// Parse the word after `AS`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "NUMBER" | "INTEGER" | "LONG" | "SINGLE" | "DOUBLE" => TypeAnnotation::Number,
            "STRING" => TypeAnnotation::String,
            "BOOL" | "BOOLEAN" => TypeAnnotation::Bool,
            "ARRAY" => TypeAnnotation::Array,
            "FUNCTION" => TypeAnnotation::Function,
            "ANY" => TypeAnnotation::Any,
            _ => TypeAnnotation::Named(name.to_string()),
        }
    }

    /// Naming-convention default for an unannotated name.
    pub fn infer_from_suffix(name: &str) -> Self {
        match name.chars().last() {
            Some('$') => TypeAnnotation::String,
            Some('%' | '!' | '&' | '#') => TypeAnnotation::Number,
            _ => TypeAnnotation::Any,
        }
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeAnnotation::Number => write!(f, "NUMBER"),
            TypeAnnotation::String => write!(f, "STRING"),
            TypeAnnotation::Bool => write!(f, "BOOL"),
            TypeAnnotation::Array => write!(f, "ARRAY"),
            TypeAnnotation::Function => write!(f, "FUNCTION"),
            TypeAnnotation::Any => write!(f, "ANY"),
            TypeAnnotation::Named(name) => write!(f, "{name}"),
        }
    }
}

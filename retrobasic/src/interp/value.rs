//! Runtime values for the interpreter

use super::error::{InterpResult, RuntimeError};
use super::functions::Overload;
use super::host::{HostFunction, HostNamespace};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable array storage. Arrays are reference values.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Identity of two arrays being compared
type ArrayPair = (*const RefCell<Vec<Value>>, *const RefCell<Vec<Value>>);

/// Shared, mutable record storage. Records are reference values.
pub type RecordRef = Rc<RefCell<Record>>;

/// Display nesting limit for self-referencing arrays and records
const MAX_DISPLAY_DEPTH: usize = 16;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    /// 64-bit float; booleans are -1 / 0
    Number(f64),
    Str(String),
    Array(ArrayRef),
    Record(RecordRef),
    /// A user function, by overload-set name
    Function(String),
    /// `obj.f` resolved through UFCS: `f` with `obj` as first argument
    BoundFunction {
        overload: Rc<Overload>,
        receiver: Box<Value>,
    },
    HostFunction(Rc<dyn HostFunction>),
    /// Host function with an implicit first argument
    BoundHost {
        function: Rc<dyn HostFunction>,
        receiver: Box<Value>,
    },
    Namespace(Rc<dyn HostNamespace>),
}

/// A nominally typed record: type name plus ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

/// Type name of `{key: value}` literals
pub const OBJECT_TYPE: &str = "Object";

/// Type name of records bound by `CATCH`
pub const ERROR_TYPE: &str = "Error";

impl Record {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Record {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Field lookup; field names are case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overwrite an existing field. Returns false when there is no such field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.fields.iter_mut().find(|(field, _)| field.eq_ignore_ascii_case(name)) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite or append.
    pub fn insert(&mut self, name: &str, value: Value) {
        if !self.set(name, value.clone()) {
            self.fields.push((name.to_string(), value));
        }
    }

    pub fn is_object(&self) -> bool {
        self.type_name == OBJECT_TYPE
    }
}

/// Magnitudes at or past this print in exponent form
const EXPONENT_ABOVE: f64 = 1e16;
/// Non-zero magnitudes below this print in exponent form
const EXPONENT_BELOW: f64 = 1e-7;

/// Number formatting used by PRINT and string conversion
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Covers -0
        "0".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.abs() >= EXPONENT_ABOVE || n.abs() < EXPONENT_BELOW {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}E+{exp}"),
            Some((mantissa, exp)) => format!("{mantissa}E{exp}"),
            None => text,
        }
    } else {
        n.to_string()
    }
}

/// Parse a decimal literal: optional sign, digits with an optional
/// fraction, optional exponent. Words like `inf` and `NaN` are rejected.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_from = |i: usize| bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();

    let whole = digits_from(i);
    i += whole;
    let mut fraction = 0;
    if bytes.get(i) == Some(&b'.') {
        fraction = digits_from(i + 1);
        i += 1 + fraction;
    }
    if whole + fraction == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(i + 1), Some(b'+' | b'-')));
        let exp = digits_from(i + 1 + sign);
        if exp == 0 {
            return None;
        }
        i += 1 + sign + exp;
    }
    if i != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl Value {
    pub fn from_bool(b: bool) -> Self {
        Value::Number(if b { -1.0 } else { 0.0 })
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn record(record: Record) -> Self {
        Value::Record(Rc::new(RefCell::new(record)))
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            _ => true,
        }
    }

    /// Get type name for error messages and type matching
    pub fn type_name(&self) -> String {
        match self {
            Value::Number(_) => "NUMBER".to_string(),
            Value::Str(_) => "STRING".to_string(),
            Value::Array(_) => "ARRAY".to_string(),
            Value::Record(record) => record.borrow().type_name.clone(),
            Value::Function(_)
            | Value::BoundFunction { .. }
            | Value::HostFunction(_)
            | Value::BoundHost { .. } => "FUNCTION".to_string(),
            Value::Namespace(_) => "NAMESPACE".to_string(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::BoundFunction { .. } | Value::HostFunction(_) | Value::BoundHost { .. }
        )
    }

    /// Numeric view; numeric strings convert.
    pub fn as_number(&self) -> InterpResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Str(s) => parse_decimal(s.trim())
                .ok_or_else(|| RuntimeError::type_mismatch("NUMBER", &format!("STRING {s:?}"))),
            other => Err(RuntimeError::type_mismatch("NUMBER", &other.type_name())),
        }
    }

    /// Equality used by `=` and `<>`: strings compare exactly, records by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        self.equals(other, false, &mut Vec::new())
    }

    /// Equality used by SELECT CASE: strings compare case-insensitively.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.equals(other, true, &mut Vec::new())
    }

    /// `seen` holds the array pairs already under comparison; meeting one
    /// again means a cycle, which compares equal.
    fn equals(&self, other: &Value, fold_case: bool, seen: &mut Vec<ArrayPair>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => {
                if fold_case {
                    a.to_lowercase() == b.to_lowercase()
                } else {
                    a == b
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if Rc::ptr_eq(a, b) || seen.contains(&pair) {
                    return true;
                }
                seen.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let same = a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, fold_case, seen));
                seen.pop();
                same
            }
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.eq_ignore_ascii_case(b),
            (Value::HostFunction(a), Value::HostFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// JSON view for variable dumps
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_depth(0)
    }

    fn to_json_depth(&self, depth: usize) -> serde_json::Value {
        if depth > MAX_DISPLAY_DEPTH {
            return serde_json::Value::Null;
        }
        match self {
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(|v| v.to_json_depth(depth + 1)).collect())
            }
            Value::Record(record) => {
                let record = record.borrow();
                let mut map = serde_json::Map::new();
                if !record.is_object() {
                    map.insert("$type".to_string(), serde_json::Value::String(record.type_name.clone()));
                }
                for (name, value) in &record.fields {
                    map.insert(name.clone(), value.to_json_depth(depth + 1));
                }
                serde_json::Value::Object(map)
            }
            other => serde_json::Value::String(other.to_string()),
        }
    }

    fn fmt_depth(&self, f: &mut fmt::Formatter<'_>, depth: usize, quoted: bool) -> fmt::Result {
        if depth > MAX_DISPLAY_DEPTH {
            return write!(f, "...");
        }
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) if quoted => write!(f, "{s:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_depth(f, depth + 1, true)?;
                }
                write!(f, "]")
            }
            Value::Record(record) => {
                let record = record.borrow();
                if !record.is_object() {
                    write!(f, "{}", record.type_name)?;
                }
                write!(f, "{{")?;
                for (i, (name, value)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: ")?;
                    value.fmt_depth(f, depth + 1, true)?;
                }
                write!(f, "}}")
            }
            Value::Function(name) => write!(f, "<FUNCTION {name}>"),
            Value::BoundFunction { overload, .. } => write!(f, "<FUNCTION {}>", overload.name),
            Value::HostFunction(function) | Value::BoundHost { function, .. } => {
                write!(f, "<FUNCTION {}>", function.name())
            }
            Value::Namespace(ns) => write!(f, "<NAMESPACE {}>", ns.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_depth(f, 0, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Number(n) => write!(f, "Number({n})"),
            other => write!(f, "{}({other})", other.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(1e21).to_string(), "1E+21");
        assert_eq!(Value::Number(-2.5e17).to_string(), "-2.5E+17");
        assert_eq!(Value::Number(1.5e-9).to_string(), "1.5E-9");
        assert_eq!(Value::Number(123456789012345.0).to_string(), "123456789012345");
    }

    #[test]
    fn test_parse_decimal_accepts_only_literals() {
        assert_eq!(parse_decimal("12"), Some(12.0));
        assert_eq!(parse_decimal("-3.5"), Some(-3.5));
        assert_eq!(parse_decimal(".5"), Some(0.5));
        assert_eq!(parse_decimal("2."), Some(2.0));
        assert_eq!(parse_decimal("1e3"), Some(1000.0));
        assert_eq!(parse_decimal("+1.5E-2"), Some(0.015));
        for text in ["inf", "-infinity", "NaN", "", ".", "1e", "e5", "1.2.3", "12abc", "1e999"] {
            assert_eq!(parse_decimal(text), None, "{text:?}");
        }
    }

    #[test]
    fn test_composite_display() {
        let arr = Value::array(vec![1.0.into(), "a".into()]);
        assert_eq!(arr.to_string(), r#"[1, "a"]"#);
        let rec = Value::record(Record::new("Vector", vec![("x".into(), 3.0.into()), ("y".into(), 4.0.into())]));
        assert_eq!(rec.to_string(), "Vector{x: 3, y: 4}");
        let obj = Value::record(Record::new(OBJECT_TYPE, vec![("k".into(), "v".into())]));
        assert_eq!(obj.to_string(), r#"{k: "v"}"#);
    }

    #[test]
    fn test_self_referencing_array_display_terminates() {
        let arr = Value::array(Vec::new());
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert!(arr.to_string().contains("..."));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::array(vec![]).is_truthy());
        assert!(Value::array(vec![Value::Number(0.0)]).is_truthy());
        assert!(Value::record(Record::new("T", vec![])).is_truthy());
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Value::from_bool(true), Value::Number(-1.0));
        assert_eq!(Value::from_bool(false), Value::Number(0.0));
    }

    #[test]
    fn test_as_number_coerces_numeric_strings() {
        assert_eq!(Value::str(" 2.5 ").as_number().unwrap(), 2.5);
        assert!(Value::str("abc").as_number().is_err());
        assert!(Value::str("inf").as_number().is_err());
        assert!(Value::str("NaN").as_number().is_err());
        assert!(Value::array(vec![]).as_number().is_err());
    }

    #[test]
    fn test_equality_rules() {
        assert!(Value::str("Abc").loose_eq(&Value::str("aBC")));
        assert!(!Value::str("Abc").strict_eq(&Value::str("aBC")));
        assert!(!Value::Number(1.0).strict_eq(&Value::str("1")));

        let a = Value::array(vec![1.0.into(), 2.0.into()]);
        let b = Value::array(vec![1.0.into(), 2.0.into()]);
        assert!(a.strict_eq(&b));

        let r1 = Value::record(Record::new("T", vec![("x".into(), 1.0.into())]));
        let r2 = Value::record(Record::new("T", vec![("x".into(), 1.0.into())]));
        assert!(r1.strict_eq(&r1.clone()));
        assert!(!r1.loose_eq(&r2));
    }

    #[test]
    fn test_equality_of_cyclic_arrays_terminates() {
        let cyclic = || {
            let arr = Value::array(vec![1.0.into()]);
            if let Value::Array(items) = &arr {
                items.borrow_mut().push(arr.clone());
            }
            arr
        };
        let (a, b) = (cyclic(), cyclic());
        assert!(a.strict_eq(&b));
        assert!(a.loose_eq(&b));
        if let Value::Array(items) = &b {
            items.borrow_mut()[0] = 2.0.into();
        }
        assert!(!a.strict_eq(&b));
    }

    #[test]
    fn test_record_fields_case_insensitive() {
        let mut record = Record::new("T", vec![("Name".into(), "a".into())]);
        assert_eq!(record.get("NAME"), Some(&Value::str("a")));
        assert!(record.set("name", "b".into()));
        assert!(!record.set("missing", "c".into()));
        record.insert("extra", 1.0.into());
        assert_eq!(record.fields.len(), 2);
    }

    #[test]
    fn test_to_json() {
        let rec = Value::record(Record::new("P", vec![("x".into(), 1.0.into())]));
        assert_eq!(rec.to_json(), serde_json::json!({"$type": "P", "x": 1.0}));
    }
}

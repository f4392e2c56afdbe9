//! Expression evaluation

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::eval::Interpreter;
use super::types::check_type;
use super::value::{OBJECT_TYPE, Record, Value};
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::util::{SUGGESTION_THRESHOLD, find_similar_name, format_suggestion_hint};
use std::cmp::Ordering;

/// Stack growth parameters for deeply nested expressions and calls
pub(super) const STACK_RED_ZONE: usize = 128 * 1024;
pub(super) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Zero-based index check shared by reads and writes
pub(super) fn array_index(index: &Value, len: usize) -> InterpResult<usize> {
    let n = index.as_number()?;
    if n < 0.0 || n.fract() != 0.0 || n >= len as f64 {
        return Err(RuntimeError::index_out_of_range(n, len));
    }
    Ok(n as usize)
}

fn unknown_type(name: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::TypeMismatch, format!("unknown TYPE {name}"))
}

impl Interpreter {
    pub(super) fn eval(&mut self, expr: &Expr) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr)).map_err(|e| e.at(&expr.token))
    }

    fn eval_inner(&mut self, expr: &Expr) -> InterpResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::str(s.clone())),
            ExprKind::Variable(name) => self.lookup(name),
            ExprKind::Array(items) => Ok(Value::array(self.eval_values(items)?)),
            ExprKind::Object(fields) => {
                let mut record = Record::new(OBJECT_TYPE, Vec::new());
                for (name, value) in fields {
                    let value = self.eval(value)?;
                    record.insert(name, value);
                }
                Ok(Value::record(record))
            }
            ExprKind::Record { type_name, fields } => self.eval_record_literal(type_name, fields),
            ExprKind::WithField(name) => {
                let target = self.with_target()?;
                self.member_value(&target, name)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Number(-value.as_number()?)),
                    UnaryOp::Plus => Ok(Value::Number(value.as_number()?)),
                    UnaryOp::Not => Ok(Value::from_bool(!value.is_truthy())),
                }
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args),
            ExprKind::Member { object, name } => {
                let object = self.eval(object)?;
                self.member_value(&object, name)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.index_value(&object, &index)
            }
            ExprKind::Spread(_) => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                "spread '...' is only allowed in argument and array lists",
            )),
            // Host calls complete synchronously, so AWAIT only evaluates.
            ExprKind::Await(inner) => self.eval(inner),
            ExprKind::New { type_name, args } => self.eval_new(type_name, args.as_deref()),
        }
    }

    /// Bare identifier: variable, then user function, then host entry.
    fn lookup(&self, name: &str) -> InterpResult<Value> {
        if let Some(value) = self.ctx.get_var(name)? {
            return Ok(value);
        }
        if let Some(set) = self.ctx.functions.get(name) {
            return Ok(Value::Function(set.name.clone()));
        }
        if let Some(entry) = self.host.get(name) {
            return Ok(entry.into_value());
        }
        Err(self.unknown_identifier(name))
    }

    pub(super) fn unknown_identifier(&self, name: &str) -> RuntimeError {
        let candidates: Vec<&str> = self
            .ctx
            .var_names()
            .chain(self.ctx.functions.names())
            .chain(self.host.names())
            .collect();
        let suggestion = find_similar_name(name, candidates, SUGGESTION_THRESHOLD);
        RuntimeError::unknown_identifier(name, &format_suggestion_hint(suggestion.as_deref()))
    }

    // ---------------------------------------------------------------
    // Lists and spreads
    // ---------------------------------------------------------------

    /// Evaluate a list, flattening `x...` items.
    pub(super) fn eval_values(&mut self, items: &[Expr]) -> InterpResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match &item.kind {
                ExprKind::Spread(inner) => {
                    let value = self.eval(inner)?;
                    self.spread_into(&value, &mut values).map_err(|e| e.at(&item.token))?;
                }
                _ => values.push(self.eval(item)?),
            }
        }
        Ok(values)
    }

    /// Flatten an array (elements) or record (spread order) into `out`.
    pub(super) fn spread_into(&self, value: &Value, out: &mut Vec<Value>) -> InterpResult<()> {
        match value {
            Value::Array(items) => out.extend(items.borrow().iter().cloned()),
            Value::Record(record) => {
                let record = record.borrow();
                let order = match self.ctx.types.get(&record.type_name) {
                    Some(def) => def.spread_order(),
                    None => record.fields.iter().map(|(name, _)| name.clone()).collect(),
                };
                for name in order {
                    let field = record.get(&name).cloned().ok_or_else(|| {
                        RuntimeError::new(
                            ErrorKind::UnknownField,
                            format!("{} has no field '{name}' to spread", record.type_name),
                        )
                    })?;
                    out.push(field);
                }
            }
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!("cannot spread {}", other.type_name()),
                ));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Records
    // ---------------------------------------------------------------

    fn eval_record_literal(&mut self, type_name: &str, fields: &[(String, Expr)]) -> InterpResult<Value> {
        let def = self.ctx.types.get(type_name).ok_or_else(|| unknown_type(type_name))?;
        let mut given: Vec<(String, Value)> = Vec::with_capacity(fields.len());
        for (name, expr) in fields {
            if def.field_name(name).is_none() {
                return Err(RuntimeError::new(
                    ErrorKind::UnknownField,
                    format!("TYPE {} has no field '{name}'", def.name),
                )
                .at(&expr.token));
            }
            given.push((name.clone(), self.eval(expr)?));
        }
        let mut out = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let supplied = given
                .iter()
                .rev()
                .find(|(name, _)| name.eq_ignore_ascii_case(&field.name))
                .map(|(_, value)| value.clone());
            let value = match supplied {
                Some(value) => value,
                None => self.ctx.types.default_value(&field.ty)?,
            };
            check_type(&value, &field.ty, &format!("field {}.{}", def.name, field.name))?;
            out.push((field.name.clone(), value));
        }
        Ok(Value::record(Record::new(def.name.clone(), out)))
    }

    /// `NEW T` default-initialises; `NEW T(a, b)` fills fields in declaration order.
    fn eval_new(&mut self, type_name: &str, args: Option<&[Expr]>) -> InterpResult<Value> {
        let def = self.ctx.types.get(type_name).ok_or_else(|| unknown_type(type_name))?;
        let values = match args {
            Some(args) => self.eval_values(args)?,
            None => Vec::new(),
        };
        if values.len() > def.fields.len() {
            return Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "NEW {} takes at most {} argument(s), got {}",
                    def.name,
                    def.fields.len(),
                    values.len()
                ),
            ));
        }
        let mut values = values.into_iter();
        let mut out = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let value = match values.next() {
                Some(value) => value,
                None => self.ctx.types.default_value(&field.ty)?,
            };
            check_type(&value, &field.ty, &format!("field {}.{}", def.name, field.name))?;
            out.push((field.name.clone(), value));
        }
        Ok(Value::record(Record::new(def.name.clone(), out)))
    }

    // ---------------------------------------------------------------
    // Indexing
    // ---------------------------------------------------------------

    pub(super) fn index_value(&self, object: &Value, index: &Value) -> InterpResult<Value> {
        match object {
            Value::Array(items) => {
                let items = items.borrow();
                let i = array_index(index, items.len())?;
                items
                    .get(i)
                    .cloned()
                    .ok_or_else(|| RuntimeError::index_out_of_range(i as f64, items.len()))
            }
            Value::Str(s) => {
                let len = s.chars().count();
                let i = array_index(index, len)?;
                s.chars()
                    .nth(i)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| RuntimeError::index_out_of_range(i as f64, len))
            }
            Value::Record(record) => match index {
                Value::Str(key) => record.borrow().get(key).cloned().ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::UnknownField,
                        format!("{} has no field '{key}'", record.borrow().type_name),
                    )
                }),
                other => Err(RuntimeError::type_mismatch("STRING key", &other.type_name())),
            },
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("cannot index {}", other.type_name()),
            )),
        }
    }

    // ---------------------------------------------------------------
    // Operators
    // ---------------------------------------------------------------

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> InterpResult<Value> {
        match op {
            BinaryOp::And => {
                let result = self.eval(left)?.is_truthy() && self.eval(right)?.is_truthy();
                return Ok(Value::from_bool(result));
            }
            BinaryOp::Or => {
                let result = self.eval(left)?.is_truthy() || self.eval(right)?.is_truthy();
                return Ok(Value::from_bool(result));
            }
            _ => {}
        }
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        binary_op(op, &left, &right)
    }
}

/// Apply a non-short-circuit binary operator.
pub(super) fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> InterpResult<Value> {
    match op {
        BinaryOp::Concat => Ok(Value::Str(format!("{left}{right}"))),
        BinaryOp::Add if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
            Ok(Value::Str(format!("{left}{right}")))
        }
        BinaryOp::Eq => Ok(Value::from_bool(left.strict_eq(right))),
        BinaryOp::NotEq => Ok(Value::from_bool(!left.strict_eq(right))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!(
                            "type mismatch: cannot compare {} {op} {}",
                            left.type_name(),
                            right.type_name()
                        ),
                    ));
                }
            };
            let holds = ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o == Ordering::Less,
                BinaryOp::Gt => o == Ordering::Greater,
                BinaryOp::LtEq => o != Ordering::Greater,
                _ => o != Ordering::Less,
            });
            Ok(Value::from_bool(holds))
        }
        _ => {
            let a = left.as_number()?;
            let b = right.as_number()?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Pow => a.powf(b),
                BinaryOp::Div | BinaryOp::IntDiv | BinaryOp::Mod if b == 0.0 => {
                    return Err(RuntimeError::division_by_zero());
                }
                BinaryOp::Div => a / b,
                BinaryOp::IntDiv => (a / b).floor(),
                // Sign follows the dividend
                BinaryOp::Mod => a % b,
                _ => {
                    return Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!("operator {op} is not numeric"),
                    ));
                }
            };
            Ok(Value::Number(n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::eval::{ExecOptions, execute};
    use crate::parser::parse_source;

    fn eval_print(expr: &str) -> String {
        let program = parse_source(&format!("PRINT {expr}")).expect("parse");
        let mut outputs = execute(&program, ExecOptions::default()).expect("run").outputs;
        outputs.remove(0)
    }

    fn eval_err(expr: &str) -> RuntimeError {
        let program = parse_source(&format!("X = {expr}")).expect("parse");
        execute(&program, ExecOptions::default()).expect_err("should fail")
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_print("1 + 2 * 3"), "7");
        assert_eq!(eval_print("2 ^ 3 ^ 2"), "64");
        assert_eq!(eval_print("2 ^ -1"), "0.5");
        assert_eq!(eval_print("7 \\ 2"), "3");
        assert_eq!(eval_print("-7 \\ 2"), "-4");
        assert_eq!(eval_print("-7 MOD 3"), "-1");
        assert_eq!(eval_print("\"4\" * 2"), "8");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval_err("1 / 0").code(), "DIVISION_BY_ZERO");
        assert_eq!(eval_err("1 MOD 0").code(), "DIVISION_BY_ZERO");
        assert_eq!(eval_err("1 \\ 0").code(), "DIVISION_BY_ZERO");
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(eval_print("\"a\" + 1"), "a1");
        assert_eq!(eval_print("1 & 2"), "12");
        assert_eq!(eval_print("\"abc\" < \"abd\""), "-1");
        assert_eq!(eval_err("\"a\" < 1").code(), "TYPE_MISMATCH");
        assert_eq!(eval_err("\"a\" - 1").code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_logic_and_comparison() {
        assert_eq!(eval_print("1 = 1"), "-1");
        assert_eq!(eval_print("1 <> 1"), "0");
        assert_eq!(eval_print("NOT 0"), "-1");
        assert_eq!(eval_print("TRUE AND FALSE"), "0");
        assert_eq!(eval_print("0 OR \"x\""), "-1");
        assert_eq!(eval_print("1 = \"1\""), "0");
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        assert_eq!(eval_print("0 AND (1 / 0)"), "0");
        assert_eq!(eval_print("1 OR (1 / 0)"), "-1");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval_print("1 > 0 ? \"yes\" : \"no\""), "yes");
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval_print("[10, 20, 30][1]"), "20");
        assert_eq!(eval_print("\"hey\"[2]"), "y");
        assert_eq!(eval_print("{a: 1}[\"a\"]"), "1");
        assert_eq!(eval_err("[1][1]").code(), "INDEX_OUT_OF_RANGE");
        assert_eq!(eval_err("[1][-1]").code(), "INDEX_OUT_OF_RANGE");
        assert_eq!(eval_err("[1][0.5]").code(), "INDEX_OUT_OF_RANGE");
    }

    #[test]
    fn test_array_spread() {
        assert_eq!(eval_print("[0, [1, 2]..., 3]"), "[0, 1, 2, 3]");
        assert_eq!(eval_err("[1]...").code(), "TYPE_MISMATCH");
        assert_eq!(eval_err("[1...]").code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_unknown_identifier_suggests() {
        let program = parse_source("COUNT = 1\nPRINT COUNTT").unwrap();
        let err = execute(&program, ExecOptions::default()).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_IDENTIFIER");
        assert!(err.message.contains("did you mean 'COUNT'"));
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn test_record_literals() {
        let source = "TYPE P\nx AS NUMBER\nname AS STRING\nEND TYPE\nA = P{x: 2}\nPRINT A\nB = NEW P(1, \"b\")\nPRINT B.name";
        let program = parse_source(source).unwrap();
        let outputs = execute(&program, ExecOptions::default()).unwrap().outputs;
        assert_eq!(outputs, vec![r#"P{x: 2, name: ""}"#, "b"]);
    }

    #[test]
    fn test_record_literal_errors() {
        let base = "TYPE P\nx AS NUMBER\nEND TYPE\n";
        let run = |tail: &str| {
            let program = parse_source(&format!("{base}{tail}")).unwrap();
            execute(&program, ExecOptions::default()).unwrap_err().code().to_string()
        };
        assert_eq!(run("A = P{z: 1}"), "UNKNOWN_FIELD");
        assert_eq!(run("A = P{x: \"s\"}"), "TYPE_MISMATCH");
        assert_eq!(run("A = Q{x: 1}"), "TYPE_MISMATCH");
        assert_eq!(run("A = NEW P(1, 2)"), "TYPE_MISMATCH");
    }

    #[test]
    fn test_binary_op_directly() {
        let n = binary_op(BinaryOp::Sub, &Value::Number(5.0), &Value::str(" 2 ")).unwrap();
        assert_eq!(n, Value::Number(3.0));
    }
}

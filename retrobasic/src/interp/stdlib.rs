//! Built-in host functions and namespaces
//!
//! Plain functions: LEN ABS INT SQR STR$ VAL UCASE$ LCASE$ LEFT$ RIGHT$
//! MID$ CHR$ ASC RND. Namespaces: MATH, STR, ARR, TIME.

use super::host::{HostEnvironment, HostResult, NativeNamespace};
use super::value::{Value, format_number, parse_decimal};
use rand::Rng;

/// Longest string REPEAT will build, in bytes
const MAX_STRING_LEN: usize = 1 << 28;

/// Namespaces probed for `value.member` when the receiver is not a record
pub const UFCS_PROBE_NAMESPACES: [&str; 3] = ["STR", "MATH", "ARR"];

pub(super) fn install(host: &mut HostEnvironment) {
    host.register_function("LEN", builtin_len);
    host.register_function("ABS", builtin_abs);
    host.register_function("INT", builtin_int);
    host.register_function("SQR", builtin_sqrt);
    host.register_function("STR$", builtin_str);
    host.register_function("VAL", builtin_val);
    host.register_function("UCASE$", builtin_upper);
    host.register_function("LCASE$", builtin_lower);
    host.register_function("LEFT$", builtin_left);
    host.register_function("RIGHT$", builtin_right);
    host.register_function("MID$", builtin_mid);
    host.register_function("CHR$", builtin_chr);
    host.register_function("ASC", builtin_asc);
    host.register_function("RND", builtin_rnd);

    host.register_namespace(
        NativeNamespace::new("MATH")
            .with_function("SQRT", builtin_sqrt)
            .with_function("ABS", builtin_abs)
            .with_function("FLOOR", builtin_int)
            .with_function("CEIL", builtin_ceil)
            .with_function("ROUND", builtin_round)
            .with_function("MIN", builtin_min)
            .with_function("MAX", builtin_max)
            .with_function("POW", builtin_pow)
            .with_function("SIN", builtin_sin)
            .with_function("COS", builtin_cos),
    );
    host.register_namespace(
        NativeNamespace::new("STR")
            .with_function("UPPER", builtin_upper)
            .with_function("LOWER", builtin_lower)
            .with_function("TRIM", builtin_trim)
            .with_function("LEN", builtin_len)
            .with_function("CONTAINS", builtin_contains)
            .with_function("SPLIT", builtin_split)
            .with_function("REPEAT", builtin_repeat)
            .with_function("REPLACE", builtin_replace),
    );
    host.register_namespace(
        NativeNamespace::new("ARR")
            .with_function("LEN", builtin_len)
            .with_function("PUSH", builtin_push)
            .with_function("POP", builtin_pop)
            .with_function("JOIN", builtin_join)
            .with_function("REVERSE", builtin_reverse),
    );
    host.register_namespace(
        NativeNamespace::new("TIME")
            .with_function("NOW", builtin_now)
            .with_function("MILLIS", builtin_millis),
    );
}

// ---------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(format!("{name} expects {expected} argument(s), got {}", args.len()));
    }
    Ok(())
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(format!("{name} expects a number, got {}", other.type_name())),
    }
}

fn text<'a>(name: &str, value: &'a Value) -> Result<&'a str, String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(format!("{name} expects a string, got {}", other.type_name())),
    }
}

fn count(name: &str, value: &Value) -> Result<usize, String> {
    let n = number(name, value)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("{name} expects a non-negative integer, got {}", format_number(n)));
    }
    Ok(n as usize)
}

fn unary_math(name: &str, args: &[Value], f: fn(f64) -> f64) -> HostResult {
    arity(name, args, 1, 1)?;
    Ok(Value::Number(f(number(name, &args[0])?)))
}

// ---------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------

fn builtin_abs(args: &[Value]) -> HostResult {
    unary_math("ABS", args, f64::abs)
}

fn builtin_int(args: &[Value]) -> HostResult {
    unary_math("INT", args, f64::floor)
}

fn builtin_ceil(args: &[Value]) -> HostResult {
    unary_math("CEIL", args, f64::ceil)
}

fn builtin_sqrt(args: &[Value]) -> HostResult {
    arity("SQRT", args, 1, 1)?;
    let n = number("SQRT", &args[0])?;
    if n < 0.0 {
        return Err(format!("SQRT of negative number {}", format_number(n)));
    }
    Ok(Value::Number(n.sqrt()))
}

fn builtin_sin(args: &[Value]) -> HostResult {
    unary_math("SIN", args, f64::sin)
}

fn builtin_cos(args: &[Value]) -> HostResult {
    unary_math("COS", args, f64::cos)
}

fn builtin_round(args: &[Value]) -> HostResult {
    arity("ROUND", args, 1, 2)?;
    let n = number("ROUND", &args[0])?;
    let digits = match args.get(1) {
        Some(d) => number("ROUND", d)? as i32,
        None => 0,
    };
    let scale = 10f64.powi(digits);
    Ok(Value::Number((n * scale).round() / scale))
}

fn builtin_pow(args: &[Value]) -> HostResult {
    arity("POW", args, 2, 2)?;
    Ok(Value::Number(number("POW", &args[0])?.powf(number("POW", &args[1])?)))
}

fn fold_numbers(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> HostResult {
    arity(name, args, 1, usize::MAX)?;
    let values: Vec<f64> = match args {
        [Value::Array(items)] => items
            .borrow()
            .iter()
            .map(|v| number(name, v))
            .collect::<Result<_, _>>()?,
        _ => args.iter().map(|v| number(name, v)).collect::<Result<_, _>>()?,
    };
    values
        .into_iter()
        .reduce(pick)
        .map(Value::Number)
        .ok_or_else(|| format!("{name} of an empty array"))
}

fn builtin_min(args: &[Value]) -> HostResult {
    fold_numbers("MIN", args, f64::min)
}

fn builtin_max(args: &[Value]) -> HostResult {
    fold_numbers("MAX", args, f64::max)
}

fn builtin_rnd(args: &[Value]) -> HostResult {
    arity("RND", args, 0, 1)?;
    Ok(Value::Number(rand::thread_rng().r#gen::<f64>()))
}

fn builtin_val(args: &[Value]) -> HostResult {
    arity("VAL", args, 1, 1)?;
    let s = text("VAL", &args[0])?.trim();
    // Longest numeric prefix; no digits gives 0.
    let n = (1..=s.len())
        .rev()
        .filter(|&end| s.is_char_boundary(end))
        .find_map(|end| parse_decimal(&s[..end]))
        .unwrap_or(0.0);
    Ok(Value::Number(n))
}

fn builtin_str(args: &[Value]) -> HostResult {
    arity("STR$", args, 1, 1)?;
    Ok(Value::Str(format_number(number("STR$", &args[0])?)))
}

// ---------------------------------------------------------------
// Strings
// ---------------------------------------------------------------

fn builtin_len(args: &[Value]) -> HostResult {
    arity("LEN", args, 1, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
        other => Err(format!("LEN expects a string or array, got {}", other.type_name())),
    }
}

fn builtin_upper(args: &[Value]) -> HostResult {
    arity("UPPER", args, 1, 1)?;
    Ok(Value::Str(text("UPPER", &args[0])?.to_uppercase()))
}

fn builtin_lower(args: &[Value]) -> HostResult {
    arity("LOWER", args, 1, 1)?;
    Ok(Value::Str(text("LOWER", &args[0])?.to_lowercase()))
}

fn builtin_trim(args: &[Value]) -> HostResult {
    arity("TRIM", args, 1, 1)?;
    Ok(Value::str(text("TRIM", &args[0])?.trim()))
}

fn builtin_left(args: &[Value]) -> HostResult {
    arity("LEFT$", args, 2, 2)?;
    let s = text("LEFT$", &args[0])?;
    let n = count("LEFT$", &args[1])?;
    Ok(Value::Str(s.chars().take(n).collect()))
}

fn builtin_right(args: &[Value]) -> HostResult {
    arity("RIGHT$", args, 2, 2)?;
    let s = text("RIGHT$", &args[0])?;
    let n = count("RIGHT$", &args[1])?;
    let len = s.chars().count();
    Ok(Value::Str(s.chars().skip(len.saturating_sub(n)).collect()))
}

fn builtin_mid(args: &[Value]) -> HostResult {
    arity("MID$", args, 2, 3)?;
    let s = text("MID$", &args[0])?;
    let start = count("MID$", &args[1])?;
    if start == 0 {
        return Err("MID$ start position is 1-based".to_string());
    }
    let chars = s.chars().skip(start - 1);
    let result = match args.get(2) {
        Some(len) => chars.take(count("MID$", len)?).collect(),
        None => chars.collect(),
    };
    Ok(Value::Str(result))
}

fn builtin_chr(args: &[Value]) -> HostResult {
    arity("CHR$", args, 1, 1)?;
    let code = count("CHR$", &args[0])?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| format!("CHR$: invalid character code {code}"))
}

fn builtin_asc(args: &[Value]) -> HostResult {
    arity("ASC", args, 1, 1)?;
    text("ASC", &args[0])?
        .chars()
        .next()
        .map(|c| Value::Number(f64::from(u32::from(c))))
        .ok_or_else(|| "ASC of an empty string".to_string())
}

fn builtin_contains(args: &[Value]) -> HostResult {
    arity("CONTAINS", args, 2, 2)?;
    let haystack = text("CONTAINS", &args[0])?;
    let needle = text("CONTAINS", &args[1])?;
    Ok(Value::from_bool(haystack.contains(needle)))
}

fn builtin_split(args: &[Value]) -> HostResult {
    arity("SPLIT", args, 1, 2)?;
    let s = text("SPLIT", &args[0])?;
    let sep = match args.get(1) {
        Some(sep) => text("SPLIT", sep)?,
        None => " ",
    };
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::str).collect()
    };
    Ok(Value::array(parts))
}

fn builtin_repeat(args: &[Value]) -> HostResult {
    arity("REPEAT", args, 2, 2)?;
    let s = text("REPEAT", &args[0])?;
    let n = count("REPEAT", &args[1])?;
    match s.len().checked_mul(n) {
        Some(len) if len <= MAX_STRING_LEN => Ok(Value::Str(s.repeat(n))),
        _ => Err(format!("REPEAT result would exceed {MAX_STRING_LEN} bytes")),
    }
}

fn builtin_replace(args: &[Value]) -> HostResult {
    arity("REPLACE", args, 3, 3)?;
    let s = text("REPLACE", &args[0])?;
    let from = text("REPLACE", &args[1])?;
    let to = text("REPLACE", &args[2])?;
    if from.is_empty() {
        return Ok(Value::str(s));
    }
    Ok(Value::Str(s.replace(from, to)))
}

// ---------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------

fn builtin_push(args: &[Value]) -> HostResult {
    arity("PUSH", args, 2, usize::MAX)?;
    match &args[0] {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            items.extend(args[1..].iter().cloned());
            Ok(Value::Number(items.len() as f64))
        }
        other => Err(format!("PUSH expects an array, got {}", other.type_name())),
    }
}

fn builtin_pop(args: &[Value]) -> HostResult {
    arity("POP", args, 1, 1)?;
    match &args[0] {
        Value::Array(items) => items.borrow_mut().pop().ok_or_else(|| "POP from an empty array".to_string()),
        other => Err(format!("POP expects an array, got {}", other.type_name())),
    }
}

fn builtin_join(args: &[Value]) -> HostResult {
    arity("JOIN", args, 1, 2)?;
    let sep = match args.get(1) {
        Some(sep) => text("JOIN", sep)?,
        None => "",
    };
    match &args[0] {
        Value::Array(items) => Ok(Value::Str(
            items.borrow().iter().map(Value::to_string).collect::<Vec<_>>().join(sep),
        )),
        other => Err(format!("JOIN expects an array, got {}", other.type_name())),
    }
}

fn builtin_reverse(args: &[Value]) -> HostResult {
    arity("REVERSE", args, 1, 1)?;
    match &args[0] {
        Value::Array(items) => Ok(Value::array(items.borrow().iter().rev().cloned().collect())),
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        other => Err(format!("REVERSE expects an array or string, got {}", other.type_name())),
    }
}

// ---------------------------------------------------------------
// Time
// ---------------------------------------------------------------

fn builtin_now(args: &[Value]) -> HostResult {
    arity("NOW", args, 0, 0)?;
    Ok(Value::Str(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()))
}

fn builtin_millis(args: &[Value]) -> HostResult {
    arity("MILLIS", args, 0, 0)?;
    Ok(Value::Number(chrono::Utc::now().timestamp_millis() as f64))
}

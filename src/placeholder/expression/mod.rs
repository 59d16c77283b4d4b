//! Restricted evaluator for `{= expression}` placeholders.
//!
//! Expressions are pure: literals, arithmetic, comparisons, logic, and a
//! fixed whitelist of `Math`/string/number helpers. Nothing from the job, the
//! process or the environment is reachable, and unknown names are errors.
//! Values follow JavaScript conversion rules so templates written for the
//! scheduler's scripting conventions keep producing the same text.

mod parser;

use thiserror::Error;

use crate::job::format_number;

pub use parser::parse_expression;

/// Evaluation failure; the resolver turns every one of these into an empty string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0} is not defined")]
    UnknownIdentifier(String),
    #[error("{0} is not a function")]
    UnknownFunction(String),
    #[error("cannot read property '{0}' of {1}")]
    NullProperty(String, &'static str),
    #[error("invalid {0}")]
    Range(&'static str),
}

/// Longest string a builtin may produce, in characters.
pub const MAX_STRING_LEN: usize = 1 << 20;

/// Runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl JsValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => f64::from(u8::from(*b)),
            JsValue::Number(n) => *n,
            JsValue::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    match s {
                        "Infinity" | "+Infinity" => f64::INFINITY,
                        "-Infinity" => f64::NEG_INFINITY,
                        _ => s.parse::<f64>().unwrap_or(f64::NAN),
                    }
                }
            }
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => format_number(*n),
            JsValue::Str(s) => s.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::Str(_) => "string",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(JsValue),
    Identifier(String),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Parses and evaluates an expression.
pub fn evaluate(source: &str) -> Result<JsValue, EvalError> {
    let expr = parse_expression(source)?;
    eval(&expr)
}

fn eval(expr: &Expr) -> Result<JsValue, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Identifier(name) => Err(EvalError::UnknownIdentifier(name.clone())),
        Expr::Member(object, property) => member(object, property),
        Expr::Call(callee, args) => call(callee, args),
        Expr::Unary(op, operand) => {
            let v = eval(operand)?;
            Ok(match op {
                UnaryOp::Not => JsValue::Bool(!v.is_truthy()),
                UnaryOp::Neg => JsValue::Number(-v.to_number()),
                UnaryOp::Plus => JsValue::Number(v.to_number()),
            })
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let l = eval(lhs)?;
            if l.is_truthy() {
                eval(rhs)
            } else {
                Ok(l)
            }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let l = eval(lhs)?;
            if l.is_truthy() {
                Ok(l)
            } else {
                eval(rhs)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs)?;
            let r = eval(rhs)?;
            Ok(binary(*op, &l, &r))
        }
        Expr::Conditional(cond, then, otherwise) => {
            if eval(cond)?.is_truthy() {
                eval(then)
            } else {
                eval(otherwise)
            }
        }
    }
}

fn binary(op: BinaryOp, l: &JsValue, r: &JsValue) -> JsValue {
    match op {
        BinaryOp::Add => match (l, r) {
            (JsValue::Str(_), _) | (_, JsValue::Str(_)) => {
                JsValue::Str(l.to_js_string() + &r.to_js_string())
            }
            _ => JsValue::Number(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => JsValue::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => JsValue::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => JsValue::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => JsValue::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => JsValue::Bool(compare(l, r, |o| o.is_lt())),
        BinaryOp::Le => JsValue::Bool(compare(l, r, |o| o.is_le())),
        BinaryOp::Gt => JsValue::Bool(compare(l, r, |o| o.is_gt())),
        BinaryOp::Ge => JsValue::Bool(compare(l, r, |o| o.is_ge())),
        BinaryOp::Eq => JsValue::Bool(loose_eq(l, r)),
        BinaryOp::Ne => JsValue::Bool(!loose_eq(l, r)),
        BinaryOp::StrictEq => JsValue::Bool(l == r),
        BinaryOp::StrictNe => JsValue::Bool(l != r),
        // short-circuit forms are handled in `eval`
        BinaryOp::And | BinaryOp::Or => JsValue::Undefined,
    }
}

fn compare(l: &JsValue, r: &JsValue, test: fn(std::cmp::Ordering) -> bool) -> bool {
    match (l, r) {
        (JsValue::Str(a), JsValue::Str(b)) => test(a.cmp(b)),
        _ => l
            .to_number()
            .partial_cmp(&r.to_number())
            .map(test)
            .unwrap_or(false),
    }
}

fn loose_eq(l: &JsValue, r: &JsValue) -> bool {
    use JsValue::*;
    match (l, r) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        (Str(a), Str(b)) => a == b,
        _ => l.to_number() == r.to_number(),
    }
}

fn member(object: &Expr, property: &str) -> Result<JsValue, EvalError> {
    if let Expr::Identifier(namespace) = object {
        if namespace == "Math" {
            return math_constant(property)
                .map(JsValue::Number)
                .ok_or_else(|| EvalError::UnknownIdentifier(format!("Math.{property}")));
        }
    }
    let value = eval(object)?;
    match (&value, property) {
        (JsValue::Undefined | JsValue::Null, _) => {
            Err(EvalError::NullProperty(property.to_string(), value.kind()))
        }
        (JsValue::Str(s), "length") => Ok(JsValue::Number(s.encode_utf16().count() as f64)),
        _ => Ok(JsValue::Undefined),
    }
}

fn call(callee: &Expr, args: &[Expr]) -> Result<JsValue, EvalError> {
    match callee {
        Expr::Identifier(name) => {
            let args = eval_args(args)?;
            global_function(name, &args)
        }
        Expr::Member(object, method) => match object.as_ref() {
            Expr::Identifier(ns) if ns == "Math" || ns == "Date" => {
                let args = eval_args(args)?;
                namespace_function(ns, method, &args)
            }
            _ => {
                let receiver = eval(object)?;
                let args = eval_args(args)?;
                call_method(&receiver, method, &args)
            }
        },
        other => {
            let value = eval(other)?;
            Err(EvalError::UnknownFunction(value.to_js_string()))
        }
    }
}

fn eval_args(args: &[Expr]) -> Result<Vec<JsValue>, EvalError> {
    args.iter().map(eval).collect()
}

fn arg(args: &[JsValue], idx: usize) -> JsValue {
    args.get(idx).cloned().unwrap_or(JsValue::Undefined)
}

fn math_constant(name: &str) -> Option<f64> {
    Some(match name {
        "PI" => std::f64::consts::PI,
        "E" => std::f64::consts::E,
        "LN2" => std::f64::consts::LN_2,
        "LN10" => std::f64::consts::LN_10,
        "SQRT2" => std::f64::consts::SQRT_2,
        _ => return None,
    })
}

fn global_function(name: &str, args: &[JsValue]) -> Result<JsValue, EvalError> {
    Ok(match name {
        "String" => JsValue::Str(match args.first() {
            Some(v) => v.to_js_string(),
            None => String::new(),
        }),
        "Number" => JsValue::Number(args.first().map(JsValue::to_number).unwrap_or(0.0)),
        "Boolean" => JsValue::Bool(arg(args, 0).is_truthy()),
        "isNaN" => JsValue::Bool(arg(args, 0).to_number().is_nan()),
        "parseInt" => JsValue::Number(parse_int(
            &arg(args, 0).to_js_string(),
            args.get(1).map(JsValue::to_number),
        )),
        "parseFloat" => JsValue::Number(parse_float(&arg(args, 0).to_js_string())),
        _ => return Err(EvalError::UnknownFunction(name.to_string())),
    })
}

fn namespace_function(ns: &str, name: &str, args: &[JsValue]) -> Result<JsValue, EvalError> {
    let n = |idx: usize| arg(args, idx).to_number();
    let value = match (ns, name) {
        ("Date", "now") => chrono::Utc::now().timestamp_millis() as f64,
        ("Math", "floor") => n(0).floor(),
        ("Math", "ceil") => n(0).ceil(),
        ("Math", "round") => (n(0) + 0.5).floor(),
        ("Math", "trunc") => n(0).trunc(),
        ("Math", "abs") => n(0).abs(),
        ("Math", "sign") => {
            let x = n(0);
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        ("Math", "sqrt") => n(0).sqrt(),
        ("Math", "cbrt") => n(0).cbrt(),
        ("Math", "pow") => n(0).powf(n(1)),
        ("Math", "exp") => n(0).exp(),
        ("Math", "log") => n(0).ln(),
        ("Math", "log10") => n(0).log10(),
        ("Math", "min") => fold_numbers(args, f64::INFINITY, f64::min),
        ("Math", "max") => fold_numbers(args, f64::NEG_INFINITY, f64::max),
        _ => return Err(EvalError::UnknownFunction(format!("{ns}.{name}"))),
    };
    Ok(JsValue::Number(value))
}

fn fold_numbers(args: &[JsValue], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for value in args {
        let x = value.to_number();
        if x.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, x);
    }
    acc
}

fn call_method(receiver: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, EvalError> {
    match receiver {
        JsValue::Undefined | JsValue::Null => {
            Err(EvalError::NullProperty(method.to_string(), receiver.kind()))
        }
        JsValue::Str(s) => string_method(s, method, args),
        JsValue::Number(x) => match method {
            "toFixed" => {
                let digits = arg(args, 0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
                Ok(JsValue::Str(format!("{x:.digits$}")))
            }
            "toString" => Ok(JsValue::Str(format_number(*x))),
            _ => Err(EvalError::UnknownFunction(method.to_string())),
        },
        JsValue::Bool(b) => match method {
            "toString" => Ok(JsValue::Str(b.to_string())),
            _ => Err(EvalError::UnknownFunction(method.to_string())),
        },
    }
}

fn string_method(s: &str, method: &str, args: &[JsValue]) -> Result<JsValue, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as f64;
    let text = |idx: usize| arg(args, idx).to_js_string();
    // Relative index as used by slice(): negative counts from the end.
    let relative = |value: JsValue, default: f64| -> usize {
        let x = match value {
            JsValue::Undefined => default,
            v => v.to_number(),
        };
        let x = if x.is_nan() { 0.0 } else { x.trunc() };
        let x = if x < 0.0 { (len + x).max(0.0) } else { x.min(len) };
        x as usize
    };
    let clamped = |value: JsValue, default: f64| -> usize {
        let x = match value {
            JsValue::Undefined => default,
            v => v.to_number(),
        };
        let x = if x.is_nan() { 0.0 } else { x.trunc() };
        x.clamp(0.0, len) as usize
    };

    Ok(match method {
        "toUpperCase" => JsValue::Str(s.to_uppercase()),
        "toLowerCase" => JsValue::Str(s.to_lowercase()),
        "trim" => JsValue::Str(s.trim().to_string()),
        "trimStart" => JsValue::Str(s.trim_start().to_string()),
        "trimEnd" => JsValue::Str(s.trim_end().to_string()),
        "toString" => JsValue::Str(s.to_string()),
        "slice" => {
            let start = relative(arg(args, 0), 0.0);
            let end = relative(arg(args, 1), len);
            JsValue::Str(if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            })
        }
        "substring" => {
            let a = clamped(arg(args, 0), 0.0);
            let b = clamped(arg(args, 1), len);
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            JsValue::Str(chars[start..end].iter().collect())
        }
        "charAt" => {
            let idx = arg(args, 0).to_number();
            let idx = if idx.is_nan() { 0.0 } else { idx.trunc() };
            JsValue::Str(if idx >= 0.0 && idx < len {
                chars[idx as usize].to_string()
            } else {
                String::new()
            })
        }
        "padStart" | "padEnd" => {
            let target = arg(args, 0).to_number();
            if target > MAX_STRING_LEN as f64 {
                return Err(EvalError::Range("string length"));
            }
            let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
            let fill = match arg(args, 1) {
                JsValue::Undefined => " ".to_string(),
                v => v.to_js_string(),
            };
            let missing = target.saturating_sub(chars.len());
            if missing == 0 || fill.is_empty() {
                JsValue::Str(s.to_string())
            } else {
                let pad: String = fill.chars().cycle().take(missing).collect();
                JsValue::Str(if method == "padStart" {
                    pad + s
                } else {
                    s.to_string() + &pad
                })
            }
        }
        "includes" => JsValue::Bool(s.contains(&text(0))),
        "startsWith" => JsValue::Bool(s.starts_with(&text(0))),
        "endsWith" => JsValue::Bool(s.ends_with(&text(0))),
        "indexOf" => JsValue::Number(match s.find(&text(0)) {
            Some(byte_idx) => s[..byte_idx].chars().count() as f64,
            None => -1.0,
        }),
        "repeat" => {
            let count = arg(args, 0).to_number();
            if count < 0.0 || count.is_infinite() {
                return Err(EvalError::Range("count value"));
            }
            let count = if count.is_nan() { 0 } else { count as usize };
            if chars.len().saturating_mul(count) > MAX_STRING_LEN {
                return Err(EvalError::Range("string length"));
            }
            JsValue::Str(s.repeat(count))
        }
        _ => return Err(EvalError::UnknownFunction(method.to_string())),
    })
}

fn parse_int(text: &str, radix: Option<f64>) -> f64 {
    let mut s = text.trim_start();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    let explicit = radix
        .filter(|r| !r.is_nan() && *r != 0.0)
        .map(|r| r.trunc() as i64);
    let mut radix = match explicit {
        Some(r) if (2..=36).contains(&r) => r as u32,
        Some(_) => return f64::NAN,
        None => 10,
    };
    // hex prefix is honoured without a radix or with radix 16
    if explicit.is_none() || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }

    let digits: Vec<u32> = s.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .iter()
        .fold(0.0_f64, |acc, d| acc * f64::from(radix) + f64::from(*d));
    sign * value
}

fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    if unsigned.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    match parser::decimal_text(unsigned) {
        Ok((_, digits)) => digits.parse::<f64>().map(|v| sign * v).unwrap_or(f64::NAN),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(source: &str) -> String {
        evaluate(source)
            .map(|v| v.to_js_string())
            .unwrap_or_else(|e| format!("error: {e}"))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1+1"), "2");
        assert_eq!(eval_str("7 / 2"), "3.5");
        assert_eq!(eval_str("7 % 3"), "1");
        assert_eq!(eval_str("-(2 + 3) * 2"), "-10");
        assert_eq!(eval_str("1 / 0"), "Infinity");
        assert_eq!(eval_str("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("'a' + 1 + 2"), "a12");
        assert_eq!(eval_str("1 + 2 + 'a'"), "3a");
        assert_eq!(eval_str("'5' * '2'"), "10");
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_str("1 < 2"), "true");
        assert_eq!(eval_str("'b' > 'a'"), "true");
        assert_eq!(eval_str("'1' == 1"), "true");
        assert_eq!(eval_str("'1' === 1"), "false");
        assert_eq!(eval_str("null == undefined"), "true");
        assert_eq!(eval_str("0 || 'fallback'"), "fallback");
        assert_eq!(eval_str("1 && 'second'"), "second");
        assert_eq!(eval_str("!0"), "true");
        assert_eq!(eval_str("3 > 2 ? 'yes' : 'no'"), "yes");
    }

    #[test]
    fn test_math_builtins() {
        assert_eq!(eval_str("Math.floor(2.7)"), "2");
        assert_eq!(eval_str("Math.round(2.5)"), "3");
        assert_eq!(eval_str("Math.round(-2.5)"), "-2");
        assert_eq!(eval_str("Math.max(1, 5, 3)"), "5");
        assert_eq!(eval_str("Math.min()"), "Infinity");
        assert_eq!(eval_str("Math.pow(2, 10)"), "1024");
        assert_eq!(eval_str("Math.PI > 3"), "true");
    }

    #[test]
    fn test_date_now_is_milliseconds() {
        let before = chrono::Utc::now().timestamp_millis() as f64;
        let now = evaluate("Date.now()").unwrap().to_number();
        assert!(now >= before && now - before < 5_000.0);
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval_str("'abc'.toUpperCase()"), "ABC");
        assert_eq!(eval_str("'  x '.trim()"), "x");
        assert_eq!(eval_str("'hello'.length"), "5");
        assert_eq!(eval_str("'hello'.slice(1, -1)"), "ell");
        assert_eq!(eval_str("'hello'.substring(3, 1)"), "el");
        assert_eq!(eval_str("'7'.padStart(3, '0')"), "007");
        assert_eq!(eval_str("'ab'.repeat(2)"), "abab");
        assert_eq!(eval_str("'hello'.indexOf('l')"), "2");
        assert_eq!(eval_str("(1.005).toFixed(1)"), "1.0");
    }

    #[test]
    fn test_oversized_strings_are_range_errors() {
        assert_eq!(
            evaluate("'x'.padStart(1e12)"),
            Err(EvalError::Range("string length"))
        );
        assert!(evaluate("'x'.padEnd(Infinity, 'y')").is_err());
        assert_eq!(
            evaluate("'ab'.repeat(1e9)"),
            Err(EvalError::Range("string length"))
        );
        assert_eq!(evaluate("'a'.repeat(-1)"), Err(EvalError::Range("count value")));
        assert_eq!(eval_str("'-'.repeat(20000).length"), "20000");
        assert_eq!(eval_str("''.repeat(1e9)"), "");
    }

    #[test]
    fn test_global_functions() {
        assert_eq!(eval_str("parseInt('42px')"), "42");
        assert_eq!(eval_str("parseInt('0x1F')"), "31");
        assert_eq!(eval_str("parseInt('ff', 16)"), "255");
        assert_eq!(eval_str("parseInt('abc')"), "NaN");
        assert_eq!(eval_str("parseFloat('3.14abc')"), "3.14");
        assert_eq!(eval_str("Number('12')"), "12");
        assert_eq!(eval_str("String(12) + 1"), "121");
        assert_eq!(eval_str("isNaN('x')"), "true");
    }

    #[test]
    fn test_unknown_names_are_errors() {
        assert_eq!(
            evaluate("undefinedVar"),
            Err(EvalError::UnknownIdentifier("undefinedVar".to_string()))
        );
        assert!(evaluate("process.exit(1)").is_err());
        assert!(evaluate("require('fs')").is_err());
        assert!(evaluate("Math.random()").is_err());
        assert!(evaluate("null.foo").is_err());
    }

    #[test]
    fn test_undefined_result() {
        assert_eq!(evaluate("undefined"), Ok(JsValue::Undefined));
        assert_eq!(evaluate("'x'.foo"), Ok(JsValue::Undefined));
    }
}

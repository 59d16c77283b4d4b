//! Conversions from loosely-typed job values.
//!
//! Job parameters usually arrive as strings from the scheduler UI, so numbers
//! and flags are accepted in either JSON or string form.

use serde_json::Value;

/// Formats a number the way the job scheduler displays it.
///
/// Integral values print without a decimal point; non-finite values use the
/// `NaN` / `Infinity` spellings.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // -0 prints as 0
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

/// String form of a job value used for placeholder substitution.
///
/// `null` becomes the empty string, arrays are comma-joined and objects are
/// rendered as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => match n.as_u64() {
                Some(u) => u.to_string(),
                None => format_number(n.as_f64().unwrap_or(f64::NAN)),
            },
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Interprets a boolean-ish parameter.
///
/// `false`, `0`, `null`, `""` and the strings `0`, `false`, `no`, `off`
/// (any case) are false; everything else is true.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(Value::String(s)) => {
            let s = s.trim();
            !(s.is_empty()
                || s == "0"
                || s.eq_ignore_ascii_case("false")
                || s.eq_ignore_ascii_case("no")
                || s.eq_ignore_ascii_case("off"))
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Reads a numeric parameter given as a JSON number or a numeric string.
pub fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Reads a string parameter; non-null scalars are converted, empty strings count as absent.
pub fn as_non_empty_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        other => {
            let s = value_to_string(other);
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
    }
}

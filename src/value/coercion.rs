use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{NodeError, NodeResult};

/// Largest integer magnitude a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Decimal convention of the host device, used by the second parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal_separator: char,
}

impl NumberLocale {
    pub fn new(decimal_separator: char) -> Self {
        Self { decimal_separator }
    }
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
        }
    }
}

/// Coercion targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Number,
    Boolean,
    String,
}

impl FromStr for TargetType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(TargetType::Number),
            "boolean" => Ok(TargetType::Boolean),
            "string" => Ok(TargetType::String),
            other => Err(NodeError::type_coercion("value", other)),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetType::Number => "number",
            TargetType::Boolean => "boolean",
            TargetType::String => "string",
        })
    }
}

/// Convert `value` to `target`. Values already of the target type are
/// returned unchanged.
pub fn coerce(value: &Value, target: &str, locale: &NumberLocale) -> NodeResult<Value> {
    let target = target
        .parse::<TargetType>()
        .map_err(|_| NodeError::type_coercion(value, target))?;
    match (target, value) {
        (TargetType::Number, Value::Number(_))
        | (TargetType::Boolean, Value::Bool(_))
        | (TargetType::String, Value::String(_)) => Ok(value.clone()),
        (TargetType::Number, _) => Ok(number_to_value(to_number(value, locale)?)),
        (TargetType::Boolean, _) => Ok(Value::Bool(to_boolean(value))),
        (TargetType::String, _) => Ok(Value::String(to_display_string(value))),
    }
}

/// Numeric view of a value: booleans are 1/0, null is 0, strings go through
/// [`parse_number`].
pub fn to_number(value: &Value, locale: &NumberLocale) -> NodeResult<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| NodeError::type_coercion(value, "number")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
        Value::String(s) => {
            parse_number(s, locale).ok_or_else(|| NodeError::type_coercion(value, "number"))
        }
        _ => Err(NodeError::type_coercion(value, "number")),
    }
}

/// Case-insensitive match of the display form against `"true"`.
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => to_display_string(other).eq_ignore_ascii_case("true"),
    }
}

/// Parse a stored number, trying in order:
/// 1. invariant form (`.` decimal, no group separators)
/// 2. the current locale's decimal separator
/// 3. `,` and `.` swapped, then invariant again
pub fn parse_number(input: &str, locale: &NumberLocale) -> Option<f64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(n) = s.parse::<f64>() {
        return Some(n);
    }

    if locale.decimal_separator != '.' {
        let localized: String = s
            .chars()
            .map(|c| if c == locale.decimal_separator { '.' } else { c })
            .collect();
        if let Ok(n) = localized.parse::<f64>() {
            return Some(n);
        }
    }

    let swapped: String = s
        .chars()
        .map(|c| match c {
            ',' => '.',
            '.' => ',',
            other => other,
        })
        .collect();
    swapped.parse::<f64>().ok()
}

/// Store a double as JSON. Integral values become integers; non-finite
/// values are kept as `"Infinity"`, `"-Infinity"` or `"NaN"`.
pub fn number_to_value(n: f64) -> Value {
    if n.is_nan() {
        return Value::String("NaN".to_string());
    }
    if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return Value::String(s.to_string());
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Human-readable form used by string coercion and string comparisons.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

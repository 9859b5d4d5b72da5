use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Dynamic value manipulated by the VM. Every coercion below is total.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

pub type Object = BTreeMap<String, Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// Unparsable strings yield 0.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => {
                if *b { 1.0 } else { 0.0 }
            }
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
        }
    }

    pub fn to_array(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            Value::Object(map) => {
                let mut out = Vec::with_capacity(map.len() * 2);
                for (k, v) in map {
                    out.push(Value::String(k.clone()));
                    out.push(v.clone());
                }
                out
            }
            scalar => vec![scalar.clone()],
        }
    }

    /// Owned variant of [`Value::to_array`] that avoids cloning arrays.
    pub fn into_array(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items,
            other => other.to_array(),
        }
    }

    /// Flattens nested arrays and objects into a list of their string forms.
    pub fn to_string_array(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_strings(&mut out);
        out
    }

    fn collect_strings(&self, out: &mut Vec<String>) {
        match self {
            Value::Null => {}
            Value::Array(items) => items.iter().for_each(|v| v.collect_strings(out)),
            Value::Object(map) => {
                for (k, v) in map {
                    out.push(k.clone());
                    v.collect_strings(out);
                }
            }
            scalar => out.push(scalar.to_string()),
        }
    }

    pub fn to_object(&self) -> Object {
        match self {
            Value::Object(map) => map.clone(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| ((i + 1).to_string(), v.clone()))
                .collect(),
            _ => Object::new(),
        }
    }

    /// Partial ordering used by `sort` and `sorted`: arrays, objects and
    /// null are never less than anything.
    pub fn lt(&self, rhs: &Value) -> bool {
        if !self.is_ordered() || !rhs.is_ordered() {
            return false;
        }
        if matches!(self, Value::String(_)) || matches!(rhs, Value::String(_)) {
            return self.to_string() < rhs.to_string();
        }
        self.to_number() < rhs.to_number()
    }

    fn is_ordered(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    /// Canonical type-distinguishing rendering used as a cache key.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        self.write_fingerprint(&mut out);
        out
    }

    fn write_fingerprint(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::String(s) => out.push_str(&format!("{s:?}")),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_fingerprint(out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format!("{k:?}: "));
                    v.write_fingerprint(out);
                }
                out.push('}');
            }
        }
    }

    /// Non-finite numbers have no JSON form and encode as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Coerces both operands so a relational operator can compare them: anything
/// that is not a number or string is stringified, and if the kinds still
/// differ both sides become strings.
pub fn make_comparable(lhs: Value, rhs: Value) -> (Value, Value) {
    fn scalarize(v: Value) -> Value {
        match v {
            Value::Number(_) | Value::String(_) => v,
            other => Value::String(other.to_string()),
        }
    }
    let lhs = scalarize(lhs);
    let rhs = scalarize(rhs);
    match (&lhs, &rhs) {
        (Value::Number(_), Value::String(_)) => (Value::String(lhs.to_string()), rhs),
        (Value::String(_), Value::Number(_)) => {
            let rhs = Value::String(rhs.to_string());
            (lhs, rhs)
        }
        _ => (lhs, rhs),
    }
}

/// Typed comparison after [`make_comparable`]. NaN compares as unordered.
pub fn compare(lhs: Value, rhs: Value) -> Option<Ordering> {
    match make_comparable(lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Locale-independent decimal rendering of a number.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "1" } else { "0" }),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(map) => {
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Value::Object(map)
    }
}

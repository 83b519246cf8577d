//! Runtime values.
//!
//! Values are JSON-shaped (null, bool, integer, float, string, list,
//! string-keyed map) plus the two callable kinds: closures created by `fn`
//! and builtin references created by naming a builtin as a value.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};
use speclang_ast::ast::Expr;
use speclang_types::BuiltinSpec;

use crate::error::EvalError;
use crate::eval::Env;

pub type Dict = IndexMap<String, Value>;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Dict),
    /// User function created by `fn`.
    Closure(Rc<Closure>),
    /// Builtin named as a value, possibly with some arguments bound.
    Builtin(Rc<BuiltinRef>),
}

pub struct Closure {
    pub params: Vec<String>,
    pub body: Arc<Expr>,
    pub env: Env,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinRef {
    pub spec: &'static BuiltinSpec,
    pub bound: Vec<Value>,
}

impl Value {
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Callables and non-finite floats are rejected.
    pub fn to_json(&self) -> Result<Json, EvalError> {
        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or_else(|| {
                EvalError::schema("spec_lang value is not JSON-serializable: non-finite number")
            })?),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Dict(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                Json::Object(out)
            }
            Value::Closure(_) | Value::Builtin(_) => {
                return Err(EvalError::schema(
                    "spec_lang value is not JSON-serializable: function",
                ))
            }
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Closure(_) | Value::Builtin(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
            Value::Closure(_) | Value::Builtin(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Builtin(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Text rendering used by string builtins: strings verbatim, everything
    /// else as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Float(f) => format_float(*f),
            Value::Closure(_) | Value::Builtin(_) => "<function>".to_string(),
            other => match other.to_json() {
                Ok(json) => json.to_string(),
                Err(_) => "<function>".to_string(),
            },
        }
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(&json)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equals(self, other)
    }
}

/// Type-exact structural equality. Lists compare element-wise in order,
/// maps by key set and values; `1` and `1.0` differ.
pub fn deep_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equals(l, r))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| deep_equals(v, other)))
        }
        (Value::Closure(x), Value::Closure(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Equality used by `eq`/`neq` and membership: numbers compare by value
/// across integer and float.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (a, b) {
                (Value::Int(x), Value::Int(y)) => x == y,
                _ => a.as_number() == b.as_number(),
            }
        }
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_equals(l, r))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_equals(v, other)))
        }
        _ => deep_equals(a, b),
    }
}

/// Ordering over two numbers or two strings; `None` when incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_int_float_split() {
        let v = Value::from_json(&json!({"a": 1, "b": 1.5, "c": [null, true]}));
        assert!(matches!(v.as_dict().unwrap()["a"], Value::Int(1)));
        assert_eq!(v.to_json().unwrap(), json!({"a": 1, "b": 1.5, "c": [null, true]}));
    }

    #[test]
    fn deep_vs_loose_equality() {
        assert!(!deep_equals(&Value::Int(1), &Value::Float(1.0)));
        assert!(loose_equals(&Value::Int(1), &Value::Float(1.0)));
        assert!(!loose_equals(&Value::Bool(true), &Value::Int(1)));
    }

    #[test]
    fn text_rendering() {
        assert_eq!(Value::Float(2.0).to_text(), "2.0");
        assert_eq!(Value::Int(7).to_text(), "7");
        assert_eq!(Value::from_json(&json!([1, "a"])).to_text(), r#"[1,"a"]"#);
        assert_eq!(Value::Null.to_text(), "null");
    }
}

//! Builtin library.
//!
//! Each namespace module exports a `HANDLERS` table of
//! `(canonical symbol, handler)`; [`handler`] merges them once into a
//! lookup map. Handlers receive already-evaluated arguments whose count
//! matches the catalog arity.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{Dict, Value};

mod base;
mod collection;
mod files;
mod json;
mod math;
mod object;
pub(crate) mod path;
mod string;

pub(crate) type Handler = fn(&mut Interp<'_>, &[Value]) -> Result<Value, EvalError>;

fn tables() -> [&'static [(&'static str, Handler)]; 9] {
    [
        base::HANDLERS,
        math::HANDLERS,
        string::HANDLERS,
        object::HANDLERS,
        collection::HANDLERS,
        json::HANDLERS,
        path::HANDLERS,
        files::HANDLERS,
        crate::host::HANDLERS,
    ]
}

pub(crate) fn handler(symbol: &str) -> Option<Handler> {
    static TABLE: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();
    TABLE
        .get_or_init(|| tables().into_iter().flatten().copied().collect())
        .get(symbol)
        .copied()
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

pub(crate) fn one<'v>(op: &str, args: &'v [Value]) -> Result<&'v Value, EvalError> {
    match args {
        [a] => Ok(a),
        _ => Err(EvalError::arity(op, 1, args.len())),
    }
}

pub(crate) fn two<'v>(op: &str, args: &'v [Value]) -> Result<(&'v Value, &'v Value), EvalError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(EvalError::arity(op, 2, args.len())),
    }
}

pub(crate) fn three<'v>(
    op: &str,
    args: &'v [Value],
) -> Result<(&'v Value, &'v Value, &'v Value), EvalError> {
    match args {
        [a, b, c] => Ok((a, b, c)),
        _ => Err(EvalError::arity(op, 3, args.len())),
    }
}

pub(crate) fn list<'v>(op: &str, v: &'v Value) -> Result<&'v [Value], EvalError> {
    v.as_list()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects list")))
}

pub(crate) fn dict<'v>(op: &str, v: &'v Value) -> Result<&'v Dict, EvalError> {
    v.as_dict()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects dict")))
}

pub(crate) fn int(op: &str, v: &Value) -> Result<i64, EvalError> {
    v.as_int()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects integer args")))
}

pub(crate) fn string<'v>(op: &str, v: &'v Value) -> Result<&'v str, EvalError> {
    v.as_str()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects string input")))
}

/// `null` and the empty string are skipped by `coalesce`/`default_to`.
pub(crate) fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Str(s) => s.is_empty(),
        _ => false,
    }
}

/// Walk `path` through dicts (key text) and lists (integer index).
pub(crate) fn get_in<'v>(root: &'v Value, path: &[Value]) -> Option<&'v Value> {
    let mut cur = root;
    for seg in path {
        cur = match cur {
            Value::Dict(map) => map.get(&seg.to_text())?,
            Value::List(items) => {
                let idx = usize::try_from(seg.as_int()?).ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(cur)
}

pub(crate) fn includes(seq: &[Value], value: &Value) -> bool {
    seq.iter().any(|item| crate::value::deep_equals(item, value))
}

pub(crate) fn distinct(seq: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in seq {
        if !includes(&out, item) {
            out.push(item.clone());
        }
    }
    out
}

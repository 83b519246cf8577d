//! `std.object`: lookups, path access and non-mutating map updates.

use std::collections::HashSet;

use super::{dict, get_in, list, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{deep_equals, Dict, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.object.has_key", has_key),
    ("std.object.get", get),
    ("std.object.get_in", get_in_op),
    ("std.object.get_or", get_or),
    ("std.object.has_path", has_path),
    ("std.object.keys", keys),
    ("std.object.values", values),
    ("std.object.entries", entries),
    ("std.object.merge", merge),
    ("std.object.merge_deep", merge_deep),
    ("std.object.assoc", assoc),
    ("std.object.dissoc", dissoc),
    ("std.object.pick", pick),
    ("std.object.omit", omit),
    ("std.object.keys_exact", keys_exact),
    ("std.object.keys_include", keys_include),
    ("std.object.keys_exclude", keys_exclude),
    ("std.object.prop_eq", prop_eq),
    ("std.object.where", where_),
];

fn has_key(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (obj, key) = two("has_key", args)?;
    Ok(Value::Bool(
        obj.as_dict().is_some_and(|map| map.contains_key(&key.to_text())),
    ))
}

fn get(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (obj, key) = two("get", args)?;
    match obj {
        Value::Dict(map) => Ok(map.get(&key.to_text()).cloned().unwrap_or(Value::Null)),
        Value::List(items) => {
            let idx = key
                .as_int()
                .ok_or_else(|| EvalError::schema("spec_lang get list index must be int"))?;
            Ok(usize::try_from(idx)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null))
        }
        _ => Err(EvalError::schema("spec_lang get expects dict or list")),
    }
}

fn get_in_op(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (obj, path) = two("get_in", args)?;
    Ok(get_in(obj, list("get_in", path)?).cloned().unwrap_or(Value::Null))
}

fn get_or(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (obj, path, fallback) = three("get_or", args)?;
    Ok(get_in(obj, list("get_or", path)?).unwrap_or(fallback).clone())
}

fn has_path(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (obj, path) = two("has_path", args)?;
    Ok(Value::Bool(get_in(obj, list("has_path", path)?).is_some()))
}

fn keys(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let map = dict("keys", one("keys", args)?)?;
    Ok(Value::List(map.keys().map(|k| Value::str(k.as_str())).collect()))
}

fn values(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let map = dict("values", one("values", args)?)?;
    Ok(Value::List(map.values().cloned().collect()))
}

fn entries(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let map = dict("entries", one("entries", args)?)?;
    Ok(Value::List(
        map.iter()
            .map(|(k, v)| Value::List(vec![Value::str(k.as_str()), v.clone()]))
            .collect(),
    ))
}

fn merge(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (left, right) = two("merge", args)?;
    let mut out = dict("merge", left)?.clone();
    for (k, v) in dict("merge", right)? {
        out.insert(k.clone(), v.clone());
    }
    Ok(Value::Dict(out))
}

fn deep_merge(left: &Dict, right: &Dict) -> Dict {
    let mut out = left.clone();
    for (k, rv) in right {
        let merged = match (out.get(k), rv) {
            (Some(Value::Dict(lv)), Value::Dict(rv)) => Value::Dict(deep_merge(lv, rv)),
            _ => rv.clone(),
        };
        out.insert(k.clone(), merged);
    }
    out
}

fn merge_deep(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (left, right) = two("merge_deep", args)?;
    Ok(Value::Dict(deep_merge(dict("merge_deep", left)?, dict("merge_deep", right)?)))
}

fn assoc(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (key, value, obj) = three("assoc", args)?;
    let mut out = dict("assoc", obj)?.clone();
    out.insert(key.to_text(), value.clone());
    Ok(Value::Dict(out))
}

fn dissoc(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (key, obj) = two("dissoc", args)?;
    let mut out = dict("dissoc", obj)?.clone();
    out.shift_remove(&key.to_text());
    Ok(Value::Dict(out))
}

fn key_set(op: &str, keys: &Value) -> Result<HashSet<String>, EvalError> {
    Ok(list(op, keys)?.iter().map(Value::to_text).collect())
}

fn pick(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (keys, obj) = two("pick", args)?;
    let wanted = key_set("pick", keys)?;
    let map = dict("pick", obj)?;
    Ok(Value::Dict(
        map.iter()
            .filter(|(k, _)| wanted.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    ))
}

fn omit(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (keys, obj) = two("omit", args)?;
    let blocked = key_set("omit", keys)?;
    let map = dict("omit", obj)?;
    Ok(Value::Dict(
        map.iter()
            .filter(|(k, _)| !blocked.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    ))
}

fn key_check(op: &str, args: &[Value], check: fn(&HashSet<String>, &HashSet<String>) -> bool) -> Result<Value, EvalError> {
    let (obj, keys) = two(op, args)?;
    let present: HashSet<String> = dict(op, obj)?.keys().cloned().collect();
    let named = key_set(op, keys)?;
    Ok(Value::Bool(check(&present, &named)))
}

fn keys_exact(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    key_check("keys_exact", args, |present, named| present == named)
}

fn keys_include(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    key_check("keys_include", args, |present, named| named.is_subset(present))
}

fn keys_exclude(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    key_check("keys_exclude", args, |present, named| named.is_disjoint(present))
}

fn prop_eq(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (key, expected, obj) = three("prop_eq", args)?;
    let actual = dict("prop_eq", obj)?.get(&key.to_text()).cloned().unwrap_or(Value::Null);
    Ok(Value::Bool(deep_equals(&actual, expected)))
}

/// Every entry of `spec` holds for `obj`: callables are predicates over
/// the field value, anything else must be deep-equal to it.
fn where_(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (spec, obj) = two("where", args)?;
    let spec = dict("where", spec)?;
    let obj = dict("where", obj)?;
    for (key, expected) in spec {
        let actual = obj.get(key).cloned().unwrap_or(Value::Null);
        let ok = if expected.is_callable() {
            it.apply_predicate(expected, vec![actual])?
        } else {
            deep_equals(&actual, expected)
        };
        if !ok {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

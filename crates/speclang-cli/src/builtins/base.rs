//! `std.core`, `std.logic`, `std.type` and `std.fn`.

use std::cmp::Ordering;

use super::{is_blank, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{compare_values, deep_equals, loose_equals, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.core.subject", subject),
    ("std.core.coalesce", coalesce),
    ("std.core.default_to", default_to),
    ("std.logic.and", and),
    ("std.logic.or", or),
    ("std.logic.not", not),
    ("std.logic.xor", xor),
    ("std.logic.eq", eq),
    ("std.logic.neq", neq),
    ("std.logic.equals", equals),
    ("std.logic.lt", lt),
    ("std.logic.lte", lte),
    ("std.logic.gt", gt),
    ("std.logic.gte", gte),
    ("std.type.json_type", json_type),
    ("std.type.is_null", is_null),
    ("std.type.is_bool", is_bool),
    ("std.type.is_boolean", is_bool),
    ("std.type.is_number", is_number),
    ("std.type.is_integer", is_integer),
    ("std.type.is_string", is_string),
    ("std.type.is_list", is_list),
    ("std.type.is_array", is_list),
    ("std.type.is_dict", is_dict),
    ("std.type.is_object", is_dict),
    ("std.fn.compose", compose),
    ("std.fn.pipe", pipe),
    ("std.fn.identity", identity),
    ("std.fn.always", always),
];

fn subject(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity("subject", 0, args.len()));
    }
    Ok(it.subject.clone())
}

fn coalesce(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(args
        .iter()
        .find(|v| !is_blank(v))
        .cloned()
        .unwrap_or(Value::Null))
}

fn default_to(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (fallback, got) = two("default_to", args)?;
    Ok(if is_blank(got) { fallback } else { got }.clone())
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

fn and(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("and", args)?;
    Ok(Value::Bool(a.truthy() && b.truthy()))
}

fn or(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("or", args)?;
    Ok(Value::Bool(a.truthy() || b.truthy()))
}

fn not(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!one("not", args)?.truthy()))
}

fn xor(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("xor", args)?;
    Ok(Value::Bool(a.truthy() != b.truthy()))
}

fn eq(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("eq", args)?;
    Ok(Value::Bool(loose_equals(a, b)))
}

fn neq(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("neq", args)?;
    Ok(Value::Bool(!loose_equals(a, b)))
}

fn equals(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("equals", args)?;
    Ok(Value::Bool(deep_equals(a, b)))
}

fn ordered(op: &str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, EvalError> {
    let (a, b) = two(op, args)?;
    compare_values(a, b)
        .map(|ord| Value::Bool(accept(ord)))
        .ok_or_else(|| {
            EvalError::schema(format!(
                "spec_lang {op} expects comparable args (got {} and {})",
                a.type_name(),
                b.type_name()
            ))
        })
}

fn lt(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    ordered("lt", args, Ordering::is_lt)
}

fn lte(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    ordered("lte", args, Ordering::is_le)
}

fn gt(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    ordered("gt", args, Ordering::is_gt)
}

fn gte(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    ordered("gte", args, Ordering::is_ge)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Canonical type token: `boolean`, `array` and `object` are aliases.
pub(crate) fn normalize_type_token(raw: &str) -> String {
    let token = raw.trim().to_lowercase();
    match token.as_str() {
        "boolean" => "bool".to_string(),
        "array" => "list".to_string(),
        "object" => "dict".to_string(),
        _ => token,
    }
}

fn json_type(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (v, name) = two("json_type", args)?;
    Ok(Value::Bool(v.type_name() == normalize_type_token(&name.to_text())))
}

fn is_null(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_null", args)?, Value::Null)))
}

fn is_bool(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_bool", args)?, Value::Bool(_))))
}

fn is_number(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(
        one("is_number", args)?,
        Value::Int(_) | Value::Float(_)
    )))
}

fn is_integer(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_integer", args)?, Value::Int(_))))
}

fn is_string(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_string", args)?, Value::Str(_))))
}

fn is_list(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_list", args)?, Value::List(_))))
}

fn is_dict(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(one("is_dict", args)?, Value::Dict(_))))
}

// ---------------------------------------------------------------------------
// Function combinators
// ---------------------------------------------------------------------------

fn compose(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, g, x) = three("compose", args)?;
    let gx = it.apply(g.clone(), vec![x.clone()])?;
    it.apply(f.clone(), vec![gx])
}

fn pipe(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, g, x) = three("pipe", args)?;
    let fx = it.apply(f.clone(), vec![x.clone()])?;
    it.apply(g.clone(), vec![fx])
}

fn identity(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    one("identity", args).cloned()
}

fn always(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    two("always", args).map(|(a, _)| a.clone())
}

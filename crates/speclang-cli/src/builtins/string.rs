//! `std.string`. Non-string arguments are rendered with `Value::to_text`.

use regex::Regex;

use super::{int, list, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::Value;

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.string.contains", contains),
    ("std.string.starts_with", starts_with),
    ("std.string.ends_with", ends_with),
    ("std.string.regex_match", regex_match),
    ("std.string.matches", matches),
    ("std.string.matches_all", matches_all),
    ("std.string.trim", trim),
    ("std.string.lower", lower),
    ("std.string.upper", upper),
    ("std.string.split", split),
    ("std.string.join", join),
    ("std.string.replace", replace),
    ("std.string.pad_left", pad_left),
    ("std.string.pad_right", pad_right),
];

pub(crate) fn compile_regex(op: &str, pattern: &str) -> Result<Regex, EvalError> {
    Regex::new(pattern).map_err(|e| EvalError::schema(format!("spec_lang {op} invalid regex: {e}")))
}

fn contains(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (hay, needle) = two("contains", args)?;
    Ok(Value::Bool(hay.to_text().contains(&needle.to_text())))
}

fn starts_with(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, prefix) = two("starts_with", args)?;
    Ok(Value::Bool(text.to_text().starts_with(&prefix.to_text())))
}

fn ends_with(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, suffix) = two("ends_with", args)?;
    Ok(Value::Bool(text.to_text().ends_with(&suffix.to_text())))
}

fn search(op: &str, args: &[Value]) -> Result<Value, EvalError> {
    let (text, pattern) = two(op, args)?;
    let re = compile_regex(op, &pattern.to_text())?;
    Ok(Value::Bool(re.is_match(&text.to_text())))
}

fn regex_match(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    search("regex_match", args)
}

fn matches(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    search("matches", args)
}

fn matches_all(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, patterns) = two("matches_all", args)?;
    let hay = text.to_text();
    for pattern in list("matches_all", patterns)? {
        if !compile_regex("matches_all", &pattern.to_text())?.is_match(&hay) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn trim(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::str(one("trim", args)?.to_text().trim()))
}

fn lower(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(one("lower", args)?.to_text().to_lowercase()))
}

fn upper(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(one("upper", args)?.to_text().to_uppercase()))
}

fn split(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, sep) = two("split", args)?;
    let sep = sep.to_text();
    if sep.is_empty() {
        return Err(EvalError::schema("spec_lang split expects non-empty separator"));
    }
    Ok(Value::List(text.to_text().split(sep.as_str()).map(Value::str).collect()))
}

fn join(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (seq, sep) = two("join", args)?;
    let parts: Vec<String> = list("join", seq)?.iter().map(Value::to_text).collect();
    Ok(Value::Str(parts.join(&sep.to_text())))
}

fn replace(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, from, to) = three("replace", args)?;
    Ok(Value::Str(text.to_text().replace(&from.to_text(), &to.to_text())))
}

enum Side {
    Left,
    Right,
}

/// Pad with whole copies of `fill` until `width` chars, then cut back to
/// exactly `width` chars from the padded side's opposite end.
fn pad(interp: &Interp<'_>, op: &str, args: &[Value], side: Side) -> Result<Value, EvalError> {
    let (text, width, fill) = three(op, args)?;
    let width = int(op, width)?;
    let fill = fill.to_text();
    if fill.is_empty() {
        return Err(EvalError::schema(format!("spec_lang {op} expects non-empty pad string")));
    }
    if width <= 0 {
        return Ok(Value::str(""));
    }
    interp.check_text(width as u64)?;
    let width = width as usize;
    let text: Vec<char> = text.to_text().chars().collect();
    let fill: Vec<char> = fill.chars().collect();
    let missing = width.saturating_sub(text.len());
    let copies = missing.div_ceil(fill.len());
    let padding = fill.iter().cycle().take(copies * fill.len());
    let kept: String = match side {
        Side::Left => {
            let skip = copies * fill.len() + text.len() - width;
            padding.chain(text.iter()).skip(skip).collect()
        }
        Side::Right => text.iter().chain(padding).take(width).collect(),
    };
    Ok(Value::Str(kept))
}

fn pad_left(interp: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    pad(interp, "pad_left", args, Side::Left)
}

fn pad_right(interp: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    pad(interp, "pad_right", args, Side::Right)
}

//! `std.collection` and `std.set`. Set operations use deep equality and
//! keep first-seen order.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::{distinct, includes, int, list, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{compare_values, loose_equals, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.collection.len", len),
    ("std.collection.count", count),
    ("std.collection.first", first),
    ("std.collection.rest", rest),
    ("std.collection.last", last),
    ("std.collection.nth", nth),
    ("std.collection.map", map),
    ("std.collection.filter", filter),
    ("std.collection.reject", reject),
    ("std.collection.find", find),
    ("std.collection.reduce", reduce),
    ("std.collection.partition", partition),
    ("std.collection.group_by", group_by),
    ("std.collection.uniq_by", uniq_by),
    ("std.collection.flatten", flatten),
    ("std.collection.concat", concat),
    ("std.collection.append", append),
    ("std.collection.prepend", prepend),
    ("std.collection.take", take),
    ("std.collection.drop", drop),
    ("std.collection.slice", slice),
    ("std.collection.reverse", reverse),
    ("std.collection.zip", zip),
    ("std.collection.zip_with", zip_with),
    ("std.collection.range", range),
    ("std.collection.repeat", repeat),
    ("std.collection.any", any),
    ("std.collection.all", all),
    ("std.collection.none", none),
    ("std.collection.is_empty", is_empty),
    ("std.collection.distinct", distinct_op),
    ("std.collection.sort", sort),
    ("std.collection.sort_by", sort_by),
    ("std.collection.pluck", pluck),
    ("std.collection.in", in_),
    ("std.collection.includes", includes_op),
    ("std.set.union", union),
    ("std.set.intersection", intersection),
    ("std.set.difference", difference),
    ("std.set.symmetric_difference", symmetric_difference),
    ("std.set.is_subset", is_subset),
    ("std.set.is_superset", is_superset),
    ("std.set.set_equals", set_equals),
    ("std.set.contains_all", contains_all),
    ("std.set.contains_any", contains_any),
];

fn size(op: &str, args: &[Value]) -> Result<Value, EvalError> {
    let n = match one(op, args)? {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Dict(map) => map.len(),
        _ => return Err(EvalError::schema(format!("spec_lang {op} expects string/list/dict"))),
    };
    Ok(Value::Int(n as i64))
}

fn len(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    size("len", args)
}

fn count(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    size("count", args)
}

fn first(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("first", one("first", args)?)?;
    Ok(seq.first().cloned().unwrap_or(Value::Null))
}

fn rest(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("rest", one("rest", args)?)?;
    Ok(Value::List(seq.iter().skip(1).cloned().collect()))
}

fn last(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("last", one("last", args)?)?;
    Ok(seq.last().cloned().unwrap_or(Value::Null))
}

fn nth(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (seq, idx) = two("nth", args)?;
    let seq = list("nth", seq)?;
    let idx = int("nth", idx)?;
    Ok(usize::try_from(idx)
        .ok()
        .and_then(|i| seq.get(i))
        .cloned()
        .unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Higher-order
// ---------------------------------------------------------------------------

fn map(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, seq) = two("map", args)?;
    let out = list("map", seq)?
        .iter()
        .map(|item| it.apply(f.clone(), vec![item.clone()]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::List(out))
}

fn keep(op: &str, it: &mut Interp<'_>, args: &[Value], want: bool) -> Result<Value, EvalError> {
    let (f, seq) = two(op, args)?;
    let mut out = Vec::new();
    for item in list(op, seq)? {
        if it.apply_predicate(f, vec![item.clone()])? == want {
            out.push(item.clone());
        }
    }
    Ok(Value::List(out))
}

fn filter(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    keep("filter", it, args, true)
}

fn reject(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    keep("reject", it, args, false)
}

fn find(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, seq) = two("find", args)?;
    for item in list("find", seq)? {
        if it.apply_predicate(f, vec![item.clone()])? {
            return Ok(item.clone());
        }
    }
    Ok(Value::Null)
}

fn reduce(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, init, seq) = three("reduce", args)?;
    let mut acc = init.clone();
    for item in list("reduce", seq)? {
        acc = it.apply(f.clone(), vec![acc, item.clone()])?;
    }
    Ok(acc)
}

fn partition(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, seq) = two("partition", args)?;
    let (mut yes, mut no) = (Vec::new(), Vec::new());
    for item in list("partition", seq)? {
        if it.apply_predicate(f, vec![item.clone()])? {
            yes.push(item.clone());
        } else {
            no.push(item.clone());
        }
    }
    Ok(Value::List(vec![Value::List(yes), Value::List(no)]))
}

/// Groups keyed by the text of `f(item)`, in first-seen order.
fn group_by(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, seq) = two("group_by", args)?;
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
    for item in list("group_by", seq)? {
        let key = it.apply(f.clone(), vec![item.clone()])?.to_text();
        groups.entry(key).or_default().push(item.clone());
    }
    Ok(Value::Dict(
        groups.into_iter().map(|(k, v)| (k, Value::List(v))).collect(),
    ))
}

fn uniq_by(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, seq) = two("uniq_by", args)?;
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for item in list("uniq_by", seq)? {
        let marker = it.apply(f.clone(), vec![item.clone()])?;
        if !includes(&seen, &marker) {
            seen.push(marker);
            out.push(item.clone());
        }
    }
    Ok(Value::List(out))
}

fn zip_with(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (f, left, right) = three("zip_with", args)?;
    let pairs = list("zip_with", left)?.iter().zip(list("zip_with", right)?);
    let mut out = Vec::new();
    for (a, b) in pairs {
        out.push(it.apply(f.clone(), vec![a.clone(), b.clone()])?);
    }
    Ok(Value::List(out))
}

/// Stable sort. A string key sorts dict items by the text of that field;
/// a callable key sorts by its result, which must be mutually comparable.
fn sort_by(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (seq, key) = two("sort_by", args)?;
    let seq = list("sort_by", seq)?;
    let keys: Vec<Value> = match key {
        Value::Str(field) => seq
            .iter()
            .map(|item| {
                let text = match item {
                    Value::Dict(map) => map.get(field).cloned().unwrap_or(Value::Null).to_text(),
                    other => other.to_text(),
                };
                Value::Str(text)
            })
            .collect(),
        f if f.is_callable() => seq
            .iter()
            .map(|item| it.apply(f.clone(), vec![item.clone()]))
            .collect::<Result<_, _>>()?,
        _ => return Err(EvalError::schema("spec_lang sort_by expects field name or callable key")),
    };
    if let Some(anchor) = keys.first() {
        if keys.iter().any(|k| compare_values(k, anchor).is_none()) {
            return Err(EvalError::schema("spec_lang sort_by keys must be mutually comparable"));
        }
    }
    let mut order: Vec<usize> = (0..seq.len()).collect();
    order.sort_by(|&a, &b| compare_values(&keys[a], &keys[b]).unwrap_or(Ordering::Equal));
    Ok(Value::List(order.into_iter().map(|i| seq[i].clone()).collect()))
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

fn flatten(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    flatten_into(list("flatten", one("flatten", args)?)?, &mut out);
    Ok(Value::List(out))
}

fn concat(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("concat", args)?;
    let mut out = list("concat", a)?.to_vec();
    out.extend_from_slice(list("concat", b)?);
    Ok(Value::List(out))
}

fn append(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (value, seq) = two("append", args)?;
    let mut out = list("append", seq)?.to_vec();
    out.push(value.clone());
    Ok(Value::List(out))
}

fn prepend(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (value, seq) = two("prepend", args)?;
    let mut out = vec![value.clone()];
    out.extend_from_slice(list("prepend", seq)?);
    Ok(Value::List(out))
}

fn count_arg(op: &str, n: &Value) -> Result<usize, EvalError> {
    let n = n
        .as_int()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects integer count")))?;
    Ok(usize::try_from(n.max(0)).unwrap_or(usize::MAX))
}

fn take(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (n, seq) = two("take", args)?;
    let n = count_arg("take", n)?;
    Ok(Value::List(list("take", seq)?.iter().take(n).cloned().collect()))
}

fn drop(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (n, seq) = two("drop", args)?;
    let n = count_arg("drop", n)?;
    Ok(Value::List(list("drop", seq)?.iter().skip(n).cloned().collect()))
}

/// Python-style slice bound: negative counts from the end, clamped.
fn slice_bound(idx: i64, len: usize) -> usize {
    let len = len as i64;
    let idx = if idx < 0 { (idx + len).max(0) } else { idx.min(len) };
    idx as usize
}

fn slice(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (start, end, seq) = three("slice", args)?;
    let seq = list("slice", seq)?;
    let start = slice_bound(int("slice", start)?, seq.len());
    let end = slice_bound(int("slice", end)?, seq.len());
    if start >= end {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::List(seq[start..end].to_vec()))
}

fn reverse(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("reverse", one("reverse", args)?)?;
    Ok(Value::List(seq.iter().rev().cloned().collect()))
}

fn zip(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("zip", args)?;
    Ok(Value::List(
        list("zip", a)?
            .iter()
            .zip(list("zip", b)?)
            .map(|(x, y)| Value::List(vec![x.clone(), y.clone()]))
            .collect(),
    ))
}

fn range(interp: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (start, end) = two("range", args)?;
    let (start, end) = (int("range", start)?, int("range", end)?);
    let count = (i128::from(end) - i128::from(start)).max(0);
    interp.check_items(u64::try_from(count).unwrap_or(u64::MAX))?;
    Ok(Value::List((start..end).map(Value::Int).collect()))
}

fn repeat(interp: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (value, times) = two("repeat", args)?;
    let times = int("repeat", times)?;
    if times < 0 {
        return Err(EvalError::schema("spec_lang repeat expects non-negative count"));
    }
    interp.check_items(times as u64)?;
    Ok(Value::List(vec![value.clone(); times as usize]))
}

// ---------------------------------------------------------------------------
// Predicates and ordering
// ---------------------------------------------------------------------------

fn any(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("any", one("any", args)?)?;
    Ok(Value::Bool(seq.iter().any(Value::truthy)))
}

fn all(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("all", one("all", args)?)?;
    Ok(Value::Bool(seq.iter().all(Value::truthy)))
}

fn none(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("none", one("none", args)?)?;
    Ok(Value::Bool(!seq.iter().any(Value::truthy)))
}

fn is_empty(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let empty = match one("is_empty", args)? {
        Value::Str(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Dict(map) => map.is_empty(),
        _ => return Err(EvalError::schema("spec_lang is_empty expects list/dict/string")),
    };
    Ok(Value::Bool(empty))
}

fn distinct_op(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::List(distinct(list("distinct", one("distinct", args)?)?)))
}

fn sort(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("sort", one("sort", args)?)?;
    let Some(head) = seq.first() else {
        return Ok(Value::List(Vec::new()));
    };
    if !matches!(head, Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Bool(_)) {
        return Err(EvalError::schema("spec_lang sort expects scalar list values"));
    }
    let kind = std::mem::discriminant(head);
    if seq.iter().any(|v| std::mem::discriminant(v) != kind) {
        return Err(EvalError::schema("spec_lang sort expects homogeneous list element types"));
    }
    let mut out = seq.to_vec();
    out.sort_by(|a, b| match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        _ => compare_values(a, b).unwrap_or(Ordering::Equal),
    });
    Ok(Value::List(out))
}

fn pluck(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (seq, key) = two("pluck", args)?;
    let key = key.to_text();
    Ok(Value::List(
        list("pluck", seq)?
            .iter()
            .map(|item| match item {
                Value::Dict(map) => map.get(&key).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            })
            .collect(),
    ))
}

fn in_(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (member, container) = two("in", args)?;
    let found = match container {
        Value::List(items) => items.iter().any(|item| loose_equals(item, member)),
        Value::Dict(map) => map.contains_key(&member.to_text()),
        Value::Str(s) => s.contains(&member.to_text()),
        _ => return Err(EvalError::schema("spec_lang in expects list/dict/string container")),
    };
    Ok(Value::Bool(found))
}

fn includes_op(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (seq, value) = two("includes", args)?;
    Ok(Value::Bool(includes(list("includes", seq)?, value)))
}

// ---------------------------------------------------------------------------
// Sets
// ---------------------------------------------------------------------------

fn pair<'v>(op: &str, args: &'v [Value]) -> Result<(&'v [Value], &'v [Value]), EvalError> {
    let (a, b) = two(op, args)?;
    Ok((list(op, a)?, list(op, b)?))
}

fn union(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("union", args)?;
    Ok(Value::List(distinct(&[a, b].concat())))
}

/// Items of `from` (deduplicated) whose membership in `other` equals `want`.
fn select(from: &[Value], other: &[Value], want: bool, out: &mut Vec<Value>) {
    for item in from {
        if includes(other, item) == want && !includes(out, item) {
            out.push(item.clone());
        }
    }
}

fn intersection(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("intersection", args)?;
    let mut out = Vec::new();
    select(a, b, true, &mut out);
    Ok(Value::List(out))
}

fn difference(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("difference", args)?;
    let mut out = Vec::new();
    select(a, b, false, &mut out);
    Ok(Value::List(out))
}

fn symmetric_difference(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("symmetric_difference", args)?;
    let mut out = Vec::new();
    select(a, b, false, &mut out);
    select(b, a, false, &mut out);
    Ok(Value::List(out))
}

fn subset(of: &[Value], within: &[Value]) -> bool {
    of.iter().all(|item| includes(within, item))
}

fn is_subset(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("is_subset", args)?;
    Ok(Value::Bool(subset(a, b)))
}

fn is_superset(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("is_superset", args)?;
    Ok(Value::Bool(subset(b, a)))
}

fn set_equals(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = pair("set_equals", args)?;
    let (a, b) = (distinct(a), distinct(b));
    Ok(Value::Bool(a.len() == b.len() && subset(&a, &b)))
}

fn contains_all(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (container, wanted) = pair("contains_all", args)?;
    Ok(Value::Bool(subset(wanted, container)))
}

fn contains_any(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (container, candidates) = pair("contains_any", args)?;
    Ok(Value::Bool(candidates.iter().any(|item| includes(container, item))))
}

//! `std.json` and the `std.schema` validator.
//!
//! Schema nodes are plain dicts (`type`, `required`, `properties`, `items`,
//! `pattern`, `enum`, `all_of`, `any_of`, `not`, ...). Validation never
//! fails; it collects `"{path}: {problem}"` strings rooted at `$`.

use serde_json::{Map, Value as Json};

use super::base::normalize_type_token;
use super::string::compile_regex;
use super::{one, string, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{deep_equals, Dict, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.json.parse", parse),
    ("std.json.stringify", stringify),
    ("std.schema.match", schema_match),
    ("std.schema.errors", schema_errors),
];

fn parse(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let raw = string("json_parse", one("json_parse", args)?)?;
    let json: Json = serde_json::from_str(raw)
        .map_err(|e| EvalError::schema(format!("spec_lang json_parse invalid JSON: {e}")))?;
    Ok(Value::from_json(&json))
}

fn stringify(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let json = sorted(one("json_stringify", args)?.to_json()?);
    serde_json::to_string(&json)
        .map(Value::Str)
        .map_err(|e| EvalError::runtime(format!("spec_lang json_stringify failed: {e}")))
}

/// Canonical key order for stringified output.
pub(crate) fn sorted(json: Json) -> Json {
    match json {
        Json::Object(map) => {
            let mut entries: Vec<(String, Json)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Json::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect::<Map<_, _>>())
        }
        Json::Array(items) => Json::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn schema_match(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (value, schema) = two("schema_match", args)?;
    Ok(Value::Bool(validate(value, schema).is_empty()))
}

fn schema_errors(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (value, schema) = two("schema_errors", args)?;
    Ok(Value::List(validate(value, schema).into_iter().map(Value::Str).collect()))
}

pub(crate) fn validate(value: &Value, schema: &Value) -> Vec<String> {
    let mut out = Vec::new();
    check(value, schema, "$", &mut out);
    out
}

const SCHEMA_KEYS: &[&str] = &[
    "type",
    "required",
    "properties",
    "allow_extra",
    "items",
    "min_items",
    "max_items",
    "min_length",
    "max_length",
    "pattern",
    "const",
    "enum",
    "all_of",
    "any_of",
    "not",
];

fn type_ok(value: &Value, expected: &str) -> bool {
    let token = normalize_type_token(expected);
    if token == "integer" {
        return matches!(value, Value::Int(_));
    }
    value.type_name() == token
}

fn non_negative(v: &Value) -> Option<usize> {
    v.as_int().and_then(|n| usize::try_from(n).ok())
}

/// Shared shape of the four size bounds.
fn bound(
    schema: &Dict,
    key: &str,
    actual: Option<usize>,
    kind: &str,
    path: &str,
    out: &mut Vec<String>,
) {
    let Some(raw) = schema.get(key) else { return };
    let Some(limit) = non_negative(raw) else {
        out.push(format!("{path}.{key}: must be non-negative int"));
        return;
    };
    let Some(actual) = actual else {
        out.push(format!("{path}: {key} requires {kind} value"));
        return;
    };
    let violated = if key.starts_with("min") { actual < limit } else { actual > limit };
    if violated {
        out.push(format!("{path}: {key} violation"));
    }
}

fn check(value: &Value, schema: &Value, path: &str, out: &mut Vec<String>) {
    let Value::Dict(node) = schema else {
        out.push(format!("{path}: schema node must be mapping"));
        return;
    };
    for key in node.keys() {
        if !SCHEMA_KEYS.contains(&key.as_str()) {
            out.push(format!("{path}: unknown schema key '{key}'"));
        }
    }

    if let Some(typ) = node.get("type") {
        match typ.as_str().filter(|t| !t.trim().is_empty()) {
            None => out.push(format!("{path}.type: must be non-empty string")),
            Some(t) if !type_ok(value, t) => {
                out.push(format!("{path}: type mismatch expected {t}"))
            }
            Some(_) => {}
        }
    }

    if let Some(expected) = node.get("const") {
        if !deep_equals(value, expected) {
            out.push(format!("{path}: const mismatch"));
        }
    }

    if let Some(options) = node.get("enum") {
        match options.as_list().filter(|l| !l.is_empty()) {
            None => out.push(format!("{path}.enum: must be non-empty list")),
            Some(l) if !l.iter().any(|item| deep_equals(value, item)) => {
                out.push(format!("{path}: enum mismatch"))
            }
            Some(_) => {}
        }
    }

    if let Some(pattern) = node.get("pattern") {
        match pattern.as_str().filter(|p| !p.is_empty()) {
            None => out.push(format!("{path}.pattern: must be non-empty string")),
            Some(p) => match value.as_str() {
                None => out.push(format!("{path}: pattern requires string value")),
                Some(text) => match compile_regex("schema pattern", p) {
                    Ok(re) if re.is_match(text) => {}
                    Ok(_) => out.push(format!("{path}: pattern mismatch")),
                    Err(e) => out.push(format!("{path}.pattern: {e}")),
                },
            },
        }
    }

    let text_len = value.as_str().map(|s| s.chars().count());
    bound(node, "min_length", text_len, "string", path, out);
    bound(node, "max_length", text_len, "string", path, out);

    if let Some(required) = node.get("required") {
        let keys: Option<Vec<&str>> = required.as_list().and_then(|l| {
            l.iter()
                .map(|k| k.as_str().filter(|s| !s.trim().is_empty()))
                .collect()
        });
        match (keys, value.as_dict()) {
            (None, _) => out.push(format!("{path}.required: must be list of non-empty strings")),
            (Some(_), None) => out.push(format!("{path}: required requires object value")),
            (Some(keys), Some(obj)) => {
                for key in keys {
                    if !obj.contains_key(key) {
                        out.push(format!("{path}.{key}: missing required key"));
                    }
                }
            }
        }
    }

    if let Some(props) = node.get("properties") {
        match (props.as_dict(), value.as_dict()) {
            (None, _) => out.push(format!("{path}.properties: must be mapping")),
            (Some(_), None) => out.push(format!("{path}: properties requires object value")),
            (Some(props), Some(obj)) => {
                for (key, child) in props {
                    if let Some(v) = obj.get(key) {
                        check(v, child, &format!("{path}.{key}"), out);
                    }
                }
                match node.get("allow_extra").unwrap_or(&Value::Bool(true)) {
                    Value::Bool(true) => {}
                    Value::Bool(false) => {
                        for key in obj.keys().filter(|k| !props.contains_key(*k)) {
                            out.push(format!("{path}.{key}: extra key not allowed"));
                        }
                    }
                    _ => out.push(format!("{path}.allow_extra: must be boolean")),
                }
            }
        }
    }

    if let Some(child) = node.get("items") {
        match value.as_list() {
            None => out.push(format!("{path}: items requires array value")),
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    check(item, child, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }

    let item_count = value.as_list().map(<[Value]>::len);
    bound(node, "min_items", item_count, "array", path, out);
    bound(node, "max_items", item_count, "array", path, out);

    if let Some(all_of) = node.get("all_of") {
        match all_of.as_list().filter(|l| !l.is_empty()) {
            None => out.push(format!("{path}.all_of: must be non-empty list")),
            Some(children) => {
                for (idx, child) in children.iter().enumerate() {
                    check(value, child, &format!("{path}.all_of[{idx}]"), out);
                }
            }
        }
    }

    if let Some(any_of) = node.get("any_of") {
        match any_of.as_list().filter(|l| !l.is_empty()) {
            None => out.push(format!("{path}.any_of: must be non-empty list")),
            Some(children) => {
                let matched = children.iter().any(|child| {
                    let mut scratch = Vec::new();
                    check(value, child, path, &mut scratch);
                    scratch.is_empty()
                });
                if !matched {
                    out.push(format!("{path}: any_of mismatch"));
                }
            }
        }
    }

    if let Some(negated) = node.get("not") {
        let mut scratch = Vec::new();
        check(value, negated, path, &mut scratch);
        if scratch.is_empty() {
            out.push(format!("{path}: not mismatch"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(json: Json) -> Value {
        Value::from_json(&json)
    }

    #[test]
    fn nested_errors_carry_paths() {
        let schema = v(serde_json::json!({
            "type": "object",
            "required": ["name", "tags"],
            "properties": {
                "name": {"type": "string", "min_length": 2},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "allow_extra": false
        }));
        let value = v(serde_json::json!({"name": "x", "tags": ["a", 3], "extra": 1}));
        assert_eq!(
            validate(&value, &schema),
            vec![
                "$.name: min_length violation",
                "$.tags[1]: type mismatch expected string",
                "$.extra: extra key not allowed",
            ]
        );
    }

    #[test]
    fn unknown_keys_and_bad_nodes() {
        let schema = v(serde_json::json!({"tpye": "string", "enum": []}));
        assert_eq!(
            validate(&Value::str("a"), &schema),
            vec!["$: unknown schema key 'tpye'", "$.enum: must be non-empty list"]
        );
        assert_eq!(
            validate(&Value::Null, &Value::Int(1)),
            vec!["$: schema node must be mapping"]
        );
    }

    #[test]
    fn integer_type_excludes_floats() {
        let schema = v(serde_json::json!({"type": "integer"}));
        assert!(validate(&Value::Int(3), &schema).is_empty());
        assert_eq!(
            validate(&Value::Float(3.0), &schema),
            vec!["$: type mismatch expected integer"]
        );
    }

    #[test]
    fn combinators() {
        let schema = v(serde_json::json!({
            "any_of": [{"type": "string"}, {"type": "number"}],
            "not": {"const": 0}
        }));
        assert!(validate(&Value::Int(4), &schema).is_empty());
        assert_eq!(validate(&Value::Int(0), &schema), vec!["$: not mismatch"]);
        assert_eq!(validate(&Value::Null, &schema), vec!["$: any_of mismatch"]);
    }

    #[test]
    fn stringify_sorts_keys() {
        let json = sorted(serde_json::json!({"b": 1, "a": {"d": 2.0, "c": [true]}}));
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            r#"{"a":{"c":[true],"d":2.0},"b":1}"#
        );
    }
}

//! Compiler from the operator-keyed mapping form into [`Expr`].
//!
//! Authors write `{op: [args...]}`, `{var: name}`, `{lit: data}`,
//! `{fn: [[params], body]}` and `{let: [[[name, expr]...], body]}`. Bare
//! lists are rejected everywhere an expression is expected; literal
//! lists and maps must be wrapped in `lit`.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use speclang_ast::ast::{is_scalar, Binding, Expr};

/// Maximum nesting depth of an authored expression.
pub const MAX_NESTING_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct CompileError {
    /// Field path of the offending node, e.g. `contract.steps[0].assert[1].eq[0]`.
    pub path: String,
    pub message: String,
}

impl CompileError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        CompileError {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

pub fn compile(node: &Value) -> Result<Expr, CompileError> {
    compile_at(node, "expr")
}

/// Compile one node, prefixing errors with `field_path`.
pub fn compile_at(node: &Value, field_path: &str) -> Result<Expr, CompileError> {
    compile_node(node, field_path, 0)
}

/// Compile a non-empty list of expressions (e.g. a step's `assert` list).
pub fn compile_list(nodes: &Value, field_path: &str) -> Result<Vec<Expr>, CompileError> {
    let items = match nodes {
        Value::Array(items) => items,
        _ => return Err(CompileError::new(field_path, "expression list must be a list")),
    };
    if items.is_empty() {
        return Err(CompileError::new(field_path, "expression list must not be empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| compile_at(item, &format!("{field_path}[{idx}]")))
        .collect()
}

fn compile_node(node: &Value, path: &str, depth: usize) -> Result<Expr, CompileError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CompileError::new(
            path,
            format!("expression nesting exceeds {MAX_NESTING_DEPTH} levels"),
        ));
    }
    match node {
        Value::Array(_) => Err(CompileError::new(
            path,
            "list expressions are not allowed; use operator-keyed mapping AST and wrap literal lists with lit",
        )),
        Value::Object(map) => compile_mapping(map, path, depth),
        scalar => Ok(Expr::Lit(scalar.clone())),
    }
}

fn compile_mapping(map: &Map<String, Value>, path: &str, depth: usize) -> Result<Expr, CompileError> {
    if map.is_empty() {
        return Err(CompileError::new(path, "expression mapping must not be empty"));
    }
    if map.contains_key("lit") {
        if map.len() != 1 {
            return Err(CompileError::new(path, "lit wrapper must be the only key in a mapping"));
        }
        return Ok(Expr::Lit(map["lit"].clone()));
    }
    if map.len() != 1 {
        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
        keys.sort_unstable();
        return Err(CompileError::new(
            path,
            format!(
                "expression mapping must have exactly one operator key (found: {})",
                keys.join(", ")
            ),
        ));
    }
    let Some((raw_op, raw_args)) = map.iter().next() else {
        return Err(CompileError::new(path, "expression mapping must not be empty"));
    };
    let op = raw_op.trim();
    if op.is_empty() {
        return Err(CompileError::new(path, "operator key must be non-empty"));
    }
    let op_path = format!("{path}.{op}");
    match op {
        "var" => compile_var(raw_args, &op_path),
        "fn" => compile_fn(raw_args, &op_path, depth),
        "let" => compile_let(raw_args, &op_path, depth),
        _ => {
            let args = match raw_args {
                Value::Array(args) => args,
                _ => return Err(CompileError::new(&op_path, "operator args must be a list")),
            };
            let args = args
                .iter()
                .enumerate()
                .map(|(idx, arg)| {
                    compile_node(arg, &format!("{op_path}[{idx}]"), depth + 1).map(Arc::new)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Op {
                head: op.to_string(),
                args,
            })
        }
    }
}

fn compile_var(raw: &Value, path: &str) -> Result<Expr, CompileError> {
    let name = match raw {
        Value::String(s) => s,
        Value::Array(items) if items.len() == 1 => match &items[0] {
            Value::String(s) => s,
            _ => return Err(CompileError::new(path, "var name must be a non-empty string")),
        },
        _ => return Err(CompileError::new(path, "var name must be a non-empty string")),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CompileError::new(path, "var name must be a non-empty string"));
    }
    Ok(Expr::Var(name.to_string()))
}

fn two_args<'v>(raw: &'v Value, path: &str, form: &str) -> Result<(&'v Value, &'v Value), CompileError> {
    match raw.as_array().map(Vec::as_slice) {
        Some([first, second]) => Ok((first, second)),
        Some(other) => Err(CompileError::new(
            path,
            format!("spec_lang arity error for {form}: expected 2 got {}", other.len()),
        )),
        None => Err(CompileError::new(path, "operator args must be a list")),
    }
}

fn compile_fn(raw: &Value, path: &str, depth: usize) -> Result<Expr, CompileError> {
    let (params, body) = two_args(raw, path, "fn")?;
    let params_path = format!("{path}[0]");
    let params = match params {
        Value::Array(params) => params,
        _ => return Err(CompileError::new(&params_path, "spec_lang fn params must be a list")),
    };
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(params.len());
    for param in params {
        let name = match param {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                return Err(CompileError::new(
                    &params_path,
                    "spec_lang fn param must be non-empty string",
                ))
            }
        };
        if !seen.insert(name.clone()) {
            return Err(CompileError::new(&params_path, format!("duplicate fn param: {name}")));
        }
        out.push(name);
    }
    let body = compile_node(body, &format!("{path}[1]"), depth + 1)?;
    Ok(Expr::Fn {
        params: out,
        body: Arc::new(body),
    })
}

fn compile_let(raw: &Value, path: &str, depth: usize) -> Result<Expr, CompileError> {
    let (bindings, body) = two_args(raw, path, "let")?;
    let bindings_path = format!("{path}[0]");
    let bindings = match bindings {
        Value::Array(b) => b,
        _ => return Err(CompileError::new(&bindings_path, "spec_lang let bindings must be a list")),
    };
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(bindings.len());
    for (idx, binding) in bindings.iter().enumerate() {
        let binding_path = format!("{bindings_path}[{idx}]");
        let (name, value) = match binding.as_array().map(Vec::as_slice) {
            Some([name, value]) => (name, value),
            _ => return Err(CompileError::new(&binding_path, "spec_lang let binding must be [name, expr]")),
        };
        let name = match name {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                return Err(CompileError::new(
                    &binding_path,
                    "spec_lang let binding name must be non-empty string",
                ))
            }
        };
        if !seen.insert(name.clone()) {
            return Err(CompileError::new(&binding_path, format!("duplicate let binding: {name}")));
        }
        let value = compile_node(value, &format!("{binding_path}[1]"), depth + 1)?;
        out.push(Binding {
            name,
            value: Arc::new(value),
        });
    }
    let body = compile_node(body, &format!("{path}[1]"), depth + 1)?;
    Ok(Expr::Let {
        bindings: out,
        body: Arc::new(body),
    })
}

/// Inverse of [`compile`]: render an expression back to the authoring form.
pub fn decompile(expr: &Expr) -> Value {
    match expr {
        Expr::Lit(v) if is_scalar(v) => v.clone(),
        Expr::Lit(v) => single("lit", v.clone()),
        Expr::Var(name) => single("var", Value::from(name.as_str())),
        Expr::Fn { params, body } => single(
            "fn",
            Value::Array(vec![
                Value::Array(params.iter().map(|p| Value::from(p.as_str())).collect()),
                decompile(body),
            ]),
        ),
        Expr::Let { bindings, body } => single(
            "let",
            Value::Array(vec![
                Value::Array(
                    bindings
                        .iter()
                        .map(|b| Value::Array(vec![Value::from(b.name.as_str()), decompile(&b.value)]))
                        .collect(),
                ),
                decompile(body),
            ]),
        ),
        Expr::Op { head, args } => single(head, Value::Array(args.iter().map(|a| decompile(a)).collect())),
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_passes_through() {
        assert_eq!(compile(&json!(3)).unwrap(), Expr::lit(3));
        assert_eq!(compile(&json!(null)).unwrap(), Expr::Lit(Value::Null));
    }

    #[test]
    fn nested_path_in_error() {
        let err = compile_at(&json!({"eq": [{"len": [[1, 2]]}, 2]}), "contract.steps[0].assert").unwrap_err();
        assert_eq!(err.path, "contract.steps[0].assert.eq[0].len[0]");
        assert!(err.message.contains("list expressions are not allowed"));
    }

    #[test]
    fn depth_limit() {
        let mut node = json!(1);
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            node = json!({"not": [node]});
        }
        let err = compile(&node).unwrap_err();
        assert!(err.message.contains("nesting exceeds"));
    }
}

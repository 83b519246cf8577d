//! Filesystem-facing builtins: metadata rows, mutations, directory walks
//! and the `ops.fs.json` / `ops.fs.yaml` document helpers.
//!
//! A metadata row is a dict `{path, type, exists, size_bytes}` where
//! `type` is `"file"` or `"dir"`. Mutations are gated on the `ops.fs`
//! capability before they get here.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde_json::Value as Json;
use walkdir::WalkDir;

use super::json::sorted;
use super::path::{basename, dirname, extname, glob_regex};
use super::{dict, get_in, list, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{Dict, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("ops.fs.file.exists", file_exists),
    ("ops.fs.file.is_file", file_is_file),
    ("ops.fs.file.is_dir", file_is_dir),
    ("ops.fs.file.size_bytes", file_size_bytes),
    ("ops.fs.file.path", file_path),
    ("ops.fs.file.name", file_name),
    ("ops.fs.file.parent", file_parent),
    ("ops.fs.file.ext", file_ext),
    ("ops.fs.file.get", file_get),
    ("ops.fs.file.set", file_set),
    ("ops.fs.file.append", file_append),
    ("ops.fs.file.mkdir_p", file_mkdir_p),
    ("ops.fs.file.remove", file_remove),
    ("ops.fs.walk", walk),
    ("ops.fs.json.parse", json_parse),
    ("ops.fs.json.get", doc_get),
    ("ops.fs.json.get_or", doc_get_or),
    ("ops.fs.json.has_path", doc_has_path),
    ("ops.fs.yaml.parse", yaml_parse),
    ("ops.fs.yaml.stringify", yaml_stringify),
    ("ops.fs.yaml.get", doc_get),
    ("ops.fs.yaml.get_or", doc_get_or),
    ("ops.fs.yaml.has_path", doc_has_path),
];

// ---------------------------------------------------------------------------
// Metadata rows
// ---------------------------------------------------------------------------

fn row<'v>(op: &str, args: &'v [Value]) -> Result<&'v Dict, EvalError> {
    dict(op, one(op, args)?)
}

fn row_type(meta: &Dict) -> String {
    meta.get("type").map(|t| t.to_text().trim().to_string()).unwrap_or_default()
}

fn row_path<'v>(meta: &'v Dict) -> Option<&'v str> {
    meta.get("path").and_then(Value::as_str)
}

fn file_exists(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let meta = row("ops.fs.file.exists", args)?;
    Ok(Value::Bool(meta.get("exists").is_some_and(Value::truthy)))
}

fn file_is_file(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(row_type(row("ops.fs.file.is_file", args)?) == "file"))
}

fn file_is_dir(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(row_type(row("ops.fs.file.is_dir", args)?) == "dir"))
}

fn file_size_bytes(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let meta = row("ops.fs.file.size_bytes", args)?;
    Ok(match meta.get("size_bytes") {
        Some(Value::Int(n)) => Value::Int(*n),
        _ => Value::Null,
    })
}

fn path_field(op: &str, args: &[Value], f: fn(&str) -> String) -> Result<Value, EvalError> {
    Ok(row_path(row(op, args)?).map_or(Value::Null, |p| Value::Str(f(p))))
}

fn file_path(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    path_field("ops.fs.file.path", args, |p| p.to_string())
}

fn file_name(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    path_field("ops.fs.file.name", args, basename)
}

fn file_parent(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    path_field("ops.fs.file.parent", args, dirname)
}

fn file_ext(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    path_field("ops.fs.file.ext", args, extname)
}

fn file_get(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (meta, key, fallback) = three("ops.fs.file.get", args)?;
    let meta = dict("ops.fs.file.get", meta)?;
    Ok(meta.get(&key.to_text()).cloned().unwrap_or_else(|| fallback.clone()))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

fn target_path<'v>(op: &str, v: &'v Value) -> Result<&'v Path, EvalError> {
    match v.as_str() {
        Some(p) if !p.trim().is_empty() => Ok(Path::new(p)),
        _ => Err(EvalError::schema(format!("spec_lang {op} expects non-empty path"))),
    }
}

fn io_error(op: &str, path: &Path, err: std::io::Error) -> EvalError {
    EvalError::runtime(format!("spec_lang {op} failed for {}: {err}", path.display()))
}

fn write_target<'v>(op: &str, args: &'v [Value]) -> Result<(&'v Path, &'v str), EvalError> {
    let (path, content) = two(op, args)?;
    let path = target_path(op, path)?;
    let content = content
        .as_str()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects string content")))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(op, parent, e))?;
    }
    Ok((path, content))
}

fn file_set(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.file.set";
    let (path, content) = write_target(op, args)?;
    fs::write(path, content).map_err(|e| io_error(op, path, e))?;
    Ok(Value::Bool(true))
}

fn file_append(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.file.append";
    let (path, content) = write_target(op, args)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut fh| fh.write_all(content.as_bytes()))
        .map_err(|e| io_error(op, path, e))?;
    Ok(Value::Bool(true))
}

fn file_mkdir_p(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.file.mkdir_p";
    let path = target_path(op, one(op, args)?)?;
    fs::create_dir_all(path).map_err(|e| io_error(op, path, e))?;
    Ok(Value::Bool(true))
}

/// `false` when nothing is there; directories are refused.
fn file_remove(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.file.remove";
    let path = target_path(op, one(op, args)?)?;
    if !path.exists() {
        return Ok(Value::Bool(false));
    }
    if path.is_dir() {
        return Err(EvalError::schema(format!(
            "spec_lang {op} expects file path, got directory"
        )));
    }
    fs::remove_file(path).map_err(|e| io_error(op, path, e))?;
    Ok(Value::Bool(true))
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// `ops.fs.walk(root, {pattern = "*", include_dirs = false, relative = true})`.
///
/// Depth-first, entries sorted by file name. The pattern is matched
/// against the reported path.
fn walk(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.walk";
    let (root, options) = two(op, args)?;
    let options = dict(op, options)?;
    let root = match root.as_str() {
        Some(r) if !r.trim().is_empty() => Path::new(r),
        _ => return Err(EvalError::schema(format!("spec_lang {op} expects non-empty root path"))),
    };
    let pattern = options.get("pattern").map_or_else(|| "*".to_string(), Value::to_text);
    let include_dirs = options.get("include_dirs").is_some_and(Value::truthy);
    let relative = options.get("relative").map_or(true, Value::truthy);
    let re = glob_regex(&pattern)?;
    if !root.exists() {
        return Ok(Value::List(Vec::new()));
    }

    let mut rows = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| EvalError::runtime(format!("spec_lang {op} failed: {e}")))?;
        let is_dir = entry.file_type().is_dir();
        if is_dir && !include_dirs {
            continue;
        }
        let shown = if relative {
            entry.path().strip_prefix(root).unwrap_or(entry.path())
        } else {
            entry.path()
        };
        let shown = shown.to_string_lossy().into_owned();
        if !re.is_match(&shown) {
            continue;
        }
        let mut meta = Dict::new();
        meta.insert("path".into(), Value::Str(shown));
        meta.insert("type".into(), Value::str(if is_dir { "dir" } else { "file" }));
        meta.insert("exists".into(), Value::Bool(true));
        if !is_dir {
            let size = entry.metadata().ok().and_then(|m| i64::try_from(m.len()).ok());
            meta.insert("size_bytes".into(), size.map_or(Value::Null, Value::Int));
        }
        rows.push(Value::Dict(meta));
    }
    Ok(Value::List(rows))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn json_parse(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.json.parse";
    let raw = text_input(op, one(op, args)?)?;
    let json: Json = serde_json::from_str(raw)
        .map_err(|e| EvalError::schema(format!("spec_lang {op} invalid JSON: {e}")))?;
    Ok(Value::from_json(&json))
}

fn yaml_parse(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.yaml.parse";
    let raw = text_input(op, one(op, args)?)?;
    let json: Json = serde_yaml::from_str(raw)
        .map_err(|e| EvalError::schema(format!("spec_lang {op} invalid YAML: {e}")))?;
    Ok(Value::from_json(&json))
}

fn yaml_stringify(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.yaml.stringify";
    let json = sorted(one(op, args)?.to_json()?);
    serde_yaml::to_string(&json)
        .map(Value::Str)
        .map_err(|e| EvalError::runtime(format!("spec_lang {op} failed: {e}")))
}

fn text_input<'v>(op: &str, v: &'v Value) -> Result<&'v str, EvalError> {
    v.as_str()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects string input")))
}

fn doc_get(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (doc, path) = two("ops.fs.json.get", args)?;
    let path = list("ops.fs.json.get", path)?;
    Ok(get_in(doc, path).cloned().unwrap_or(Value::Null))
}

fn doc_get_or(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (doc, path, fallback) = three("ops.fs.json.get_or", args)?;
    let path = list("ops.fs.json.get_or", path)?;
    Ok(get_in(doc, path).cloned().unwrap_or_else(|| fallback.clone()))
}

fn doc_has_path(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (doc, path) = two("ops.fs.json.has_path", args)?;
    let path = list("ops.fs.json.has_path", path)?;
    Ok(Value::Bool(get_in(doc, path).is_some()))
}

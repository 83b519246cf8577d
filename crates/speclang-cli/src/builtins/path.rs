//! Pure `/`-path helpers (`ops.fs.path.*`) and fnmatch-style globbing
//! (`ops.fs.glob.*`). Nothing here touches the filesystem.

use std::cmp::Ordering;

use regex::Regex;

use super::{list, one, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::Value;

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("ops.fs.path.normalize", path_normalize),
    ("ops.fs.path.join", path_join),
    ("ops.fs.path.split", path_split),
    ("ops.fs.path.dirname", path_dirname),
    ("ops.fs.path.basename", path_basename),
    ("ops.fs.path.extname", path_extname),
    ("ops.fs.path.stem", path_stem),
    ("ops.fs.path.is_abs", path_is_abs),
    ("ops.fs.path.has_ext", path_has_ext),
    ("ops.fs.path.change_ext", path_change_ext),
    ("ops.fs.path.relativize", path_relativize),
    ("ops.fs.path.common_prefix", path_common_prefix),
    ("ops.fs.path.parents", path_parents),
    ("ops.fs.path.within", path_within),
    ("ops.fs.path.compare", path_compare),
    ("ops.fs.path.sort", path_sort),
    ("ops.fs.glob.match", glob_match),
    ("ops.fs.glob.filter", glob_filter),
    ("ops.fs.glob.any", glob_any),
    ("ops.fs.glob.all", glob_all),
];

// ---------------------------------------------------------------------------
// Path algebra
// ---------------------------------------------------------------------------

/// Collapse `.`, `..` and repeated separators. Empty input is `.`;
/// `..` above an absolute root is dropped.
pub(crate) fn normalize(path: &str) -> String {
    let raw = path.trim();
    if raw.is_empty() {
        return ".".to_string();
    }
    let absolute = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn segments(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    normalized
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .map(str::to_string)
        .collect()
}

fn rejoin(absolute: bool, parts: &[String]) -> String {
    match (absolute, parts.is_empty()) {
        (true, _) => format!("/{}", parts.join("/")),
        (false, true) => ".".to_string(),
        (false, false) => parts.join("/"),
    }
}

pub(crate) fn basename(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.as_str() {
        "/" => String::new(),
        "." => ".".to_string(),
        _ => segments(&normalized).pop().unwrap_or_default(),
    }
}

pub(crate) fn dirname(path: &str) -> String {
    let normalized = normalize(path);
    let mut parts = segments(&normalized);
    parts.pop();
    rejoin(normalized.starts_with('/'), &parts)
}

pub(crate) fn extname(path: &str) -> String {
    let base = basename(path);
    if base == "." || base == ".." {
        return String::new();
    }
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_string(),
        _ => String::new(),
    }
}

fn stem(path: &str) -> String {
    let base = basename(path);
    let ext = extname(path);
    base[..base.len() - ext.len()].to_string()
}

fn normalize_ext(ext: &str) -> String {
    let token = ext.trim();
    if token.is_empty() || token.starts_with('.') {
        token.to_string()
    } else {
        format!(".{token}")
    }
}

fn relativize(base: &str, path: &str) -> String {
    let (base, path) = (normalize(base), normalize(path));
    if base.starts_with('/') != path.starts_with('/') {
        return path;
    }
    let (from, to) = (segments(&base), segments(&path));
    let shared = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut rel: Vec<String> = vec!["..".to_string(); from.len() - shared];
    rel.extend_from_slice(&to[shared..]);
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.join("/")
    }
}

fn common_prefix(paths: &[String]) -> String {
    let Some(head) = paths.first() else {
        return ".".to_string();
    };
    let absolute = normalize(head).starts_with('/');
    if paths.iter().any(|p| normalize(p).starts_with('/') != absolute) {
        return ".".to_string();
    }
    let split: Vec<Vec<String>> = paths.iter().map(|p| segments(p)).collect();
    let mut prefix = Vec::new();
    for (idx, seg) in split[0].iter().enumerate() {
        if split.iter().all(|parts| parts.get(idx) == Some(seg)) {
            prefix.push(seg.clone());
        } else {
            break;
        }
    }
    rejoin(absolute, &prefix)
}

fn parents(path: &str) -> Vec<String> {
    let mut current = normalize(path);
    let mut out: Vec<String> = Vec::new();
    if current == "/" || current == "." {
        return out;
    }
    loop {
        let parent = dirname(&current);
        if parent == current || out.contains(&parent) {
            break;
        }
        out.push(parent.clone());
        if parent == "/" || parent == "." {
            break;
        }
        current = parent;
    }
    out
}

fn within(base: &str, path: &str) -> bool {
    let (base, path) = (normalize(base), normalize(path));
    let absolute = path.starts_with('/');
    if base.starts_with('/') != absolute {
        return false;
    }
    if base == path || base == "/" || base == "." {
        return true;
    }
    let (base_parts, path_parts) = (segments(&base), segments(&path));
    path_parts.starts_with(&base_parts)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn path_arg<'v>(op: &str, v: &'v Value) -> Result<&'v str, EvalError> {
    v.as_str()
        .ok_or_else(|| EvalError::schema(format!("spec_lang ops.fs.path.{op} expects string path")))
}

fn path_args<'v>(op: &str, args: &'v [Value]) -> Result<(&'v str, &'v str), EvalError> {
    match two(op, args)? {
        (Value::Str(a), Value::Str(b)) => Ok((a, b)),
        _ => Err(EvalError::schema(format!("spec_lang ops.fs.path.{op} expects string args"))),
    }
}

fn string_list(op: &str, v: &Value) -> Result<Vec<String>, EvalError> {
    list(op, v)?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects list of strings")))
        })
        .collect()
}

fn strings(items: Vec<String>) -> Value {
    Value::List(items.into_iter().map(Value::Str).collect())
}

fn path_normalize(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(normalize(path_arg("normalize", one("normalize", args)?)?)))
}

fn path_join(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (base, part) = path_args("join", args)?;
    let combined = if base.is_empty() {
        part.to_string()
    } else {
        format!("{}/{part}", base.trim_end_matches('/'))
    };
    Ok(Value::Str(normalize(&combined)))
}

fn path_split(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(strings(segments(path_arg("split", one("split", args)?)?)))
}

fn path_dirname(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(dirname(path_arg("dirname", one("dirname", args)?)?)))
}

fn path_basename(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(basename(path_arg("basename", one("basename", args)?)?)))
}

fn path_extname(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(extname(path_arg("extname", one("extname", args)?)?)))
}

fn path_stem(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(stem(path_arg("stem", one("stem", args)?)?)))
}

fn path_is_abs(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let path = path_arg("is_abs", one("is_abs", args)?)?;
    Ok(Value::Bool(normalize(path).starts_with('/')))
}

fn path_has_ext(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (path, ext) = path_args("has_ext", args)?;
    Ok(Value::Bool(extname(path) == normalize_ext(ext)))
}

fn path_change_ext(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (path, ext) = path_args("change_ext", args)?;
    let normalized = normalize(path);
    let base = basename(&normalized);
    if base.is_empty() || base == "." {
        return Ok(Value::Str(normalized));
    }
    let next = format!("{}{}", stem(&normalized), normalize_ext(ext));
    let out = match dirname(&normalized).as_str() {
        "/" => format!("/{next}"),
        "." => next,
        parent => format!("{parent}/{next}"),
    };
    Ok(Value::Str(out))
}

fn path_relativize(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (base, path) = path_args("relativize", args)?;
    Ok(Value::Str(relativize(base, path)))
}

fn path_common_prefix(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.path.common_prefix";
    let paths = string_list(op, one(op, args)?)?;
    Ok(Value::Str(common_prefix(&paths)))
}

fn path_parents(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(strings(parents(path_arg("parents", one("parents", args)?)?)))
}

fn path_within(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (base, path) = path_args("within", args)?;
    Ok(Value::Bool(within(base, path)))
}

fn path_compare(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (left, right) = path_args("compare", args)?;
    let ord = match normalize(left).cmp(&normalize(right)) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    Ok(Value::Int(ord))
}

fn path_sort(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.fs.path.sort";
    let mut paths: Vec<String> = string_list(op, one(op, args)?)?
        .iter()
        .map(|p| normalize(p))
        .collect();
    paths.sort();
    Ok(strings(paths))
}

// ---------------------------------------------------------------------------
// Glob
// ---------------------------------------------------------------------------

/// Translate an fnmatch pattern to an anchored regex. `*` and `?` cross
/// `/`; an unterminated `[` is a literal.
pub(crate) fn glob_regex(pattern: &str) -> Result<Regex, EvalError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                    continue;
                }
                let mut body: String = chars[i..j].iter().collect();
                i = j + 1;
                let negated = body.starts_with('!');
                if negated {
                    body.remove(0);
                }
                let mut escaped = body
                    .replace('\\', "\\\\")
                    .replace('[', "\\[")
                    .replace('&', "\\&")
                    .replace('~', "\\~");
                if !negated && escaped.starts_with('^') {
                    escaped.insert(0, '\\');
                }
                out.push('[');
                if negated {
                    out.push('^');
                }
                out.push_str(&escaped);
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push_str(")\\z");
    Regex::new(&out).map_err(|e| EvalError::schema(format!("spec_lang glob pattern invalid: {e}")))
}

pub(crate) fn fnmatch(name: &str, pattern: &str) -> Result<bool, EvalError> {
    Ok(glob_regex(pattern)?.is_match(name))
}

fn glob_inputs(op: &str, args: &[Value]) -> Result<(Vec<String>, Regex), EvalError> {
    let (paths, pattern) = two(op, args)?;
    let pattern = pattern
        .as_str()
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects string pattern")))?;
    Ok((string_list(op, paths)?, glob_regex(pattern)?))
}

fn glob_match(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match two("ops.fs.glob.match", args)? {
        (Value::Str(name), Value::Str(pattern)) => Ok(Value::Bool(fnmatch(name, pattern)?)),
        _ => Err(EvalError::schema("spec_lang ops.fs.glob.match expects string args")),
    }
}

fn glob_filter(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (paths, re) = glob_inputs("ops.fs.glob.filter", args)?;
    Ok(strings(paths.into_iter().filter(|p| re.is_match(p)).collect()))
}

fn glob_any(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (paths, re) = glob_inputs("ops.fs.glob.any", args)?;
    Ok(Value::Bool(paths.iter().any(|p| re.is_match(p))))
}

fn glob_all(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (paths, re) = glob_inputs("ops.fs.glob.all", args)?;
    Ok(Value::Bool(paths.iter().all(|p| re.is_match(p))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_segments() {
        assert_eq!(normalize("a/./b/../c//d/"), "a/c/d");
        assert_eq!(normalize("/../x"), "/x");
        assert_eq!(normalize("../../x"), "../../x");
        assert_eq!(normalize("  "), ".");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn names_and_extensions() {
        assert_eq!(basename("/a/b.tar.gz"), "b.tar.gz");
        assert_eq!(extname("/a/b.tar.gz"), ".gz");
        assert_eq!(stem("/a/b.tar.gz"), "b.tar");
        assert_eq!(extname(".bashrc"), "");
        assert_eq!(dirname("a"), ".");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(relativize("/a/b", "/a/c/d"), "../c/d");
        assert_eq!(relativize("a", "a"), ".");
        assert_eq!(relativize("/a", "b"), "b");
        assert!(within("docs", "docs/spec/x.md"));
        assert!(!within("docs", "doc"));
        assert!(!within("/docs", "docs/x"));
    }

    #[test]
    fn prefixes_and_parents() {
        let paths = vec!["/a/b/c".to_string(), "/a/b/d".to_string(), "/a/x".to_string()];
        assert_eq!(common_prefix(&paths), "/a");
        assert_eq!(common_prefix(&[]), ".");
        assert_eq!(parents("a/b/c"), vec!["a/b", "a", "."]);
        assert_eq!(parents("/a/b"), vec!["/a", "/"]);
    }

    #[test]
    fn glob_semantics() {
        assert!(fnmatch("docs/spec/a.md", "*.md").unwrap());
        assert!(fnmatch("a1.txt", "a?.txt").unwrap());
        assert!(fnmatch("b.txt", "[abc].txt").unwrap());
        assert!(!fnmatch("b.txt", "[!abc].txt").unwrap());
        assert!(fnmatch("[x", "[x").unwrap());
        assert!(!fnmatch("a.md.bak", "*.md").unwrap());
        assert!(fnmatch("a+b.txt", "a+b.*").unwrap());
    }
}

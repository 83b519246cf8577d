//! Chain dependency engine.
//!
//! `harness.chain` lets a case depend on other cases. A step whose id is
//! named by some `imports` entry is compile-only: the referenced producer's
//! `harness.exports` are compiled into closures and bound into the
//! importing case's symbol table. Every other step runs the referenced
//! case through the runner and records the outcome.
//!
//! Resolution errors (bad refs, missing or duplicate ids, cycles,
//! unresolved required exports) are [`RunError::Chain`] and always abort,
//! whatever the step class.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value as Json};
use speclang_ast::ast::Expr;
use speclang_types::Class;

use crate::cache::{signature, CaseCache, ExportCache};
use crate::case::{is_reserved_name, CompiledCase};
use crate::error::RunError;
use crate::eval::Evaluator;
use crate::value::{Dict, Value};

/// Export kind accepted in `harness.exports[].from`.
pub const EXPORT_FROM_ASSERT_FUNCTION: &str = "assert.function";

fn chain_error(msg: impl Into<String>) -> RunError {
    RunError::Chain(msg.into())
}

/// `[A-Za-z0-9._:-]+`
fn is_case_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'))
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// `[path]['#' case_id]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRef {
    pub raw: String,
    pub path: Option<String>,
    pub case_id: Option<String>,
}

impl ChainRef {
    pub fn parse(raw: &str) -> Result<ChainRef, RunError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(chain_error("harness.chain.steps[*].ref must be a non-empty string"));
        }
        let (path, case_id) = match raw.split_once('#') {
            Some((path, frag)) => {
                let frag = frag.trim();
                if frag.is_empty() {
                    return Err(chain_error(
                        "harness.chain.steps[*].ref fragment case_id must be non-empty when '#' is present",
                    ));
                }
                if !is_case_id(frag) {
                    return Err(chain_error(
                        "harness.chain.steps[*].ref fragment case_id must match [A-Za-z0-9._:-]+",
                    ));
                }
                let path = path.trim();
                ((!path.is_empty()).then(|| path.to_string()), Some(frag.to_string()))
            }
            None => (Some(raw.to_string()), None),
        };
        if path.as_deref().is_some_and(|p| p.starts_with("external://")) {
            return Err(chain_error("harness.chain.steps[*].ref path must not be external://"));
        }
        Ok(ChainRef {
            raw: raw.to_string(),
            path,
            case_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub id: String,
    pub class: Class,
    pub reference: ChainRef,
    pub allow_continue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainImport {
    pub from: String,
    pub names: Vec<String>,
    pub aliases: IndexMap<String, String>,
}

impl ChainImport {
    pub fn local_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPlan {
    pub steps: Vec<ChainStep>,
    pub imports: Vec<ChainImport>,
    pub fail_fast: bool,
}

fn bool_field(raw: Option<&Json>, at: &str, default: bool) -> Result<bool, RunError> {
    match raw {
        None | Some(Json::Null) => Ok(default),
        Some(Json::Bool(b)) => Ok(*b),
        Some(_) => Err(chain_error(format!("{at} must be a bool when provided"))),
    }
}

fn trimmed(raw: Option<&Json>) -> &str {
    raw.and_then(Json::as_str).map(str::trim).unwrap_or_default()
}

impl ChainPlan {
    /// Parse `harness.chain`; `None` when the case declares no chain.
    pub fn from_harness(harness: &serde_json::Map<String, Json>) -> Result<Option<ChainPlan>, RunError> {
        let chain = match harness.get("chain") {
            None | Some(Json::Null) => return Ok(None),
            Some(Json::Object(chain)) => chain,
            Some(_) => return Err(chain_error("harness.chain must be a mapping")),
        };
        let fail_fast = bool_field(chain.get("fail_fast"), "harness.chain.fail_fast", true)?;
        let raw_steps = match chain.get("steps") {
            Some(Json::Array(steps)) if !steps.is_empty() => steps,
            _ => return Err(chain_error("harness.chain.steps must be a non-empty list")),
        };
        let mut steps: Vec<ChainStep> = Vec::with_capacity(raw_steps.len());
        for (idx, raw) in raw_steps.iter().enumerate() {
            let at = format!("harness.chain.steps[{idx}]");
            let Json::Object(step) = raw else {
                return Err(chain_error(format!("{at} must be a mapping")));
            };
            let id = trimmed(step.get("id"));
            if id.is_empty() {
                return Err(chain_error(format!("{at}.id must be a non-empty string")));
            }
            if steps.iter().any(|s| s.id == id) {
                return Err(chain_error(format!("harness.chain.steps has duplicate id: {id}")));
            }
            let class = Class::parse(trimmed(step.get("class"))).ok_or_else(|| {
                chain_error(format!("{at}.class must be one of: MUST, MAY, MUST_NOT"))
            })?;
            let reference = match step.get("ref") {
                Some(Json::String(r)) => ChainRef::parse(r)?,
                Some(Json::Object(_)) => {
                    return Err(chain_error(format!(
                        "{at}.ref mapping format is not supported; use string [path][#case_id]"
                    )))
                }
                _ => return Err(chain_error(format!("{at}.ref must be a string"))),
            };
            let allow_continue = bool_field(step.get("allow_continue"), &format!("{at}.allow_continue"), false)?;
            steps.push(ChainStep {
                id: id.to_string(),
                class,
                reference,
                allow_continue,
            });
        }

        let raw_imports = match chain.get("imports") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items.clone(),
            Some(_) => return Err(chain_error("harness.chain.imports must be a list when provided")),
        };
        let mut imports = Vec::with_capacity(raw_imports.len());
        let mut locals: Vec<String> = Vec::new();
        for (idx, raw) in raw_imports.iter().enumerate() {
            let at = format!("harness.chain.imports[{idx}]");
            let Json::Object(item) = raw else {
                return Err(chain_error(format!("{at} must be a mapping")));
            };
            let from = trimmed(item.get("from"));
            if from.is_empty() {
                return Err(chain_error(format!("{at}.from must be non-empty")));
            }
            let Some(target) = steps.iter().find(|s| s.id == from) else {
                return Err(chain_error(format!("{at}.from must reference existing step id")));
            };
            if target.class == Class::MustNot {
                return Err(chain_error(format!(
                    "{at}.from must not reference a MUST_NOT step: {from}"
                )));
            }
            let names = match item.get("names") {
                Some(Json::Array(names)) if !names.is_empty() => names,
                _ => return Err(chain_error(format!("{at}.names must be a non-empty list"))),
            };
            let mut listed = Vec::with_capacity(names.len());
            for (j, name) in names.iter().enumerate() {
                let name = name.as_str().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err(chain_error(format!("{at}.names[{j}] must be non-empty")));
                }
                listed.push(name.to_string());
            }
            let mut aliases = IndexMap::new();
            match item.get("as") {
                None | Some(Json::Null) => {}
                Some(Json::Object(map)) => {
                    for (k, v) in map {
                        let (k, v) = (k.trim(), v.as_str().map(str::trim).unwrap_or_default());
                        if k.is_empty() || v.is_empty() {
                            return Err(chain_error(format!(
                                "{at}.as keys and values must be non-empty strings"
                            )));
                        }
                        if !listed.iter().any(|n| n == k) {
                            return Err(chain_error(format!(
                                "{at}.as references name not in names: {k}"
                            )));
                        }
                        aliases.insert(k.to_string(), v.to_string());
                    }
                }
                Some(_) => return Err(chain_error(format!("{at}.as must be a mapping when provided"))),
            }
            let import = ChainImport {
                from: from.to_string(),
                names: listed,
                aliases,
            };
            for name in &import.names {
                let local = import.local_name(name);
                if is_reserved_name(local) {
                    return Err(chain_error(format!(
                        "{at} local binding collides with reserved name: {local}"
                    )));
                }
                if locals.iter().any(|l| l == local) {
                    return Err(chain_error(format!(
                        "{at} local binding collision for name: {local}"
                    )));
                }
                locals.push(local.to_string());
            }
            imports.push(import);
        }
        Ok(Some(ChainPlan {
            steps,
            imports,
            fail_fast,
        }))
    }

    /// True when some import reads from `step_id`.
    pub fn is_compile_only(&self, step_id: &str) -> bool {
        self.imports.iter().any(|i| i.from == step_id)
    }
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

/// Root that `/`-rooted references resolve against and no reference may
/// escape: the configured root, else the nearest ancestor of the document
/// holding `.git`, else the document's directory.
pub fn contract_root_for(doc_path: &Path, configured: Option<&Path>) -> PathBuf {
    if let Some(root) = configured {
        return std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    }
    let parent = doc_path.parent().unwrap_or(Path::new("/"));
    parent
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .unwrap_or(parent)
        .to_path_buf()
}

/// Resolve a document reference against `doc_path` and `root`. `field`
/// names the referencing field in errors.
pub fn resolve_ref_path(reference: &str, doc_path: &Path, root: &Path, field: &str) -> Result<PathBuf, String> {
    let candidate = match reference.strip_prefix('/') {
        Some(rooted) => root.join(rooted),
        None => doc_path.parent().unwrap_or(Path::new("/")).join(reference),
    };
    let resolved = std::fs::canonicalize(&candidate)
        .ok()
        .filter(|p| p.is_file())
        .ok_or_else(|| format!("{field} does not exist as file: {reference}"))?;
    if !resolved.starts_with(root) {
        return Err(format!("{field} escapes contract root"));
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Producer exports
// ---------------------------------------------------------------------------

/// Right fold of `checks` with `std.logic.and`.
fn fold_and(checks: &[Arc<Expr>]) -> Option<Expr> {
    let (last, init) = checks.split_last()?;
    let mut body = (**last).clone();
    for check in init.iter().rev() {
        body = Expr::Op {
            head: "std.logic.and".to_string(),
            args: vec![Arc::clone(check), Arc::new(body)],
        };
    }
    Some(body)
}

/// Compile a producer's `harness.exports` into `(name, fn expr)` pairs.
pub fn compile_exports(producer: &CompiledCase) -> Result<Vec<(String, Arc<Expr>)>, RunError> {
    let entries = match producer.harness.get("exports") {
        None | Some(Json::Null) => return Ok(Vec::new()),
        Some(Json::Array(entries)) => entries,
        Some(_) => return Err(chain_error("harness.exports must be a list")),
    };
    let mut out: Vec<(String, Arc<Expr>)> = Vec::with_capacity(entries.len());
    for (idx, raw) in entries.iter().enumerate() {
        let at = format!("harness.exports[{idx}]");
        let Json::Object(entry) = raw else {
            return Err(chain_error(format!("{at} must be a mapping")));
        };
        let name = trimmed(entry.get("as"));
        if name.is_empty() {
            return Err(chain_error(format!("{at}.as must be a non-empty string")));
        }
        if out.iter().any(|(n, _)| n == name) {
            return Err(chain_error(format!("harness.exports duplicate export: {name}")));
        }
        if trimmed(entry.get("from")) != EXPORT_FROM_ASSERT_FUNCTION {
            return Err(chain_error(format!("{at}.from must be {EXPORT_FROM_ASSERT_FUNCTION}")));
        }
        let params = match entry.get("params") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items
                .iter()
                .map(|p| match p.as_str().map(str::trim) {
                    Some(p) if !p.is_empty() => Ok(p.to_string()),
                    _ => Err(chain_error(format!("{at}.params must be a list of non-empty strings"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(chain_error(format!("{at}.params must be a list of non-empty strings"))),
        };
        let required = bool_field(entry.get("required"), &format!("{at}.required"), true)?;
        let path = trimmed(entry.get("path"));
        let body = producer
            .step(path)
            .filter(|step| step.class == Class::Must)
            .and_then(|step| fold_and(&step.checks));
        match body {
            Some(body) => out.push((name.to_string(), Arc::new(Expr::func(params, body)))),
            None if required => {
                return Err(chain_error(format!(
                    "producer {} export {name} could not resolve MUST step {path:?}",
                    producer.id
                )))
            }
            None => log::debug!("skipping optional export {name} of {}", producer.id),
        }
    }
    Ok(out)
}

fn export_signature(producer: &CompiledCase) -> String {
    signature(&json!({
        "exports": producer.harness.get("exports"),
        "contract": producer.raw.get("contract"),
    }))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRow {
    pub step_id: String,
    pub class: Class,
    pub ref_case_id: String,
    pub ref_doc_path: String,
    pub status: &'static str,
}

impl TraceRow {
    fn to_value(&self) -> Value {
        let mut row = Dict::new();
        row.insert("step_id".into(), Value::str(&self.step_id));
        row.insert("class".into(), Value::str(self.class.as_str()));
        row.insert("ref_case_id".into(), Value::str(&self.ref_case_id));
        row.insert("ref_doc_path".into(), Value::str(&self.ref_doc_path));
        row.insert("status".into(), Value::str(self.status));
        Value::Dict(row)
    }
}

/// Result of running one case's chain.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Local name to imported value, bound into the case's evaluations.
    pub imports: IndexMap<String, Value>,
    pub trace: Vec<TraceRow>,
    /// Exports produced per step id.
    pub state: IndexMap<String, Dict>,
}

impl ChainOutcome {
    /// `{state, trace, imports}` as exposed through the `chain_json` target.
    pub fn payload(&self) -> Value {
        let state: Dict = self
            .state
            .iter()
            .map(|(k, v)| (k.clone(), Value::Dict(v.clone())))
            .collect();
        let mut out = Dict::new();
        out.insert("state".into(), Value::Dict(state));
        out.insert("trace".into(), Value::List(self.trace.iter().map(TraceRow::to_value).collect()));
        out.insert("imports".into(), Value::Dict(self.imports.clone()));
        Value::Dict(out)
    }
}

/// Everything the engine needs from the surrounding runner.
pub struct ChainContext<'a> {
    pub cases: &'a CaseCache,
    pub exports: &'a ExportCache,
    pub root: &'a Path,
    /// Case keys currently executing, outermost first.
    pub active: &'a [String],
    /// Materializes imported closures for the importing case.
    pub evaluator: &'a Evaluator,
}

impl ChainContext<'_> {
    fn resolve(&self, step: &ChainStep, current: &CompiledCase) -> Result<Vec<Arc<CompiledCase>>, RunError> {
        let reference = &step.reference;
        let (doc_path, shown) = match &reference.path {
            Some(path) => (
                resolve_ref_path(path, &current.doc_path, self.root, "chain ref path").map_err(chain_error)?,
                Some(path.as_str()),
            ),
            None => (current.doc_path.clone(), None),
        };
        let doc = self.cases.load(&doc_path)?;
        let Some(case_id) = &reference.case_id else {
            return Ok(doc.cases.clone());
        };
        let found = doc.find(case_id);
        let place = shown.map(|p| format!(" in {p}")).unwrap_or_else(|| " locally".to_string());
        match found.len() {
            0 => Err(chain_error(format!(
                "chain step {} could not resolve case_id {case_id}{place}",
                step.id
            ))),
            1 => Ok(found),
            _ => Err(chain_error(format!(
                "chain step {} resolved duplicate case_id {case_id}{place}",
                step.id
            ))),
        }
    }

    fn check_cycle(&self, step: &ChainStep, current: &CompiledCase, target: &CompiledCase) -> Result<(), RunError> {
        let key = target.key();
        if key == current.key() {
            return Err(chain_error(format!(
                "chain step {} references current case recursively",
                step.id
            )));
        }
        if let Some(pos) = self.active.iter().position(|k| *k == key) {
            let mut path: Vec<&str> = self.active[pos..].iter().map(|k| display_id(k)).collect();
            path.push(display_id(&key));
            return Err(chain_error(format!(
                "chain step {} detected cycle: {}",
                step.id,
                path.join(" -> ")
            )));
        }
        Ok(())
    }

    fn doc_label(&self, path: &Path) -> String {
        match path.strip_prefix(self.root) {
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Case id part of a `doc::id` key.
fn display_id(key: &str) -> &str {
    key.rsplit_once("::").map(|(_, id)| id).unwrap_or(key)
}

/// Run `case`'s chain, if it has one. `run_case` executes a referenced case
/// through the runner's top-level entry.
pub fn resolve_and_run(
    case: &CompiledCase,
    ctx: &ChainContext<'_>,
    run_case: &mut dyn FnMut(&Arc<CompiledCase>) -> Result<(), RunError>,
) -> Result<ChainOutcome, RunError> {
    let Some(plan) = ChainPlan::from_harness(&case.harness)? else {
        return Ok(ChainOutcome::default());
    };
    let mut outcome = ChainOutcome::default();
    for step in &plan.steps {
        let refs = ctx.resolve(step, case)?;
        let mut produced = Dict::new();
        for target in &refs {
            ctx.check_cycle(step, case, target)?;
            let passed = if plan.is_compile_only(&step.id) {
                let exports = ctx.exports.get_or_compile(&target.key(), &export_signature(target), || {
                    compile_exports(target)
                })?;
                for (name, value) in ctx.evaluator.bind_symbols(&exports)? {
                    produced.entry(name).or_insert(value);
                }
                true
            } else {
                run_step(step, target, &plan, run_case)?
            };
            log::debug!(
                "chain step {} -> {}: {}",
                step.id,
                target.id,
                if passed { "pass" } else { "fail" }
            );
            outcome.trace.push(TraceRow {
                step_id: step.id.clone(),
                class: step.class,
                ref_case_id: target.id.clone(),
                ref_doc_path: ctx.doc_label(&target.doc_path),
                status: if passed { "pass" } else { "fail" },
            });
        }
        outcome.state.insert(step.id.clone(), produced);
    }
    for import in &plan.imports {
        let state = outcome.state.get(&import.from);
        for name in &import.names {
            let value = state.and_then(|s| s.get(name)).ok_or_else(|| {
                chain_error(format!(
                    "harness.chain.imports from {} missing export {name}",
                    import.from
                ))
            })?;
            outcome
                .imports
                .insert(import.local_name(name).to_string(), value.clone());
        }
    }
    Ok(outcome)
}

/// Run one referenced case and decide the step outcome for it.
fn run_step(
    step: &ChainStep,
    target: &Arc<CompiledCase>,
    plan: &ChainPlan,
    run_case: &mut dyn FnMut(&Arc<CompiledCase>) -> Result<(), RunError>,
) -> Result<bool, RunError> {
    let aborts = plan.fail_fast && !step.allow_continue;
    match (step.class, run_case(target)) {
        (_, Err(e @ RunError::Chain(_))) => Err(e),
        (Class::Must, Ok(())) | (Class::May, Ok(())) => Ok(true),
        (Class::MustNot, Err(_)) => Ok(true),
        (Class::May, Err(e)) => {
            log::warn!("chain step {} ({}) failed: {e}", step.id, target.id);
            Ok(false)
        }
        (Class::Must, Err(e)) if aborts => Err(e),
        (Class::Must, Err(e)) => {
            log::warn!("chain step {} ({}) failed, continuing: {e}", step.id, target.id);
            Ok(false)
        }
        (Class::MustNot, Ok(())) => {
            let msg = format!("chain step {} with class MUST_NOT unexpectedly succeeded", step.id);
            if aborts {
                return Err(RunError::Assertion(msg));
            }
            log::warn!("{msg}, continuing");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(chain: Json) -> Result<Option<ChainPlan>, RunError> {
        let Json::Object(harness) = json!({ "chain": chain }) else {
            unreachable!()
        };
        ChainPlan::from_harness(&harness)
    }

    #[test]
    fn ref_grammar() {
        let r = ChainRef::parse("docs/a.md#case-1").unwrap();
        assert_eq!(r.path.as_deref(), Some("docs/a.md"));
        assert_eq!(r.case_id.as_deref(), Some("case-1"));
        let r = ChainRef::parse("#local").unwrap();
        assert_eq!(r.path, None);
        assert_eq!(ChainRef::parse("a.md").unwrap().case_id, None);
        assert!(ChainRef::parse("a.md#").is_err());
        assert!(ChainRef::parse("a.md#bad id").is_err());
        assert!(ChainRef::parse("external://x#a").is_err());
        assert!(ChainRef::parse("  ").is_err());
    }

    #[test]
    fn plan_validation() {
        let err = plan(json!({"steps": [{"id": "a", "class": "MUST", "ref": {"path": "x"}}]})).unwrap_err();
        assert!(err.to_string().contains("mapping format is not supported"));
        let err = plan(json!({"steps": [
            {"id": "a", "class": "MUST", "ref": "#x"},
            {"id": "a", "class": "MUST", "ref": "#y"}
        ]}))
        .unwrap_err();
        assert_eq!(err.to_string(), "harness.chain.steps has duplicate id: a");
        let err = plan(json!({"steps": [{"id": "a", "class": "MUST_NOT", "ref": "#x"}],
            "imports": [{"from": "a", "names": ["f"]}]}))
        .unwrap_err();
        assert!(err.to_string().contains("must not reference a MUST_NOT step"));
        let err = plan(json!({"steps": [{"id": "a", "class": "MUST", "ref": "#x"}],
            "imports": [{"from": "a", "names": ["f"], "as": {"f": "call"}}]}))
        .unwrap_err();
        assert!(err.to_string().contains("reserved name: call"));
        let err = plan(json!({"steps": [{"id": "a", "class": "MUST", "ref": "#x"}],
            "imports": [{"from": "a", "names": ["f", "g"], "as": {"g": "f"}}]}))
        .unwrap_err();
        assert!(err.to_string().contains("collision for name: f"));
        assert!(plan(json!({"steps": [], "fail_fast": true})).is_err());
        assert!(plan(json!({"steps": [{"id": "a", "class": "MUST", "ref": "#x"}], "fail_fast": "no"})).is_err());
    }

    #[test]
    fn compile_only_detection() {
        let p = plan(json!({"steps": [
            {"id": "lib", "class": "MUST", "ref": "#p"},
            {"id": "run", "class": "MAY", "ref": "#q", "allow_continue": true}
        ], "imports": [{"from": "lib", "names": ["f"], "as": {"f": "g"}}]}))
        .unwrap()
        .unwrap();
        assert!(p.is_compile_only("lib"));
        assert!(!p.is_compile_only("run"));
        assert_eq!(p.imports[0].local_name("f"), "g");
        assert!(p.steps[1].allow_continue);
    }

    #[test]
    fn checks_fold_right_with_and() {
        let a = Arc::new(Expr::var("a"));
        let b = Arc::new(Expr::var("b"));
        let c = Arc::new(Expr::var("c"));
        let folded = fold_and(&[a, b, c]).unwrap();
        assert_eq!(
            speclang_ast::sexpr::to_sexpr(&folded),
            json!(["std.logic.and", ["var", "a"], ["std.logic.and", ["var", "b"], ["var", "c"]]])
        );
        assert!(fold_and(&[]).is_none());
    }
}

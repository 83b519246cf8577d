//! Case compilation.
//!
//! A [`RawCase`] from a document becomes a [`CompiledCase`]: its contract
//! steps compiled to expressions, the assertion tree built from them, its
//! `harness.spec_lang` settings validated and its `harness.when` hooks
//! parsed. Compiled cases are immutable and shared through `Arc` by the
//! document cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value as Json};
use speclang_ast::ast::Expr;
use speclang_parse::{compile_at, RawCase};
use speclang_types::{catalog, Capability, CapabilitySet, Class, Limits, SPECIAL_FORMS};

use crate::assertion::AssertNode;
use crate::error::RunError;
use crate::eval::{Evaluator, ImportTable};
use crate::hooks::Hooks;
use crate::host::HostConfig;
use crate::value::Value;

/// Case type whose contract only feeds producer exports.
pub const CONTRACT_EXPORT_TYPE: &str = "contract.export";

/// Names no import or chain binding may shadow.
pub fn is_reserved_name(name: &str) -> bool {
    name == "subject" || SPECIAL_FORMS.contains(&name)
}

fn config_error(msg: impl Into<String>) -> RunError {
    RunError::Config(msg.into())
}

// ---------------------------------------------------------------------------
// harness.spec_lang
// ---------------------------------------------------------------------------

/// Per-case interpreter settings from `harness.spec_lang`.
#[derive(Debug, Clone, Default)]
pub struct SpecLangConfig {
    pub limits: Limits,
    pub capabilities: CapabilitySet,
    pub imports: ImportTable,
}

impl SpecLangConfig {
    pub fn from_harness(harness: &Map<String, Json>) -> Result<Self, RunError> {
        let cfg = match harness.get("spec_lang") {
            None | Some(Json::Null) => return Ok(SpecLangConfig::default()),
            Some(Json::Object(cfg)) => cfg,
            Some(_) => return Err(config_error("harness.spec_lang must be a mapping")),
        };
        if cfg.contains_key("includes") {
            return Err(config_error(
                "harness.spec_lang.includes is not supported; use harness.chain imports",
            ));
        }
        let defaults = Limits::default();
        let limits = Limits {
            max_steps: int_field(cfg, "max_steps", 1, defaults.max_steps)?,
            max_nodes: int_field(cfg, "max_nodes", 1, defaults.max_nodes)?,
            max_literal_bytes: int_field(cfg, "max_literal_bytes", 1, defaults.max_literal_bytes)?,
            timeout_ms: int_field(cfg, "timeout_ms", 0, defaults.timeout_ms)?,
        };
        Ok(SpecLangConfig {
            limits,
            capabilities: capabilities(cfg.get("capabilities"))?,
            imports: imports(cfg.get("imports"))?,
        })
    }

    /// Evaluator for this case with `symbols` bound in the root frame.
    pub fn evaluator(&self, host: Arc<HostConfig>, symbols: IndexMap<String, Value>) -> Evaluator {
        Evaluator::new()
            .with_limits(self.limits)
            .with_capabilities(self.capabilities.clone())
            .with_imports(self.imports.clone())
            .with_host(host)
            .with_symbols(symbols)
    }
}

fn int_field(cfg: &Map<String, Json>, name: &str, min: u64, default: u64) -> Result<u64, RunError> {
    match cfg.get(name) {
        None | Some(Json::Null) => Ok(default),
        Some(Json::Number(n)) => match n.as_i64() {
            Some(v) if v >= min as i64 => Ok(v as u64),
            Some(_) => Err(config_error(format!(
                "harness.spec_lang.{name} must be >= {min}"
            ))),
            None => Err(config_error(format!(
                "harness.spec_lang.{name} must be an integer"
            ))),
        },
        Some(_) => Err(config_error(format!(
            "harness.spec_lang.{name} must be an integer"
        ))),
    }
}

fn capabilities(raw: Option<&Json>) -> Result<CapabilitySet, RunError> {
    let items = match raw {
        None | Some(Json::Null) => return Ok(CapabilitySet::none()),
        Some(Json::Array(items)) => items,
        Some(_) => {
            return Err(config_error(
                "harness.spec_lang.capabilities must be a list",
            ))
        }
    };
    let mut set = CapabilitySet::none();
    for (idx, item) in items.iter().enumerate() {
        let token = item.as_str().map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(config_error(format!(
                "harness.spec_lang.capabilities[{idx}] must be a non-empty string"
            )));
        }
        match Capability::from_name(token) {
            Some(cap) => set.insert(cap),
            None => log::warn!("ignoring unknown capability token {token}"),
        }
    }
    Ok(set)
}

fn imports(raw: Option<&Json>) -> Result<ImportTable, RunError> {
    let items = match raw {
        None | Some(Json::Null) => return Ok(ImportTable::new()),
        Some(Json::Array(items)) => items,
        Some(_) => return Err(config_error("harness.spec_lang.imports must be a list")),
    };
    let mut table = ImportTable::new();
    for (idx, item) in items.iter().enumerate() {
        let at = format!("harness.spec_lang.imports[{idx}]");
        let Json::Object(entry) = item else {
            return Err(config_error(format!("{at} must be a mapping")));
        };
        let namespace = entry.get("from").and_then(Json::as_str).map(str::trim).unwrap_or_default();
        if namespace.is_empty() {
            return Err(config_error(format!("{at}.from must be a non-empty string")));
        }
        if !catalog::is_namespace(namespace) {
            return Err(config_error(format!("{at}.from unknown namespace: {namespace}")));
        }
        let names = match entry.get("names") {
            Some(Json::Array(names)) if !names.is_empty() => names,
            _ => return Err(config_error(format!("{at}.names must be a non-empty list"))),
        };
        let aliases = match entry.get("as") {
            None | Some(Json::Null) => Map::new(),
            Some(Json::Object(map)) => map.clone(),
            Some(_) => return Err(config_error(format!("{at}.as must be a mapping"))),
        };
        let mut listed = Vec::with_capacity(names.len());
        for (j, name) in names.iter().enumerate() {
            let name = name.as_str().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(config_error(format!("{at}.names[{j}] must be a non-empty string")));
            }
            listed.push(name);
        }
        for key in aliases.keys() {
            if !listed.contains(&key.as_str()) {
                return Err(config_error(format!("{at}.as references name not in names: {key}")));
            }
        }
        for name in listed {
            let spec = catalog::member(namespace, name)
                .ok_or_else(|| config_error(format!("{at} unknown symbol: {namespace}.{name}")))?;
            let local = match aliases.get(name) {
                Some(Json::String(alias)) if !alias.trim().is_empty() => alias.trim(),
                Some(_) => {
                    return Err(config_error(format!("{at}.as.{name} must be a non-empty string")))
                }
                None => name,
            };
            if is_reserved_name(local) {
                return Err(config_error(format!(
                    "{at} local name collides with reserved name: {local}"
                )));
            }
            if !table.insert(local, spec) {
                return Err(config_error(format!("{at} conflicting local name: {local}")));
            }
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// One compiled contract step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractStep {
    pub id: String,
    pub class: Class,
    pub target: Option<String>,
    pub checks: Vec<Arc<Expr>>,
}

struct StepSource {
    id: Option<String>,
    class: Option<Json>,
    on: Option<Json>,
    assert: Option<Json>,
}

/// Synthetic MUST steps for the case-level `expect` block.
fn lower_expect(expect: Option<&Json>) -> Vec<StepSource> {
    let Some(Json::Object(expect)) = expect else {
        return Vec::new();
    };
    let eq_subject = |target: &str, value: &Json| StepSource {
        id: None,
        class: Some(json!("MUST")),
        on: Some(json!(target)),
        assert: Some(json!({"std.logic.eq": [{"var": "subject"}, {"lit": value}]})),
    };
    let mut out = Vec::new();
    for key in ["violation_count", "status"] {
        if let Some(value) = expect.get(key) {
            out.push(eq_subject(key, value));
        }
    }
    if let Some(Json::Object(summary)) = expect.get("summary_json") {
        for (key, value) in summary {
            out.push(StepSource {
                id: None,
                class: Some(json!("MUST")),
                on: Some(json!("summary_json")),
                assert: Some(json!({"std.logic.eq": [
                    {"std.object.get_or": [{"var": "subject"}, {"lit": key}, {"lit": null}]},
                    {"lit": value}
                ]})),
            });
        }
    }
    out
}

fn class_field(raw: Option<&Json>, at: &str, default: Class) -> Result<Class, RunError> {
    match raw {
        None | Some(Json::Null) => Ok(default),
        Some(Json::String(s)) if s.trim().is_empty() => Ok(default),
        Some(Json::String(s)) => Class::parse(s.trim())
            .ok_or_else(|| config_error(format!("{at} must be one of: MUST, MAY, MUST_NOT"))),
        Some(_) => Err(config_error(format!("{at} must be one of: MUST, MAY, MUST_NOT"))),
    }
}

fn target_field(raw: Option<&Json>) -> Option<String> {
    raw.and_then(Json::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Compile `contract` (plus lowered `expect`) into ordered steps.
pub fn compile_contract(contract: Option<&Json>, expect: Option<&Json>) -> Result<Vec<ContractStep>, RunError> {
    let (defaults, raw_steps) = match contract {
        None | Some(Json::Null) => (Map::new(), Vec::new()),
        Some(Json::Object(map)) => {
            let defaults = match map.get("defaults") {
                Some(Json::Object(d)) => d.clone(),
                _ => Map::new(),
            };
            let steps = match map.get("steps") {
                None | Some(Json::Null) => Vec::new(),
                Some(Json::Array(steps)) => steps.clone(),
                Some(_) => return Err(config_error("contract.steps must be a list")),
            };
            (defaults, steps)
        }
        Some(_) => return Err(config_error("contract must be a mapping with defaults/steps")),
    };
    let default_class = class_field(defaults.get("class"), "contract.defaults.class", Class::Must)?;
    let default_on = target_field(defaults.get("on"));

    let mut sources = Vec::with_capacity(raw_steps.len());
    for (idx, raw) in raw_steps.into_iter().enumerate() {
        let Json::Object(mut step) = raw else {
            return Err(config_error(format!("contract.steps[{idx}] must be a mapping")));
        };
        sources.push(StepSource {
            id: step.get("id").and_then(Json::as_str).map(|s| s.trim().to_string()),
            class: step.remove("class"),
            on: step.remove("on"),
            assert: step.remove("assert"),
        });
    }
    sources.extend(lower_expect(expect));

    let mut seen: Vec<String> = Vec::new();
    let mut steps = Vec::with_capacity(sources.len());
    for (idx, source) in sources.into_iter().enumerate() {
        let at = format!("contract.steps[{idx}]");
        let id = source
            .id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("step_{:03}", idx + 1));
        if seen.contains(&id) {
            return Err(config_error(format!("contract has duplicate step id: {id}")));
        }
        let class = class_field(source.class.as_ref(), &format!("{at}.class"), default_class)?;
        let target = target_field(source.on.as_ref()).or_else(|| default_on.clone());
        let raw_checks = match source.assert {
            None => return Err(config_error(format!("{at}.assert is required"))),
            Some(Json::Object(map)) => vec![Json::Object(map)],
            Some(Json::Array(items)) if !items.is_empty() => items,
            Some(_) => {
                return Err(config_error(format!(
                    "{at}.assert must be a non-empty expression mapping or list"
                )))
            }
        };
        let mut checks = Vec::with_capacity(raw_checks.len());
        for (j, check) in raw_checks.iter().enumerate() {
            let path = format!("{at}.assert[{j}]");
            if !matches!(check, Json::Object(m) if !m.is_empty()) {
                return Err(config_error(format!("{path} must be a non-empty expression mapping")));
            }
            checks.push(Arc::new(compile_at(check, &path)?));
        }
        seen.push(id.clone());
        steps.push(ContractStep {
            id,
            class,
            target,
            checks,
        });
    }
    Ok(steps)
}

/// Root MUST group over one group per step.
pub fn assert_tree(steps: &[ContractStep]) -> AssertNode {
    let children = steps
        .iter()
        .enumerate()
        .map(|(idx, step)| AssertNode::Group {
            class: step.class,
            id: Some(step.id.clone()),
            target: step.target.clone(),
            assert_path: format!("contract.steps[{idx}]<{}>", step.id),
            children: step
                .checks
                .iter()
                .enumerate()
                .map(|(j, expr)| AssertNode::Leaf {
                    target: step.target.clone(),
                    assert_path: format!("contract.steps[{idx}].assert[{j}]"),
                    expr: Arc::clone(expr),
                })
                .collect(),
        })
        .collect();
    AssertNode::Group {
        class: Class::Must,
        id: None,
        target: None,
        assert_path: "contract".to_string(),
        children,
    }
}

// ---------------------------------------------------------------------------
// CompiledCase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CompiledCase {
    pub id: String,
    pub case_type: String,
    pub title: Option<String>,
    pub doc_path: PathBuf,
    /// Line the case starts on in its document.
    pub line: usize,
    pub harness: Map<String, Json>,
    pub raw: Map<String, Json>,
    pub spec_lang: SpecLangConfig,
    pub hooks: Hooks,
    pub steps: Vec<ContractStep>,
    pub tree: AssertNode,
}

impl CompiledCase {
    /// Identity used by the chain cycle guard and the export cache.
    pub fn key(&self) -> String {
        format!("{}::{}", self.doc_path.display(), self.id)
    }

    pub fn is_contract_export(&self) -> bool {
        self.case_type == CONTRACT_EXPORT_TYPE
    }

    pub fn step(&self, id: &str) -> Option<&ContractStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Compile one case from `doc_path`.
pub fn compile_case(raw: &RawCase, doc_path: &Path) -> Result<CompiledCase, RunError> {
    let id = raw.id().trim().to_string();
    let case_type = raw.case_type().trim().to_string();
    if id.is_empty() {
        return Err(config_error("spec case must include non-empty id"));
    }
    if case_type.is_empty() {
        return Err(config_error("spec case must include non-empty type"));
    }
    let harness = match raw.fields.get("harness") {
        None | Some(Json::Null) => Map::new(),
        Some(Json::Object(map)) => map.clone(),
        Some(_) => return Err(config_error("harness must be a mapping")),
    };
    let spec_lang = SpecLangConfig::from_harness(&harness)?;
    let hooks = Hooks::parse(&harness)?;
    let steps = compile_contract(raw.fields.get("contract"), raw.fields.get("expect"))?;
    let tree = if case_type == CONTRACT_EXPORT_TYPE {
        AssertNode::empty()
    } else {
        assert_tree(&steps)
    };
    let title = match raw.fields.get("title") {
        None | Some(Json::Null) => None,
        Some(Json::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    Ok(CompiledCase {
        id,
        case_type,
        title,
        doc_path: doc_path.to_path_buf(),
        line: raw.line,
        harness,
        raw: raw.fields.clone(),
        spec_lang,
        hooks,
        steps,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use speclang_parse::{parse_cases, DocumentFormat};

    fn case(yaml: &str) -> Result<CompiledCase, RunError> {
        let raw = parse_cases(yaml, DocumentFormat::Yaml, "t.spec.yaml").unwrap().remove(0);
        compile_case(&raw, Path::new("/tmp/t.spec.yaml"))
    }

    #[test]
    fn steps_get_default_ids_and_paths() {
        let c = case(
            "id: a\ntype: text.file\ncontract:\n  defaults: {class: MUST, on: text}\n  steps:\n  - assert: {contains: [{var: subject}, x]}\n  - id: second\n    class: MAY\n    assert:\n    - {contains: [{var: subject}, y]}\n    - {contains: [{var: subject}, z]}\n",
        )
        .unwrap();
        assert_eq!(c.steps[0].id, "step_001");
        assert_eq!(c.steps[1].class, Class::May);
        assert_eq!(c.steps[1].target.as_deref(), Some("text"));
        let AssertNode::Group { children, .. } = &c.tree else {
            panic!("root must be a group");
        };
        assert_eq!(children[1].assert_path(), "contract.steps[1]<second>");
        let AssertNode::Group { children: leaves, .. } = &children[1] else {
            panic!("step must be a group");
        };
        assert_eq!(leaves[1].assert_path(), "contract.steps[1].assert[1]");
    }

    #[test]
    fn duplicate_step_ids_rejected() {
        let err = case(
            "id: a\ntype: text.file\ncontract:\n  steps:\n  - {id: s, assert: {var: subject}}\n  - {id: s, assert: {var: subject}}\n",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "contract has duplicate step id: s");
    }

    #[test]
    fn expect_lowers_to_must_steps() {
        let c = case("id: a\ntype: text.file\nexpect:\n  status: pass\n  summary_json: {n: 2}\n").unwrap();
        assert_eq!(c.steps.len(), 2);
        assert_eq!(c.steps[0].target.as_deref(), Some("status"));
        assert_eq!(c.steps[1].id, "step_002");
        assert_eq!(c.steps[1].checks[0].head(), Some("std.logic.eq"));
    }

    #[test]
    fn contract_export_has_empty_tree() {
        let c = case(
            "id: p\ntype: contract.export\ncontract:\n  steps:\n  - {id: step_a, assert: {gt: [{var: x}, 0]}}\n",
        )
        .unwrap();
        assert_eq!(c.tree, AssertNode::empty());
        assert!(c.step("step_a").is_some());
    }

    #[test]
    fn spec_lang_config_validation() {
        let err = case("id: a\ntype: t\nharness:\n  spec_lang: {max_steps: 0}\n").unwrap_err();
        assert_eq!(err.to_string(), "harness.spec_lang.max_steps must be >= 1");
        let c = case(
            "id: a\ntype: t\nharness:\n  spec_lang:\n    timeout_ms: 0\n    capabilities: [ops.os]\n    imports:\n    - {from: std.string, names: [contains], as: {contains: has}}\n",
        )
        .unwrap();
        assert_eq!(c.spec_lang.limits.timeout_ms, 0);
        assert!(c.spec_lang.capabilities.contains(Capability::Os));
        assert_eq!(c.spec_lang.imports.get("has").map(|s| s.symbol), Some("std.string.contains"));
    }

    #[test]
    fn imports_reject_reserved_and_unknown() {
        let err = case(
            "id: a\ntype: t\nharness:\n  spec_lang:\n    imports:\n    - {from: std.string, names: [contains], as: {contains: subject}}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("reserved name: subject"));
        let err = case(
            "id: a\ntype: t\nharness:\n  spec_lang:\n    imports:\n    - {from: std.nope, names: [x]}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown namespace: std.nope"));
    }
}

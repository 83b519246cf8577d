//! Case runner.
//!
//! The runner owns the shared caches and the harness registry. Running a
//! case resolves its chain, asks its harness for a subject resolver, then
//! evaluates the assertion tree with hooks attached. Chained cases re-enter
//! through the same path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::assertion::{self, ContractReport, Totals};
use crate::cache::{CaseCache, CompiledDocument, ExportCache};
use crate::case::{CompiledCase, CONTRACT_EXPORT_TYPE};
use crate::chain::{self, contract_root_for, resolve_ref_path, ChainContext, ChainOutcome};
use crate::error::{EvalError, RunError};
use crate::hooks::HookRunner;
use crate::host::HostConfig;
use crate::value::Value;

pub const RUNNER_IMPL_ENV: &str = "SPEC_RUNNER_IMPL";
pub const DEFAULT_RUNNER_IMPL: &str = "rust";

/// Target every harness exposes: the chain `{state, trace, imports}` payload.
pub const CHAIN_JSON_TARGET: &str = "chain_json";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Contract root; discovered per document when unset.
    pub root: Option<PathBuf>,
    /// Reported to hooks as `runtime.impl`.
    pub runtime_impl: String,
    pub host: Arc<HostConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            root: None,
            runtime_impl: DEFAULT_RUNNER_IMPL.to_string(),
            host: Arc::new(HostConfig::default()),
        }
    }
}

impl RunnerConfig {
    /// Capture host registries and `SPEC_RUNNER_IMPL` from the environment.
    pub fn from_env() -> Result<Self, RunError> {
        let host = HostConfig::from_env().map_err(|e| RunError::Config(e.to_string()))?;
        let runtime_impl = std::env::var(RUNNER_IMPL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RUNNER_IMPL.to_string());
        Ok(RunnerConfig {
            root: None,
            runtime_impl,
            host: Arc::new(host),
        })
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_host(mut self, host: HostConfig) -> Self {
        self.host = Arc::new(host);
        self
    }

    pub fn with_runtime_impl(mut self, runtime_impl: impl Into<String>) -> Self {
        self.runtime_impl = runtime_impl.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Harnesses
// ---------------------------------------------------------------------------

/// Maps an assertion target to the value leaves are evaluated against.
pub trait SubjectResolver {
    fn subject(&self, target: Option<&str>) -> Result<Value, EvalError>;
}

pub struct HarnessContext<'a> {
    pub root: &'a Path,
    pub chain: &'a ChainOutcome,
}

/// Executes a case of one type and exposes its results as targets.
pub trait Harness: Send + Sync {
    fn case_type(&self) -> &str;

    fn prepare(
        &self,
        case: &CompiledCase,
        ctx: &HarnessContext<'_>,
    ) -> Result<Box<dyn SubjectResolver>, RunError>;
}

fn unknown_target(case_type: &str, target: &str) -> EvalError {
    EvalError::schema(format!("unknown assert target for {case_type}: {target}"))
}

/// `text.file`: the text of the case document, or of the file named by the
/// case's `path` field.
#[derive(Debug, Default)]
pub struct TextFileHarness;

struct TextFileSubject {
    text: String,
    path: String,
    chain: Value,
}

impl SubjectResolver for TextFileSubject {
    fn subject(&self, target: Option<&str>) -> Result<Value, EvalError> {
        match target.unwrap_or("text") {
            "text" => Ok(Value::str(&self.text)),
            "path" => Ok(Value::str(&self.path)),
            CHAIN_JSON_TARGET => Ok(self.chain.clone()),
            other => Err(unknown_target("text.file", other)),
        }
    }
}

impl Harness for TextFileHarness {
    fn case_type(&self) -> &str {
        "text.file"
    }

    fn prepare(
        &self,
        case: &CompiledCase,
        ctx: &HarnessContext<'_>,
    ) -> Result<Box<dyn SubjectResolver>, RunError> {
        let path = match case.raw.get("path") {
            None | Some(serde_json::Value::Null) => case.doc_path.clone(),
            Some(serde_json::Value::String(rel)) if !rel.trim().is_empty() => {
                resolve_ref_path(rel.trim(), &case.doc_path, ctx.root, "text.file path")
                    .map_err(RunError::Config)?
            }
            Some(_) => {
                return Err(RunError::Config(
                    "text.file path must be a non-empty string".into(),
                ))
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
        let shown = match path.strip_prefix(ctx.root) {
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => path.display().to_string(),
        };
        Ok(Box::new(TextFileSubject {
            text,
            path: shown,
            chain: ctx.chain.payload(),
        }))
    }
}

/// `contract.export`: producer-only cases. Nothing runs; only the chain
/// payload is visible.
#[derive(Debug, Default)]
pub struct ContractExportHarness;

struct ChainOnlySubject {
    chain: Value,
}

impl SubjectResolver for ChainOnlySubject {
    fn subject(&self, target: Option<&str>) -> Result<Value, EvalError> {
        match target {
            Some(CHAIN_JSON_TARGET) => Ok(self.chain.clone()),
            Some(other) => Err(unknown_target(CONTRACT_EXPORT_TYPE, other)),
            None => Ok(Value::Null),
        }
    }
}

impl Harness for ContractExportHarness {
    fn case_type(&self) -> &str {
        CONTRACT_EXPORT_TYPE
    }

    fn prepare(
        &self,
        _case: &CompiledCase,
        ctx: &HarnessContext<'_>,
    ) -> Result<Box<dyn SubjectResolver>, RunError> {
        Ok(Box::new(ChainOnlySubject {
            chain: ctx.chain.payload(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
}

/// Outcome of one top-level case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub id: String,
    pub doc_path: String,
    pub status: Status,
    /// `schema`, `assertion` or `runtime` for failures.
    pub category: Option<&'static str>,
    pub message: Option<String>,
    pub totals: Option<Totals>,
}

impl CaseReport {
    fn new(case: &CompiledCase, result: Result<ContractReport, RunError>) -> Self {
        let (status, category, message, totals) = match result {
            Ok(report) => (Status::Pass, None, None, Some(report.totals)),
            Err(e) => (Status::Fail, Some(e.category()), Some(e.to_string()), None),
        };
        CaseReport {
            id: case.id.clone(),
            doc_path: case.doc_path.display().to_string(),
            status,
            category,
            message,
            totals,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }
}

/// Per-case reports of one run, plus documents that failed to load.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub cases: Vec<CaseReport>,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.cases.iter().all(CaseReport::passed)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct Runner {
    config: RunnerConfig,
    cases: CaseCache,
    exports: ExportCache,
    harnesses: Vec<Box<dyn Harness>>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_caches(config, CaseCache::new(), ExportCache::new())
    }

    /// Runner sharing caches with other runners.
    pub fn with_caches(config: RunnerConfig, cases: CaseCache, exports: ExportCache) -> Self {
        Runner {
            config,
            cases,
            exports,
            harnesses: vec![Box::new(TextFileHarness), Box::new(ContractExportHarness)],
        }
    }

    /// Register a harness; it replaces any harness for the same case type.
    pub fn register(&mut self, harness: Box<dyn Harness>) {
        self.harnesses.retain(|h| h.case_type() != harness.case_type());
        self.harnesses.push(harness);
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn case_cache(&self) -> &CaseCache {
        &self.cases
    }

    pub fn export_cache(&self) -> &ExportCache {
        &self.exports
    }

    pub fn load(&self, path: &Path) -> Result<Arc<CompiledDocument>, RunError> {
        self.cases.load(path)
    }

    /// Run every case in `path`, or only the case with `case_id`.
    pub fn run_document(&self, path: &Path, case_id: Option<&str>) -> Result<Vec<CaseReport>, RunError> {
        let doc = self.load(path)?;
        let reports = doc
            .cases
            .iter()
            .filter(|c| case_id.map_or(true, |id| c.id == id))
            .map(|case| CaseReport::new(case, self.run_case(case)))
            .collect();
        Ok(reports)
    }

    /// Run several documents. Load failures are collected, not fatal.
    pub fn run_paths(&self, paths: &[PathBuf], case_id: Option<&str>) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            match self.run_document(path, case_id) {
                Ok(reports) => summary.cases.extend(reports),
                Err(e) => {
                    log::warn!("{}: {e}", path.display());
                    summary.errors.push(e.to_string());
                }
            }
        }
        summary
    }

    pub fn run_case(&self, case: &Arc<CompiledCase>) -> Result<ContractReport, RunError> {
        log::info!("running case {} ({})", case.id, case.doc_path.display());
        let mut active = Vec::new();
        self.run_nested(case, &mut active)
    }

    fn run_nested(&self, case: &Arc<CompiledCase>, active: &mut Vec<String>) -> Result<ContractReport, RunError> {
        let harness = self
            .harnesses
            .iter()
            .find(|h| h.case_type() == case.case_type)
            .ok_or_else(|| RunError::Config(format!("unsupported case type: {}", case.case_type)))?;
        let root = contract_root_for(&case.doc_path, self.config.root.as_deref());
        let host = Arc::clone(&self.config.host);

        active.push(case.key());
        let outcome = {
            let snapshot = active.clone();
            let base = case.spec_lang.evaluator(Arc::clone(&host), IndexMap::new());
            let ctx = ChainContext {
                cases: &self.cases,
                exports: &self.exports,
                root: &root,
                active: &snapshot,
                evaluator: &base,
            };
            chain::resolve_and_run(case, &ctx, &mut |dep| {
                log::debug!("running chained case {}", dep.id);
                self.run_nested(dep, active).map(|_| ())
            })
        };
        active.pop();
        let outcome = outcome?;

        let evaluator = case.spec_lang.evaluator(host, outcome.imports.clone());
        let resolver = harness.prepare(
            case,
            &HarnessContext {
                root: &root,
                chain: &outcome,
            },
        )?;
        let mut hooks = HookRunner::new(&case.hooks, &evaluator, case, &self.config.runtime_impl);
        assertion::evaluate(
            &case.tree,
            &case.id,
            |expr, target| {
                let subject = resolver.subject(target)?;
                evaluator.eval_predicate(expr, &subject)
            },
            &mut hooks,
        )
    }
}

//! Host effects for the `ops.os`, `ops.helper` and `ops.job` builtins.
//!
//! Everything here runs only after the interpreter has checked the
//! case's capability set. The helper and job registries are read once from
//! the process environment into a [`HostConfig`] and shared read-only by
//! every evaluation.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value as Json;
use thiserror::Error;

use crate::builtins::{dict, int, one, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{Dict, Value};

pub const HELPERS_ENV: &str = "SPEC_RUNNER_SPEC_LANG_HELPERS_JSON";
pub const JOBS_ENV: &str = "SPEC_RUNNER_SPEC_LANG_JOBS_JSON";
pub const JOB_INPUT_OVERRIDES_ENV: &str = "SPEC_RUNNER_JOB_INPUT_OVERRIDES_JSON";

/// Exit code reported for a child killed on timeout.
pub const TIMEOUT_EXIT_CODE: i64 = -9;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// How long to wait for pipe output after a timed-out child is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(50);

/// Errors from host configuration and process execution.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{name} must contain valid JSON mapping")]
    InvalidJson { name: &'static str },
    #[error("{name} must contain JSON mapping")]
    NotMapping { name: &'static str },
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<HostError> for EvalError {
    fn from(err: HostError) -> Self {
        EvalError::runtime(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

/// Helper and job registries plus process-wide job input overrides.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub helpers: IndexMap<String, Json>,
    pub jobs: IndexMap<String, Json>,
    pub job_input_overrides: IndexMap<String, Json>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the registries from the process environment.
    pub fn from_env() -> Result<Self, HostError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`HostConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HostError> {
        let helpers = registry(HELPERS_ENV, lookup(HELPERS_ENV))?;
        let jobs = registry(JOBS_ENV, lookup(JOBS_ENV))?;
        // Overrides that are not a mapping are ignored; only bad JSON fails.
        let job_input_overrides = match lookup(JOB_INPUT_OVERRIDES_ENV) {
            Some(raw) if !raw.trim().is_empty() => {
                match serde_json::from_str::<Json>(raw.trim()) {
                    Ok(Json::Object(map)) => map.into_iter().collect(),
                    Ok(_) => IndexMap::new(),
                    Err(_) => {
                        return Err(HostError::InvalidJson {
                            name: JOB_INPUT_OVERRIDES_ENV,
                        })
                    }
                }
            }
            _ => IndexMap::new(),
        };
        Ok(Self {
            helpers,
            jobs,
            job_input_overrides,
        })
    }

    pub fn with_helper(mut self, id: &str, entry: Json) -> Self {
        self.helpers.insert(id.to_string(), entry);
        self
    }

    pub fn with_job(mut self, name: &str, entry: Json) -> Self {
        self.jobs.insert(name.to_string(), entry);
        self
    }

    pub fn with_job_input_overrides(mut self, overrides: IndexMap<String, Json>) -> Self {
        self.job_input_overrides = overrides;
        self
    }
}

fn registry(name: &'static str, raw: Option<String>) -> Result<IndexMap<String, Json>, HostError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(IndexMap::new());
    };
    let parsed: Json =
        serde_json::from_str(raw.trim()).map_err(|_| HostError::InvalidJson { name })?;
    let Json::Object(map) = parsed else {
        return Err(HostError::NotMapping { name });
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| {
            let key = k.trim().to_string();
            (!key.is_empty()).then_some((key, v))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Process runner
// ---------------------------------------------------------------------------

/// One subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub command: Vec<String>,
    /// Zero means no timeout.
    pub timeout_ms: u64,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    pub code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl ExecOutcome {
    fn into_value(self) -> Value {
        let mut out = Dict::new();
        out.insert("code".into(), Value::Int(self.code));
        out.insert("stdout".into(), Value::Str(self.stdout));
        out.insert("stderr".into(), Value::Str(self.stderr));
        out.insert(
            "duration_ms".into(),
            Value::Int(i64::try_from(self.duration_ms).unwrap_or(i64::MAX)),
        );
        out.insert("timed_out".into(), Value::Bool(self.timed_out));
        Value::Dict(out)
    }
}

/// Read a pipe to EOF on a detached thread.
///
/// EOF only arrives once every process holding the write end has exited,
/// which after a timeout may include grandchildren of the killed child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: &mpsc::Receiver<Vec<u8>>, timed_out: bool) -> Vec<u8> {
    if timed_out {
        rx.recv_timeout(DRAIN_GRACE).unwrap_or_default()
    } else {
        rx.recv().unwrap_or_default()
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i64 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => i64::from(code),
        (None, Some(sig)) => -i64::from(sig),
        (None, None) => -1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i64 {
    status.code().map_or(-1, i64::from)
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
    started: Instant,
) -> Result<Option<ExitStatus>, HostError> {
    let wait_err = |source| HostError::Wait {
        program: program.to_string(),
        source,
    };
    loop {
        if let Some(status) = child.try_wait().map_err(wait_err)? {
            return Ok(Some(status));
        }
        if timeout.is_some_and(|t| started.elapsed() >= t) {
            let _ = child.kill();
            child.wait().map_err(wait_err)?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Spawn, feed stdin, and collect output. On timeout the child is killed
/// and reported with [`TIMEOUT_EXIT_CODE`].
pub fn run_process(req: &ExecRequest) -> Result<ExecOutcome, HostError> {
    let program = req.command.first().cloned().unwrap_or_default();
    debug!("spawning {:?} (timeout_ms={})", req.command, req.timeout_ms);

    let mut cmd = Command::new(&program);
    cmd.args(req.command.iter().skip(1))
        .stdin(if req.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &req.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in &req.env {
        cmd.env(k, v);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| HostError::Spawn {
        program: program.clone(),
        source,
    })?;

    let feeder = match (child.stdin.take(), req.stdin.clone()) {
        (Some(mut pipe), Some(text)) => Some(thread::spawn(move || {
            let _ = pipe.write_all(text.as_bytes());
        })),
        _ => None,
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let timeout = (req.timeout_ms > 0).then(|| Duration::from_millis(req.timeout_ms));
    let status = wait_with_deadline(&mut child, &program, timeout, started)?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let timed_out = status.is_none();
    if let (Some(feeder), false) = (feeder, timed_out) {
        let _ = feeder.join();
    }
    let stdout = collect(&stdout, timed_out);
    let stderr = collect(&stderr, timed_out);

    Ok(ExecOutcome {
        code: status.map_or(TIMEOUT_EXIT_CODE, exit_code),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        duration_ms,
        timed_out,
    })
}

// ---------------------------------------------------------------------------
// ops.os
// ---------------------------------------------------------------------------

pub(crate) const HANDLERS: &[(&str, Handler)] = &[
    ("ops.os.exec", os_exec),
    ("ops.os.exec_capture", os_exec_capture),
    ("ops.os.exec_capture_ex", os_exec_capture_ex),
    ("ops.os.env_get", os_env_get),
    ("ops.os.env_has", os_env_has),
    ("ops.os.cwd", os_cwd),
    ("ops.os.pid", os_pid),
    ("ops.os.sleep_ms", os_sleep_ms),
    ("ops.os.exit_code", os_exit_code),
    ("ops.helper.call", helper_call),
    ("ops.job.dispatch", job_dispatch),
];

fn command_arg(op: &str, v: &Value) -> Result<Vec<String>, EvalError> {
    let items = v
        .as_list()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| EvalError::schema(format!("spec_lang {op} expects non-empty list command")))?;
    items
        .iter()
        .map(|item| {
            let token = item.to_text().trim().to_string();
            if token.is_empty() {
                Err(EvalError::schema(format!(
                    "spec_lang {op} command entries must be non-empty strings"
                )))
            } else {
                Ok(token)
            }
        })
        .collect()
}

fn timeout_arg(op: &str, v: &Value) -> Result<u64, EvalError> {
    u64::try_from(int(op, v)?)
        .map_err(|_| EvalError::schema(format!("spec_lang {op} expects non-negative timeout_ms")))
}

fn exec_simple(it: &mut Interp<'_>, op: &str, args: &[Value]) -> Result<ExecOutcome, EvalError> {
    let (command, timeout) = two(op, args)?;
    let req = ExecRequest {
        command: command_arg(op, command)?,
        timeout_ms: timeout_arg(op, timeout)?,
        ..ExecRequest::default()
    };
    let outcome = run_process(&req)?;
    it.last_exit_code = Some(outcome.code);
    Ok(outcome)
}

fn os_exec(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Int(exec_simple(it, "ops.os.exec", args)?.code))
}

fn os_exec_capture(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(exec_simple(it, "ops.os.exec_capture", args)?.into_value())
}

/// Options: `timeout_ms`, `cwd`, `stdin_text`, `env` (values stringified,
/// `null` becomes empty).
fn os_exec_capture_ex(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.os.exec_capture_ex";
    let (command, options) = two(op, args)?;
    let command = command_arg(op, command)?;
    let options = dict(op, options)?;

    let timeout_ms = match options.get("timeout_ms") {
        Some(v) => timeout_arg(op, v)?,
        None => 0,
    };
    let cwd = match options.get("cwd") {
        None | Some(Value::Null) => None,
        Some(Value::Str(s)) if s.trim().is_empty() => None,
        Some(Value::Str(s)) => Some(PathBuf::from(s)),
        Some(_) => {
            return Err(EvalError::schema(format!(
                "spec_lang {op} expects cwd string when provided"
            )))
        }
    };
    let stdin = match options.get("stdin_text") {
        None => Some(String::new()),
        Some(Value::Null) => None,
        Some(Value::Str(s)) => Some(s.clone()),
        Some(_) => {
            return Err(EvalError::schema(format!(
                "spec_lang {op} expects stdin_text string when provided"
            )))
        }
    };
    let env = match options.get("env") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Dict(map)) => map
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| {
                let v = if matches!(v, Value::Null) { String::new() } else { v.to_text() };
                (k.trim().to_string(), v)
            })
            .collect(),
        Some(_) => {
            return Err(EvalError::schema(format!(
                "spec_lang {op} expects env mapping when provided"
            )))
        }
    };

    let outcome = run_process(&ExecRequest {
        command,
        timeout_ms,
        cwd,
        stdin,
        env,
    })?;
    it.last_exit_code = Some(outcome.code);
    Ok(outcome.into_value())
}

fn env_key(op: &str, v: &Value) -> Result<String, EvalError> {
    let key = v.to_text().trim().to_string();
    if key.is_empty() {
        return Err(EvalError::schema(format!("spec_lang {op} expects non-empty env key")));
    }
    Ok(key)
}

fn os_env_get(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (key, fallback) = two("ops.os.env_get", args)?;
    let key = env_key("ops.os.env_get", key)?;
    Ok(std::env::var(&key).map_or_else(|_| fallback.clone(), Value::Str))
}

fn os_env_has(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let key = env_key("ops.os.env_has", one("ops.os.env_has", args)?)?;
    Ok(Value::Bool(std::env::var_os(&key).is_some()))
}

fn os_cwd(_: &mut Interp<'_>, _: &[Value]) -> Result<Value, EvalError> {
    let cwd = std::env::current_dir()
        .map_err(|e| EvalError::runtime(format!("spec_lang ops.os.cwd failed: {e}")))?;
    Ok(Value::Str(cwd.to_string_lossy().into_owned()))
}

fn os_pid(_: &mut Interp<'_>, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Int(i64::from(std::process::id())))
}

fn os_sleep_ms(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let op = "ops.os.sleep_ms";
    let delay = u64::try_from(int(op, one(op, args)?)?)
        .map_err(|_| EvalError::schema(format!("spec_lang {op} expects non-negative delay")))?;
    thread::sleep(Duration::from_millis(delay));
    Ok(Value::Bool(true))
}

fn os_exit_code(it: &mut Interp<'_>, _: &[Value]) -> Result<Value, EvalError> {
    Ok(it.last_exit_code.map_or(Value::Null, Value::Int))
}

// ---------------------------------------------------------------------------
// Helpers and jobs
// ---------------------------------------------------------------------------

fn helper_error(msg: impl std::fmt::Display) -> EvalError {
    EvalError::runtime(format!("ops.helper.call error: {msg}"))
}

/// Resolve `id` in the helper registry and produce its result.
pub fn run_helper(host: &HostConfig, id: &str, payload: &Value) -> Result<Value, EvalError> {
    let entry = host
        .helpers
        .get(id)
        .ok_or_else(|| helper_error(format!("unsupported helper id: {id}")))?;
    let Json::Object(entry) = entry else {
        return Ok(Value::from_json(entry));
    };
    if let Some(err) = entry.get("error") {
        return Err(helper_error(Value::from_json(err).to_text()));
    }
    if entry.contains_key("result") {
        return Ok(entry.get("result").map_or(Value::Null, Value::from_json));
    }

    let command: Vec<String> = match entry.get("command") {
        Some(Json::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|x| Value::from_json(x).to_text().trim().to_string())
            .collect(),
        _ => Vec::new(),
    };
    if command.is_empty() || command.iter().any(String::is_empty) {
        return Err(helper_error(
            "helper entry requires result or non-empty command list",
        ));
    }
    let env = match entry.get("env") {
        Some(Json::Object(map)) => map
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| (k.trim().to_string(), Value::from_json(v).to_text()))
            .collect(),
        _ => Vec::new(),
    };
    let stdin = serde_json::to_string(&payload.to_json()?)
        .map_err(|e| helper_error(format!("payload is not serializable: {e}")))?;

    let outcome = run_process(&ExecRequest {
        command,
        stdin: Some(stdin),
        env,
        ..ExecRequest::default()
    })?;
    if outcome.code != 0 {
        return Err(helper_error(format!(
            "helper command failed (exit={})",
            outcome.code
        )));
    }
    let out = outcome.stdout.trim();
    if out.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str::<Json>(out).map_or_else(|_| Value::str(out), |j| Value::from_json(&j)))
}

fn helper_call(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (id, payload) = two("ops.helper.call", args)?;
    let id = id
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EvalError::schema("ops.helper.call expects string helper_id"))?;
    run_helper(it.host, id, payload)
}

/// `ops.job.dispatch(name, overrides?)`. Inputs merge as job entry, then
/// process overrides, then call-site overrides; `_job_name`, `_mode` and
/// `_outputs` are added last.
fn job_dispatch(it: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    if it.dispatch_depth > 0 {
        return Err(EvalError::runtime(
            "runtime.dispatch.nested_forbidden: ops.job.dispatch",
        ));
    }
    let name = args
        .first()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EvalError::schema("ops.job.dispatch expects job_name to evaluate to string"))?;
    let host = it.host;
    let Some(Json::Object(entry)) = host.jobs.get(name) else {
        return Err(EvalError::runtime(format!("runtime.dispatch.job_not_found: {name}")));
    };
    let helper_id = entry
        .get("helper")
        .map(|h| Value::from_json(h).to_text().trim().to_string())
        .unwrap_or_default();
    if helper_id.is_empty() {
        return Err(EvalError::runtime(format!("runtime.dispatch.helper_required: {name}")));
    }

    let mut merged = match entry.get("inputs") {
        None => Dict::new(),
        Some(Json::Object(inputs)) => inputs
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect(),
        Some(_) => {
            return Err(EvalError::runtime(format!(
                "runtime.dispatch.inputs_must_be_mapping: {name}"
            )))
        }
    };
    for (k, v) in &host.job_input_overrides {
        merged.insert(k.clone(), Value::from_json(v));
    }
    match args.get(1) {
        None | Some(Value::Null) => {}
        Some(Value::Dict(overrides)) => {
            for (k, v) in overrides {
                merged.insert(k.clone(), v.clone());
            }
        }
        Some(_) => {
            return Err(EvalError::schema(
                "ops.job.dispatch overrides must evaluate to mapping or null",
            ))
        }
    }
    merged.insert("_job_name".into(), Value::str(name));
    merged.insert(
        "_mode".into(),
        entry
            .get("mode")
            .map_or_else(|| Value::str("custom"), |m| Value::Str(Value::from_json(m).to_text())),
    );
    merged.insert(
        "_outputs".into(),
        entry
            .get("outputs")
            .map_or_else(|| Value::Dict(Dict::new()), Value::from_json),
    );

    debug!("dispatching job {name} via helper {helper_id}");
    it.dispatch_depth += 1;
    let result = run_helper(host, &helper_id, &Value::Dict(merged));
    it.dispatch_depth -= 1;
    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registries_skip_blank_keys() {
        let cfg = HostConfig::from_lookup(|name| match name {
            HELPERS_ENV => Some(r#"{" h ": {"result": 1}, "  ": 2}"#.to_string()),
            JOB_INPUT_OVERRIDES_ENV => Some("[1, 2]".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.helpers.keys().collect::<Vec<_>>(), vec!["h"]);
        assert!(cfg.jobs.is_empty());
        assert!(cfg.job_input_overrides.is_empty());
    }

    #[test]
    fn malformed_registry_is_rejected() {
        let err = HostConfig::from_lookup(|name| {
            (name == JOBS_ENV).then(|| "[]".to_string())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), format!("{JOBS_ENV} must contain JSON mapping"));

        let err = HostConfig::from_lookup(|name| {
            (name == HELPERS_ENV).then(|| "{nope".to_string())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), format!("{HELPERS_ENV} must contain valid JSON mapping"));
    }

    #[test]
    fn helper_entries_without_command() {
        let host = HostConfig::new()
            .with_helper("fixed", json!({"result": {"ok": true}}))
            .with_helper("broken", json!({"error": "boom"}))
            .with_helper("raw", json!(7));
        let ok = run_helper(&host, "fixed", &Value::Null).unwrap();
        assert_eq!(ok.to_text(), r#"{"ok":true}"#);
        assert_eq!(run_helper(&host, "raw", &Value::Null).unwrap(), Value::Int(7));
        assert_eq!(
            run_helper(&host, "broken", &Value::Null).unwrap_err().to_string(),
            "ops.helper.call error: boom"
        );
        assert_eq!(
            run_helper(&host, "missing", &Value::Null).unwrap_err().to_string(),
            "ops.helper.call error: unsupported helper id: missing"
        );
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_captures_and_times_out() {
        let out = run_process(&ExecRequest {
            command: vec!["sh".into(), "-c".into(), "cat; echo err >&2; exit 3".into()],
            stdin: Some("hello".into()),
            ..ExecRequest::default()
        })
        .unwrap();
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "err\n");
        assert!(!out.timed_out);

        let slow = run_process(&ExecRequest {
            command: vec!["sleep".into(), "5".into()],
            timeout_ms: 50,
            ..ExecRequest::default()
        })
        .unwrap();
        assert!(slow.timed_out);
        assert_eq!(slow.code, TIMEOUT_EXIT_CODE);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_does_not_wait_for_grandchildren() {
        let started = Instant::now();
        let out = run_process(&ExecRequest {
            command: vec!["sh".into(), "-c".into(), "sleep 3; true".into()],
            timeout_ms: 50,
            ..ExecRequest::default()
        })
        .unwrap();
        assert!(out.timed_out);
        assert_eq!(out.code, TIMEOUT_EXIT_CODE);
        assert!(
            started.elapsed() < Duration::from_millis(1500),
            "returned after {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let err = run_process(&ExecRequest {
            command: vec!["definitely-not-a-real-binary-xyz".into()],
            ..ExecRequest::default()
        })
        .unwrap_err();
        assert!(matches!(err, HostError::Spawn { .. }));
    }
}

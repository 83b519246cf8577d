//! Lifecycle hooks from `harness.when`.
//!
//! Hooks are spec-lang expressions run after contract clauses settle. Each
//! one sees an event envelope as its subject and must return a truthy
//! value; anything else fails the case with `runtime.on_hook.failed`.

use std::sync::Arc;

use serde_json::{json, Map, Value as Json};
use speclang_ast::ast::Expr;
use speclang_parse::compile_at;
use speclang_types::Class;

use crate::assertion::{ClauseObserver, ClauseRecord, Totals};
use crate::case::CompiledCase;
use crate::error::RunError;
use crate::eval::Evaluator;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Must,
    May,
    MustNot,
    Fail,
    Complete,
}

impl HookEvent {
    const ALL: [HookEvent; 5] = [
        HookEvent::Must,
        HookEvent::May,
        HookEvent::MustNot,
        HookEvent::Fail,
        HookEvent::Complete,
    ];

    pub fn key(self) -> &'static str {
        match self {
            HookEvent::Must => "must",
            HookEvent::May => "may",
            HookEvent::MustNot => "must_not",
            HookEvent::Fail => "fail",
            HookEvent::Complete => "complete",
        }
    }

    fn from_key(key: &str) -> Option<HookEvent> {
        HookEvent::ALL.into_iter().find(|e| e.key() == key)
    }

    /// Event fired after a passing clause of `class`.
    pub fn for_class(class: Class) -> HookEvent {
        match class {
            Class::Must => HookEvent::Must,
            Class::May => HookEvent::May,
            Class::MustNot => HookEvent::MustNot,
        }
    }
}

/// Compiled `harness.when` expressions, grouped by event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    events: Vec<(HookEvent, Vec<Arc<Expr>>)>,
}

impl Hooks {
    pub fn parse(harness: &Map<String, Json>) -> Result<Hooks, RunError> {
        if harness.contains_key("on") {
            return Err(RunError::Config(
                "harness.when.legacy_on_forbidden: harness.on is forbidden; use harness.when".into(),
            ));
        }
        let when = match harness.get("when") {
            None | Some(Json::Null) => return Ok(Hooks::default()),
            Some(Json::Object(when)) => when,
            Some(_) => {
                return Err(RunError::Config(
                    "harness.when.invalid_shape: harness.when must be a mapping".into(),
                ))
            }
        };
        let mut events = Vec::with_capacity(when.len());
        for (raw_key, raw_list) in when {
            let key = raw_key.trim();
            let event = HookEvent::from_key(key)
                .ok_or_else(|| RunError::Config(format!("harness.when.unknown_key: {key}")))?;
            let items = match raw_list {
                Json::Array(items) if !items.is_empty() => items,
                _ => {
                    return Err(RunError::Config(format!(
                        "harness.when.invalid_shape: harness.when.{key} must be a non-empty list"
                    )))
                }
            };
            let mut compiled = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let path = format!("harness.when.{key}[{idx}]");
                if !item.is_object() {
                    return Err(RunError::Config(format!(
                        "harness.when.expr_invalid: {path} must be mapping expression"
                    )));
                }
                let expr = compile_at(item, &path)
                    .map_err(|e| RunError::Config(format!("harness.when.expr_invalid: {e}")))?;
                compiled.push(Arc::new(expr));
            }
            events.push((event, compiled));
        }
        Ok(Hooks { events })
    }

    pub fn get(&self, event: HookEvent) -> &[Arc<Expr>] {
        self.events
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, exprs)| exprs.as_slice())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Prefix before the first `:` when it looks like a dotted error token.
fn failure_token(message: &str) -> Option<&str> {
    let prefix = message.split(':').next().unwrap_or_default().trim();
    prefix.contains('.').then_some(prefix)
}

/// Observer that fires a case's hooks as its clauses settle.
pub struct HookRunner<'a> {
    hooks: &'a Hooks,
    evaluator: &'a Evaluator,
    case: &'a CompiledCase,
    runtime_impl: &'a str,
}

impl<'a> HookRunner<'a> {
    pub fn new(
        hooks: &'a Hooks,
        evaluator: &'a Evaluator,
        case: &'a CompiledCase,
        runtime_impl: &'a str,
    ) -> Self {
        HookRunner {
            hooks,
            evaluator,
            case,
            runtime_impl,
        }
    }

    fn envelope(
        &self,
        event: HookEvent,
        clause: Json,
        status: &str,
        totals: &Totals,
        failure: Option<&RunError>,
    ) -> Json {
        let mut envelope = json!({
            "event": event.key(),
            "case": {
                "id": self.case.id,
                "type": self.case.case_type,
                "doc_path": self.case.doc_path.display().to_string(),
            },
            "clause": clause,
            "runtime": {"impl": self.runtime_impl, "profile_enabled": false},
            "status": status,
            "totals": totals,
        });
        if let (Some(failure), Json::Object(map)) = (failure, &mut envelope) {
            let message = failure.to_string();
            map.insert(
                "failure".into(),
                json!({"message": message, "token": failure_token(&message)}),
            );
        }
        envelope
    }

    fn fire(
        &self,
        event: HookEvent,
        clause: Json,
        status: &str,
        totals: &Totals,
        failure: Option<&RunError>,
    ) -> Result<(), RunError> {
        let exprs = self.hooks.get(event);
        if exprs.is_empty() {
            return Ok(());
        }
        let subject = Value::from_json(&self.envelope(event, clause, status, totals, failure));
        for (idx, expr) in exprs.iter().enumerate() {
            let hook_failed = |detail: String| {
                RunError::Hook(format!(
                    "runtime.on_hook.failed: event={} index={idx}: {detail}",
                    event.key()
                ))
            };
            match self.evaluator.eval_predicate(expr, &subject) {
                Ok(true) => {}
                Ok(false) => return Err(hook_failed("expression returned falsy".into())),
                Err(e) => return Err(hook_failed(e.to_string())),
            }
        }
        Ok(())
    }
}

fn clause_json(clause: &ClauseRecord) -> Json {
    json!({
        "index": clause.index,
        "id": clause.id,
        "class": clause.class.as_str(),
        "assert_path": clause.assert_path,
        "target": clause.target,
    })
}

impl ClauseObserver for HookRunner<'_> {
    fn clause_passed(&mut self, clause: &ClauseRecord, totals: &Totals) -> Result<(), RunError> {
        self.fire(
            HookEvent::for_class(clause.class),
            clause_json(clause),
            "pass",
            totals,
            None,
        )
    }

    fn clause_failed(
        &mut self,
        clause: &ClauseRecord,
        totals: &Totals,
        failure: &RunError,
    ) -> Result<(), RunError> {
        self.fire(HookEvent::Fail, clause_json(clause), "fail", totals, Some(failure))
    }

    fn completed(&mut self, totals: &Totals) -> Result<(), RunError> {
        let clause = json!({
            "index": totals.passed_clauses,
            "id": null,
            "class": Class::Must.as_str(),
            "assert_path": "contract",
            "target": null,
        });
        self.fire(HookEvent::Complete, clause, "pass", totals, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn harness(v: Json) -> Map<String, Json> {
        match v {
            Json::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn parse_groups_by_event() {
        let hooks = Hooks::parse(&harness(json!({
            "when": {"must": [{"var": "subject"}], "complete": [{"lit": true}, true]}
        })));
        let err = hooks.unwrap_err();
        assert!(err.to_string().starts_with("harness.when.expr_invalid: harness.when.complete[1]"));

        let hooks = Hooks::parse(&harness(json!({"when": {"must": [{"var": "subject"}]}}))).unwrap();
        assert_eq!(hooks.get(HookEvent::Must).len(), 1);
        assert!(hooks.get(HookEvent::Fail).is_empty());
    }

    #[test]
    fn parse_errors() {
        let err = Hooks::parse(&harness(json!({"when": {"later": [{"var": "subject"}]}}))).unwrap_err();
        assert_eq!(err.to_string(), "harness.when.unknown_key: later");
        let err = Hooks::parse(&harness(json!({"when": {"fail": []}}))).unwrap_err();
        assert!(err.to_string().starts_with("harness.when.invalid_shape:"));
        let err = Hooks::parse(&harness(json!({"on": {}}))).unwrap_err();
        assert!(err.to_string().starts_with("harness.when.legacy_on_forbidden"));
    }

    #[test]
    fn token_is_dotted_prefix() {
        assert_eq!(failure_token("capability.ops_os.required: ops.os.exec"), Some("capability.ops_os.required"));
        assert_eq!(failure_token("all 'can' branches failed"), None);
    }
}

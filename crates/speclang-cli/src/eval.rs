//! Budgeted, capability-gated interpreter for compiled spec-lang
//! expressions.
//!
//! Evaluation runs on a trampoline: [`Interp::step`] either finishes with a
//! value or hands back the next `(expr, env)` to run. `if`, `let` and a
//! tail `call` of a closure continue the loop instead of recursing, so
//! tail-recursive programs run in constant host stack. Argument evaluation
//! still recurses and is bounded only by the step budget.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use speclang_ast::ast::Expr;
use speclang_types::catalog::{self, BuiltinSpec};
use speclang_types::{Capability, CapabilitySet, Limits};

use crate::builtins;
use crate::error::{BudgetKind, EvalError};
use crate::host::HostConfig;
use crate::value::{BuiltinRef, Closure, Value};

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// Lexical scope. Frames are reference-counted and shared by every closure
/// created in them.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

struct Frame {
    /// `None` marks a `let` slot that has not been filled yet.
    vars: RefCell<HashMap<String, Option<Value>>>,
    parent: Option<Env>,
}

enum Lookup {
    Found(Value),
    Uninitialized,
    Missing,
}

impl Env {
    pub fn root() -> Env {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    fn child(&self, vars: HashMap<String, Option<Value>>) -> Env {
        Env(Rc::new(Frame {
            vars: RefCell::new(vars),
            parent: Some(self.clone()),
        }))
    }

    fn define(&self, name: &str, value: Value) {
        self.0.vars.borrow_mut().insert(name.to_string(), Some(value));
    }

    fn lookup(&self, name: &str) -> Lookup {
        let mut frame = Some(self);
        while let Some(env) = frame {
            if let Some(slot) = env.0.vars.borrow().get(name) {
                return match slot {
                    Some(v) => Lookup::Found(v.clone()),
                    None => Lookup::Uninitialized,
                };
            }
            frame = env.0.parent.as_ref();
        }
        Lookup::Missing
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

/// Per-case local names for builtins, from `harness.spec_lang.imports`.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    aliases: HashMap<String, &'static BuiltinSpec>,
}

impl ImportTable {
    pub fn new() -> Self {
        ImportTable::default()
    }

    /// Bind `local` to `spec`. Returns false if `local` is already taken.
    pub fn insert(&mut self, local: &str, spec: &'static BuiltinSpec) -> bool {
        if self.aliases.contains_key(local) {
            return false;
        }
        self.aliases.insert(local.to_string(), spec);
        true
    }

    pub fn get(&self, local: &str) -> Option<&'static BuiltinSpec> {
        self.aliases.get(local).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluator (public entry point)
// ---------------------------------------------------------------------------

/// Configured evaluator. Each call to [`Evaluator::eval`] gets fresh budget
/// counters; nothing is shared between evaluations.
pub struct Evaluator {
    limits: Limits,
    capabilities: CapabilitySet,
    imports: ImportTable,
    symbols: IndexMap<String, Value>,
    host: Arc<HostConfig>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            limits: Limits::default(),
            capabilities: CapabilitySet::none(),
            imports: ImportTable::new(),
            symbols: IndexMap::new(),
            host: Arc::new(HostConfig::default()),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_imports(mut self, imports: ImportTable) -> Self {
        self.imports = imports;
        self
    }

    /// Extra names bound in the root environment (chain imports, symbol
    /// bindings). `subject` is always bound last and wins.
    pub fn with_symbols(mut self, symbols: IndexMap<String, Value>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_host(mut self, host: Arc<HostConfig>) -> Self {
        self.host = host;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn eval(&self, expr: &Expr, subject: &Value) -> Result<Value, EvalError> {
        validate_shape(expr, &self.limits)?;
        let mut interp = self.interp(subject.clone());
        let env = self.root_env(subject);
        interp.eval(expr, &env)
    }

    /// Evaluate and coerce the result to a boolean by truthiness.
    pub fn eval_predicate(&self, expr: &Expr, subject: &Value) -> Result<bool, EvalError> {
        self.eval(expr, subject).map(|v| v.truthy())
    }

    /// Evaluate a set of named expressions in one shared root frame so the
    /// resulting values (typically closures) may refer to each other.
    pub fn bind_symbols(
        &self,
        bindings: &[(String, Arc<Expr>)],
    ) -> Result<IndexMap<String, Value>, EvalError> {
        for (_, expr) in bindings {
            validate_shape(expr, &self.limits)?;
        }
        let mut interp = self.interp(Value::Null);
        let env = self.root_env(&Value::Null);
        let slots = bindings.iter().map(|(name, _)| (name.clone(), None)).collect();
        let frame = env.child(slots);
        let mut out = IndexMap::with_capacity(bindings.len());
        for (name, expr) in bindings {
            let value = interp.eval(expr, &frame)?;
            frame.define(name, value.clone());
            out.insert(name.clone(), value);
        }
        Ok(out)
    }

    fn interp(&self, subject: Value) -> Interp<'_> {
        Interp {
            subject,
            limits: self.limits,
            capabilities: &self.capabilities,
            imports: &self.imports,
            host: &self.host,
            steps: 0,
            started: Instant::now(),
            last_exit_code: None,
            dispatch_depth: 0,
        }
    }

    fn root_env(&self, subject: &Value) -> Env {
        let env = Env::root();
        for (name, value) in &self.symbols {
            env.define(name, value.clone());
        }
        env.define("subject", subject.clone());
        env
    }
}

/// Evaluate with default limits, no capabilities and no imports.
pub fn eval_expr(expr: &Expr, subject: &Value) -> Result<Value, EvalError> {
    Evaluator::new().eval(expr, subject)
}

/// Running totals for the structural pre-pass.
struct ShapeBudget<'a> {
    limits: &'a Limits,
    nodes: u64,
    literal_bytes: u64,
}

impl ShapeBudget<'_> {
    /// Count one internal-form node carrying `bytes` of string data.
    fn visit(&mut self, bytes: usize) -> Result<(), EvalError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(EvalError::Budget(BudgetKind::Nodes));
        }
        self.literal_bytes += bytes as u64;
        if self.literal_bytes > self.limits.max_literal_bytes {
            return Err(EvalError::Budget(BudgetKind::LiteralSize));
        }
        Ok(())
    }
}

enum ShapeItem<'e> {
    Expr(&'e Expr),
    Data(&'e serde_json::Value),
}

/// Structural pre-pass over the internal form of `expr`.
///
/// Every list, head symbol, name and literal counts as one node, and the
/// byte lengths of all strings (heads and names included) add into one
/// running `literal_size` total. Object literals count each key's bytes and
/// each value as a node.
fn validate_shape(expr: &Expr, limits: &Limits) -> Result<(), EvalError> {
    let mut budget = ShapeBudget {
        limits,
        nodes: 0,
        literal_bytes: 0,
    };
    let mut pending = vec![ShapeItem::Expr(expr)];
    while let Some(item) = pending.pop() {
        match item {
            ShapeItem::Data(v) => match v {
                serde_json::Value::String(s) => budget.visit(s.len())?,
                serde_json::Value::Array(items) => {
                    budget.visit(0)?;
                    pending.extend(items.iter().map(ShapeItem::Data));
                }
                serde_json::Value::Object(map) => {
                    budget.visit(0)?;
                    for (k, v) in map {
                        budget.literal_bytes += k.len() as u64;
                        pending.push(ShapeItem::Data(v));
                    }
                }
                _ => budget.visit(0)?,
            },
            ShapeItem::Expr(Expr::Lit(v)) if speclang_ast::ast::is_scalar(v) => {
                pending.push(ShapeItem::Data(v));
            }
            ShapeItem::Expr(Expr::Lit(v)) => {
                // ["lit", v]
                budget.visit(0)?;
                budget.visit("lit".len())?;
                pending.push(ShapeItem::Data(v));
            }
            ShapeItem::Expr(Expr::Var(name)) => {
                budget.visit(0)?;
                budget.visit("var".len())?;
                budget.visit(name.len())?;
            }
            ShapeItem::Expr(Expr::Fn { params, body }) => {
                budget.visit(0)?;
                budget.visit("fn".len())?;
                budget.visit(0)?;
                for p in params {
                    budget.visit(p.len())?;
                }
                pending.push(ShapeItem::Expr(body));
            }
            ShapeItem::Expr(Expr::Let { bindings, body }) => {
                budget.visit(0)?;
                budget.visit("let".len())?;
                budget.visit(0)?;
                for b in bindings {
                    budget.visit(0)?;
                    budget.visit(b.name.len())?;
                    pending.push(ShapeItem::Expr(&b.value));
                }
                pending.push(ShapeItem::Expr(body));
            }
            ShapeItem::Expr(Expr::Op { head, args }) => {
                budget.visit(0)?;
                budget.visit(head.len())?;
                pending.extend(args.iter().map(|a| ShapeItem::Expr(&**a)));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Interpreter state
// ---------------------------------------------------------------------------

enum Flow {
    Done(Value),
    Continue(Arc<Expr>, Env),
}

enum Head {
    If,
    Call,
    /// `lit`, `var`, `fn` or `let` used as a plain operator head.
    Malformed(&'static str),
    Builtin(&'static BuiltinSpec),
}

/// Per-evaluation state: budget counters, capabilities and effect context.
pub(crate) struct Interp<'a> {
    pub(crate) subject: Value,
    limits: Limits,
    capabilities: &'a CapabilitySet,
    imports: &'a ImportTable,
    pub(crate) host: &'a HostConfig,
    steps: u64,
    started: Instant,
    pub(crate) last_exit_code: Option<i64>,
    pub(crate) dispatch_depth: u32,
}

impl<'a> Interp<'a> {
    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::Budget(BudgetKind::Steps));
        }
        if self.limits.timeout_ms > 0
            && self.started.elapsed().as_millis() > u128::from(self.limits.timeout_ms)
        {
            return Err(EvalError::Budget(BudgetKind::Timeout));
        }
        Ok(())
    }

    /// Bound a list a builtin is about to build by the node budget.
    pub(crate) fn check_items(&self, count: u64) -> Result<(), EvalError> {
        if count > self.limits.max_nodes {
            return Err(EvalError::Budget(BudgetKind::Nodes));
        }
        Ok(())
    }

    /// Bound a string a builtin is about to build by the literal budget.
    pub(crate) fn check_text(&self, len: u64) -> Result<(), EvalError> {
        if len > self.limits.max_literal_bytes {
            return Err(EvalError::Budget(BudgetKind::LiteralSize));
        }
        Ok(())
    }

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        let mut flow = self.step(expr, env)?;
        loop {
            match flow {
                Flow::Done(value) => return Ok(value),
                Flow::Continue(next, next_env) => flow = self.step(&next, &next_env)?,
            }
        }
    }

    fn step(&mut self, expr: &Expr, env: &Env) -> Result<Flow, EvalError> {
        self.tick()?;
        match expr {
            Expr::Lit(v) => Ok(Flow::Done(Value::from_json(v))),
            Expr::Var(name) => self.lookup(name, env).map(Flow::Done),
            Expr::Fn { params, body } => Ok(Flow::Done(Value::Closure(Rc::new(Closure {
                params: params.clone(),
                body: Arc::clone(body),
                env: env.clone(),
            })))),
            Expr::Let { bindings, body } => {
                let slots = bindings.iter().map(|b| (b.name.clone(), None)).collect();
                let next = env.child(slots);
                for binding in bindings {
                    let value = self.eval(&binding.value, &next)?;
                    next.define(&binding.name, value);
                }
                Ok(Flow::Continue(Arc::clone(body), next))
            }
            Expr::Op { head, args } => self.step_op(head, args, env),
        }
    }

    fn step_op(&mut self, head: &str, args: &[Arc<Expr>], env: &Env) -> Result<Flow, EvalError> {
        match self.resolve_head(head)? {
            Head::If => {
                if args.len() != 3 {
                    return Err(EvalError::arity("if", 3, args.len()));
                }
                let cond = self.eval(&args[0], env)?;
                let branch = if cond.truthy() { &args[1] } else { &args[2] };
                Ok(Flow::Continue(Arc::clone(branch), env.clone()))
            }
            Head::Call => {
                let Some((callee, rest)) = args.split_first() else {
                    return Err(EvalError::arity_at_least("call", 1, 0));
                };
                let callee = self.eval(callee, env)?;
                let values = self.eval_all(rest, env)?;
                match callee {
                    Value::Closure(closure) => {
                        let frame = bind_params(&closure, values)?;
                        Ok(Flow::Continue(Arc::clone(&closure.body), frame))
                    }
                    other => self.apply(other, values).map(Flow::Done),
                }
            }
            Head::Malformed(form) => Err(EvalError::schema(format!(
                "spec_lang {form} form is malformed"
            ))),
            Head::Builtin(spec) => self.eval_builtin_form(spec, args, env).map(Flow::Done),
        }
    }

    fn eval_all(&mut self, args: &[Arc<Expr>], env: &Env) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|a| self.eval(a, env)).collect()
    }

    fn resolve_head(&self, head: &str) -> Result<Head, EvalError> {
        match head {
            "if" => return Ok(Head::If),
            "call" => return Ok(Head::Call),
            "lit" => return Ok(Head::Malformed("lit")),
            "var" => return Ok(Head::Malformed("var")),
            "fn" => return Ok(Head::Malformed("fn")),
            "let" => return Ok(Head::Malformed("let")),
            _ => {}
        }
        if let Some(spec) = catalog::canonical(head) {
            return Ok(Head::Builtin(spec));
        }
        if head.starts_with("std.") {
            return Err(unsupported(head));
        }
        if let Some(spec) = self.imports.get(head) {
            return Ok(Head::Builtin(spec));
        }
        catalog::flat(head)
            .map(Head::Builtin)
            .ok_or_else(|| unsupported(head))
    }

    fn lookup(&self, name: &str, env: &Env) -> Result<Value, EvalError> {
        match env.lookup(name) {
            Lookup::Found(v) => Ok(v),
            Lookup::Uninitialized => Err(EvalError::schema(format!(
                "uninitialized variable: {name}"
            ))),
            Lookup::Missing => {
                let spec = catalog::canonical(name)
                    .or_else(|| self.imports.get(name))
                    .or_else(|| catalog::flat(name));
                match spec {
                    Some(spec) => Ok(Value::Builtin(Rc::new(BuiltinRef {
                        spec,
                        bound: Vec::new(),
                    }))),
                    None => Err(EvalError::schema(format!("undefined variable: {name}"))),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Builtins in operator position
    // -----------------------------------------------------------------------

    fn eval_builtin_form(
        &mut self,
        spec: &'static BuiltinSpec,
        args: &[Arc<Expr>],
        env: &Env,
    ) -> Result<Value, EvalError> {
        let name = spec.display_name();
        match spec.symbol {
            "std.logic.and" | "std.logic.or" => {
                if args.is_empty() {
                    return Err(EvalError::arity_at_least(name, 1, 0));
                }
                let want = spec.symbol == "std.logic.or";
                for arg in args {
                    if self.eval(arg, env)?.truthy() == want {
                        return Ok(Value::Bool(want));
                    }
                }
                Ok(Value::Bool(!want))
            }
            "std.core.coalesce" => {
                if args.is_empty() {
                    return Err(EvalError::arity_at_least(name, 1, 0));
                }
                for arg in args {
                    let v = self.eval(arg, env)?;
                    if !builtins::is_blank(&v) {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            "std.string.contains"
            | "std.string.starts_with"
            | "std.string.ends_with"
            | "std.type.json_type"
            | "std.object.has_key"
                if args.len() == 1 =>
            {
                let second = self.eval(&args[0], env)?;
                let values = [self.subject.clone(), second];
                self.invoke(spec, &values)
            }
            "std.string.split" if args.len() == 1 => {
                let text = self.eval(&args[0], env)?.to_text();
                Ok(Value::List(
                    text.split_whitespace().map(Value::str).collect(),
                ))
            }
            "ops.job.dispatch" => {
                if args.is_empty() || args.len() > 2 {
                    return Err(EvalError::arity(name, 1, args.len()));
                }
                self.require_capability(spec)?;
                let values = self.eval_all(args, env)?;
                self.invoke(spec, &values)
            }
            _ => {
                if args.len() != spec.arity {
                    return Err(EvalError::arity(name, spec.arity, args.len()));
                }
                self.require_capability(spec)?;
                let values = self.eval_all(args, env)?;
                self.invoke(spec, &values)
            }
        }
    }

    fn require_capability(&self, spec: &BuiltinSpec) -> Result<(), EvalError> {
        match Capability::required_for(spec.symbol) {
            Some(cap) if !self.capabilities.contains(cap) => Err(EvalError::Capability {
                code: cap.error_code(),
                symbol: spec.symbol.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn invoke(&mut self, spec: &BuiltinSpec, args: &[Value]) -> Result<Value, EvalError> {
        let handler = builtins::handler(spec.symbol).ok_or_else(|| unsupported(spec.symbol))?;
        handler(self, args)
    }

    // -----------------------------------------------------------------------
    // Application of first-class callables
    // -----------------------------------------------------------------------

    /// Apply a closure or builtin reference to already-evaluated arguments.
    pub(crate) fn apply(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, EvalError> {
        match callee {
            Value::Closure(closure) => {
                let frame = bind_params(&closure, args)?;
                self.eval(&closure.body, &frame)
            }
            Value::Builtin(builtin) => self.apply_builtin(&builtin, args),
            _ => Err(EvalError::schema(
                "spec_lang callable expects fn closure or builtin function",
            )),
        }
    }

    /// Curried builtin application: too few args yields a new reference,
    /// too many applies the result to the rest.
    fn apply_builtin(&mut self, builtin: &BuiltinRef, args: Vec<Value>) -> Result<Value, EvalError> {
        let spec = builtin.spec;
        let mut all = builtin.bound.clone();
        all.extend(args);
        if all.len() < spec.arity {
            return Ok(Value::Builtin(Rc::new(BuiltinRef { spec, bound: all })));
        }
        let rest = all.split_off(spec.arity);
        self.require_capability(spec)?;
        let result = self.invoke(spec, &all)?;
        if rest.is_empty() {
            Ok(result)
        } else if result.is_callable() {
            self.apply(result, rest)
        } else {
            Err(EvalError::schema(format!(
                "spec_lang over-application error for {}: result is not callable",
                spec.display_name()
            )))
        }
    }

    /// Apply `callee` and coerce the result by truthiness.
    pub(crate) fn apply_predicate(&mut self, callee: &Value, args: Vec<Value>) -> Result<bool, EvalError> {
        self.apply(callee.clone(), args).map(|v| v.truthy())
    }
}

fn bind_params(closure: &Closure, args: Vec<Value>) -> Result<Env, EvalError> {
    if closure.params.len() != args.len() {
        return Err(EvalError::schema(format!(
            "spec_lang call argument count mismatch: expected {} got {}",
            closure.params.len(),
            args.len()
        )));
    }
    let vars = closure
        .params
        .iter()
        .cloned()
        .zip(args.into_iter().map(Some))
        .collect();
    Ok(closure.env.child(vars))
}

fn unsupported(symbol: &str) -> EvalError {
    EvalError::schema(format!("unsupported spec_lang symbol: {symbol}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use speclang_ast::sexpr::from_sexpr;

    fn run(src: serde_json::Value, subject: serde_json::Value) -> Result<Value, EvalError> {
        let expr = from_sexpr(&src).unwrap();
        eval_expr(&expr, &Value::from_json(&subject))
    }

    #[test]
    fn if_is_lazy() {
        let v = run(json!(["if", true, 1, ["div", 1, 0]]), json!(null)).unwrap();
        assert!(matches!(v, Value::Int(1)));
    }

    #[test]
    fn let_slot_poisoned_until_filled() {
        let err = run(json!(["let", [["a", ["var", "b"]], ["b", 1]], ["var", "a"]]), json!(null))
            .unwrap_err();
        assert_eq!(err.to_string(), "uninitialized variable: b");
    }

    #[test]
    fn let_allows_recursive_closure() {
        let src = json!(["let", [["fact", ["fn", ["n"],
            ["if", ["lte", ["var", "n"], 1], 1,
                ["mul", ["var", "n"], ["call", ["var", "fact"], ["sub", ["var", "n"], 1]]]]]]],
            ["call", ["var", "fact"], 5]]);
        assert!(matches!(run(src, json!(null)).unwrap(), Value::Int(120)));
    }

    #[test]
    fn undefined_and_unsupported() {
        assert_eq!(run(json!(["var", "nope"]), json!(null)).unwrap_err().to_string(), "undefined variable: nope");
        assert_eq!(
            run(json!(["std.string.nope", 1]), json!(null)).unwrap_err().to_string(),
            "unsupported spec_lang symbol: std.string.nope"
        );
    }

    #[test]
    fn var_names_builtin_as_value() {
        let v = run(json!(["call", ["var", "add"], 2, 3]), json!(null)).unwrap();
        assert!(matches!(v, Value::Int(5)));
    }

    #[test]
    fn node_budget_counts_heads_and_lists() {
        // list + "and" + two literals
        let expr = from_sexpr(&json!(["and", true, true])).unwrap();
        let tight = Evaluator::new().with_limits(Limits { max_nodes: 3, ..Limits::default() });
        assert_eq!(tight.eval(&expr, &Value::Null).unwrap_err(), EvalError::Budget(BudgetKind::Nodes));
        let exact = Evaluator::new().with_limits(Limits { max_nodes: 4, ..Limits::default() });
        assert!(matches!(exact.eval(&expr, &Value::Null).unwrap(), Value::Bool(true)));
    }

    #[test]
    fn node_budget_counts_literal_data() {
        // ["len", ["lit", [1, 2, 3]]]: 2 + 2 + 1 + 3
        let expr = from_sexpr(&json!(["len", ["lit", [1, 2, 3]]])).unwrap();
        let tight = Evaluator::new().with_limits(Limits { max_nodes: 7, ..Limits::default() });
        assert_eq!(tight.eval(&expr, &Value::Null).unwrap_err(), EvalError::Budget(BudgetKind::Nodes));
        let exact = Evaluator::new().with_limits(Limits { max_nodes: 8, ..Limits::default() });
        assert!(matches!(exact.eval(&expr, &Value::Null).unwrap(), Value::Int(3)));
    }

    #[test]
    fn literal_size_budget() {
        let expr = from_sexpr(&json!(["len", "abcdef"])).unwrap();
        let ev = Evaluator::new().with_limits(Limits { max_literal_bytes: 8, ..Limits::default() });
        assert_eq!(
            ev.eval(&expr, &Value::Null).unwrap_err().to_string(),
            "spec_lang budget exceeded: literal_size"
        );
    }

    #[test]
    fn literal_size_is_a_running_total() {
        // "eq" + "abcd" + "efgh" = 10 bytes
        let expr = from_sexpr(&json!(["eq", "abcd", "efgh"])).unwrap();
        let tight = Evaluator::new().with_limits(Limits { max_literal_bytes: 9, ..Limits::default() });
        assert_eq!(
            tight.eval(&expr, &Value::Null).unwrap_err(),
            EvalError::Budget(BudgetKind::LiteralSize)
        );
        let exact = Evaluator::new().with_limits(Limits { max_literal_bytes: 10, ..Limits::default() });
        assert!(matches!(exact.eval(&expr, &Value::Null).unwrap(), Value::Bool(false)));
    }

    #[test]
    fn literal_size_counts_var_names_and_object_keys() {
        // "var" + "subject" = 10
        let expr = from_sexpr(&json!(["var", "subject"])).unwrap();
        let ev = Evaluator::new().with_limits(Limits { max_literal_bytes: 9, ..Limits::default() });
        assert!(ev.eval(&expr, &Value::Null).is_err());

        // "len" + "lit" + "key" + "v" = 10
        let expr = from_sexpr(&json!(["len", ["lit", {"key": "v"}]])).unwrap();
        let ev = Evaluator::new().with_limits(Limits { max_literal_bytes: 9, ..Limits::default() });
        assert_eq!(ev.eval(&expr, &Value::Null).unwrap_err(), EvalError::Budget(BudgetKind::LiteralSize));
    }
}

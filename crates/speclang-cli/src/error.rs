//! Error taxonomy.
//!
//! [`EvalError`] covers one evaluation: shape/schema problems, budget
//! exhaustion, capability denial and effect failures. [`RunError`] wraps
//! everything the runner can hit while compiling and executing a case.

use std::fmt;
use std::path::PathBuf;

use speclang_parse::{CompileError, DocumentError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    Steps,
    Nodes,
    LiteralSize,
    Timeout,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BudgetKind::Steps => "steps",
            BudgetKind::Nodes => "nodes",
            BudgetKind::LiteralSize => "literal_size",
            BudgetKind::Timeout => "timeout",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Malformed expression, wrong arity or argument types.
    #[error("{0}")]
    Schema(String),
    #[error("spec_lang budget exceeded: {0}")]
    Budget(BudgetKind),
    /// Effectful builtin invoked without the capability that gates it.
    #[error("{code}: {symbol}")]
    Capability { code: String, symbol: String },
    /// Effect or helper failure.
    #[error("{0}")]
    Runtime(String),
}

impl EvalError {
    pub fn schema(msg: impl Into<String>) -> Self {
        EvalError::Schema(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        EvalError::Runtime(msg.into())
    }

    pub fn arity(op: &str, expected: usize, got: usize) -> Self {
        EvalError::Schema(format!(
            "spec_lang arity error for {op}: expected {expected} got {got}"
        ))
    }

    pub fn arity_at_least(op: &str, expected: usize, got: usize) -> Self {
        EvalError::Schema(format!(
            "spec_lang arity error for {op}: expected at least {expected} got {got}"
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Evaluation error raised while evaluating one assertion leaf.
    #[error("{context} {source}")]
    Evaluate {
        context: String,
        #[source]
        source: EvalError,
    },
    /// A contract clause did not hold.
    #[error("{0}")]
    Assertion(String),
    #[error("{0}")]
    Chain(String),
    #[error("{0}")]
    Hook(String),
    /// Invalid harness or case configuration.
    #[error("{0}")]
    Config(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, RunError::Assertion(_))
    }

    /// Failure category reported per case: `schema`, `assertion` or `runtime`.
    pub fn category(&self) -> &'static str {
        match self {
            RunError::Compile(_) | RunError::Document(_) | RunError::Config(_) => "schema",
            RunError::Eval(EvalError::Schema(_))
            | RunError::Evaluate {
                source: EvalError::Schema(_),
                ..
            } => "schema",
            RunError::Assertion(_) => "assertion",
            _ => "runtime",
        }
    }
}

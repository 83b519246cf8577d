#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

pub mod assertion;
mod builtins;
pub mod cache;
pub mod case;
pub mod chain;
pub mod error;
pub mod eval;
pub mod hooks;
pub mod host;
pub mod runner;
pub mod value;

pub use error::{EvalError, RunError};
pub use eval::{eval_expr, Evaluator, ImportTable};
pub use runner::{Runner, RunnerConfig};
pub use value::Value;

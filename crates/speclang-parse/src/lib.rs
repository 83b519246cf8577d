#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

mod compiler;
pub mod document;

pub use compiler::{compile, compile_at, compile_list, decompile, CompileError, MAX_NESTING_DEPTH};
pub use document::{load_cases, parse_cases, DocumentError, DocumentFormat, RawCase};

#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

pub mod catalog;
mod capability;
mod class;
mod limits;

pub use capability::{Capability, CapabilitySet};
pub use catalog::{BuiltinSpec, SPECIAL_FORMS};
pub use class::Class;
pub use limits::Limits;

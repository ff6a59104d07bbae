//! doofc: a multi-target compiler core (see spec.md / SPEC_FULL.md for
//! the full design). The binary crate (`main.rs`) is a thin CLI shell
//! around this library.

pub mod ast;
pub mod cli;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod monomorphize;
pub mod parse;
pub mod types;
pub mod validate;

//! Programmer-facing error type (SPEC_FULL.md §10.1). Distinct from
//! [`crate::diagnostics::ValidationError`], which is accumulated
//! program data, not a Rust `Error`.

use thiserror::Error;

use crate::diagnostics::ValidationError;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project config at {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown compilation target: {0}")]
    UnknownTarget(String),

    #[error("internal compiler error: {0}")]
    Internal(ValidationError),
}

pub type CompilerResult<T> = Result<T, CompilerError>;

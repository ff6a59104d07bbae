//! `ValidationError` and the error-kind taxonomy (spec §7). This is
//! plain accumulated data, never propagated with `?` — see
//! SPEC_FULL.md §10.1 for why this is kept separate from
//! `error::CompilerError`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    TypeMismatch,
    UnknownIdentifier,
    UnknownMember,
    AmbiguousMember,
    ArityOrNamedArgument,
    DefiniteAssignmentViolation,
    ReadonlyViolation,
    NarrowingViolation,
    UnionViolation,
    ImportExportViolation,
    GenericViolation,
    ExternViolation,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ParseError => "Parse Error",
            ErrorKind::TypeMismatch => "Type Mismatch",
            ErrorKind::UnknownIdentifier => "Unknown Identifier",
            ErrorKind::UnknownMember => "Unknown Member",
            ErrorKind::AmbiguousMember => "Ambiguous Member",
            ErrorKind::ArityOrNamedArgument => "Arity / Named-Argument Violation",
            ErrorKind::DefiniteAssignmentViolation => "Definite-Assignment Violation",
            ErrorKind::ReadonlyViolation => "Readonly Violation",
            ErrorKind::NarrowingViolation => "Narrowing Violation",
            ErrorKind::UnionViolation => "Union Violation",
            ErrorKind::ImportExportViolation => "Import/Export Violation",
            ErrorKind::GenericViolation => "Generic Violation",
            ErrorKind::ExternViolation => "Extern Violation",
            ErrorKind::InternalError => "Internal Error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            filename: None,
            line: None,
            column: None,
            kind,
        }
    }

    pub fn at(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.filename, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => {
                write!(f, "{file}:{line}:{col}: {} [{}]", self.message, self.kind)
            }
            _ => write!(f, "{}: [{}]", self.message, self.kind),
        }
    }
}

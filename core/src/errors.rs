//! Error types for the plastics policy language and simulation engine.
//!
//! Errors fall into three kinds which callers can tell apart without looking
//! at message text:
//!
//! - **Syntax**: reported by the parse front end with a line and column.
//! - **Compile**: structural problems found while building a program (for
//!   example a `var` name containing a period). Like syntax errors, these
//!   block creation of the program.
//! - **Runtime**: raised while a compiled program runs against a
//!   [`State`](crate::state::State), since most checks depend on what the
//!   state contains.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::parser::{Span, SyntaxError};

/// Which stage of the pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Syntax,
    Compile,
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Compile => write!(f, "compile error"),
            ErrorKind::Runtime => write!(f, "runtime error"),
        }
    }
}

/// Any error produced while compiling or running a policy script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Compile(_) => ErrorKind::Compile,
            Error::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// Convert to a Diagnostic for display at the API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Error::Syntax(err) => err.to_diagnostic(),
            Error::Compile(err) => err.to_diagnostic(),
            Error::Runtime(err) => err.to_diagnostic(),
        }
    }
}

/// Structural errors found while turning a syntax tree into a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Cannot make new variables with periods in the name: {name}")]
    DottedDefinition { name: String, span: Span },

    #[error("Identifier for lifecycle must be in out: {path}")]
    LifecycleOutsideOut { path: String, span: Span },
}

impl CompileError {
    pub fn span(&self) -> &Span {
        match self {
            CompileError::DottedDefinition { span, .. } => span,
            CompileError::LifecycleOutsideOut { span, .. } => span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match self {
            CompileError::DottedDefinition { .. } => (
                "C001",
                Some("Declare a bare name with var, or assign to an existing path"),
            ),
            CompileError::LifecycleOutsideOut { .. } => {
                ("C002", Some("List attributes as out.REGION.ATTRIBUTE"))
            }
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: Some(self.span().clone()),
            help: help.map(String::from),
            code: Some(code.to_string()),
        }
    }
}

/// Failures raised while a compiled program runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Could not find {segment} ({path})")]
    IdentifierNotFound { segment: String, path: String },

    #[error("{path} is not a number")]
    NotANumber { path: String },

    #[error("{name} was defined multiple times.")]
    DuplicateLocal { name: String },

    #[error("Cannot mix lifetimes of waste and consumption")]
    MixedLifecycle,

    #[error("Could not find lifetimes for {path}")]
    UnknownLifecycle { path: String },

    #[error("Start year must be earlier than end year for change (got {start} to {end}).")]
    InvalidYearRange { start: f64, end: f64 },

    #[error("No baseline data for year {year}")]
    MissingBaseline { year: i32 },

    #[error("State has no meta.year")]
    MissingYear,

    #[error("Repeat count must be between 1 and {max} (got {count})")]
    InvalidRepeatCount { count: f64, max: usize },

    #[error("Invalid distribution: {message}")]
    InvalidDistribution { message: String },
}

impl RuntimeError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            RuntimeError::IdentifierNotFound { .. } => "R001",
            RuntimeError::NotANumber { .. } => "R002",
            RuntimeError::DuplicateLocal { .. } => "R003",
            RuntimeError::MixedLifecycle => "R004",
            RuntimeError::UnknownLifecycle { .. } => "R005",
            RuntimeError::InvalidYearRange { .. } => "R006",
            RuntimeError::MissingBaseline { .. } => "R007",
            RuntimeError::MissingYear => "R008",
            RuntimeError::InvalidRepeatCount { .. } => "R009",
            RuntimeError::InvalidDistribution { .. } => "R010",
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: None,
            help: None,
            code: Some(code.to_string()),
        }
    }
}

/// A diagnostic message with an optional source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the issue, when it is known.
    pub span: Option<Span>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Optional error code (e.g., "P001") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

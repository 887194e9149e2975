//! Diagnostics emitted while weaving.

use derive_more::Display;
use serde::Serialize;

/// A diagnostic naming the routine it concerns.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Display)]
#[display("{severity} [{kind}] {routine}: {message}")]
pub struct Diagnostic {
    /// `Type::Method`.
    pub routine: String,
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(routine: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            routine: routine.into(),
            kind,
            severity: DiagnosticSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(
        routine: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            routine: routine.into(),
            kind,
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display)]
pub enum DiagnosticSeverity {
    #[display("ERROR")]
    Error,
    #[display("WARNING")]
    Warning,
}

/// What went wrong, by failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    PatternMismatch,
    UnresolvedOperand,
    StackImbalance,
    SliceApproximation,
    /// The call site matched but its operands have an unsupported shape.
    UnsupportedShape,
    /// Planning or application failed for another reason.
    Edit,
    /// A woven property whose getter could not be redirected.
    Getter,
}

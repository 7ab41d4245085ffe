//! Diagnostic message types.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A position in schema source: file, 1-based line, 1-based column.
///
/// Positions arrive pre-resolved from the external parser; no source text
/// flows through this crate.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct SourcePos {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// How a diagnostic's message should be read.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub enum DiagnosticKind {
    /// Prose describing what went wrong.
    Message,
    /// The form the compiler expected to find; renders as `expected <form>`.
    Expect,
}

/// A located error message.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Diagnostic {
    pub pos: SourcePos,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn message(pos: SourcePos, message: impl Into<String>) -> Self {
        Self {
            pos,
            kind: DiagnosticKind::Message,
            message: message.into(),
        }
    }

    pub fn expect(pos: SourcePos, form: impl Into<String>) -> Self {
        Self {
            pos,
            kind: DiagnosticKind::Expect,
            message: form.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::Message => write!(f, "{}: {}", self.pos, self.message),
            DiagnosticKind::Expect => write!(f, "{}: expected {}", self.pos, self.message),
        }
    }
}

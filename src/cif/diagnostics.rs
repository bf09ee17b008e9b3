//! Structured, non-fatal parse diagnostics.
//!
//! The parser never aborts on malformed input. Anything worth reporting is
//! recorded as a [`Diagnostic`] on the parsed file, and the caller decides
//! whether it should be treated as fatal.

use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The affected construct was still used or skipped harmlessly.
    Warning,
    /// A structural violation; the affected loop was dropped.
    Error,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("blank line inside loop header; loop was not processed")]
    BlankLineInLoopHeader,
    #[error(
        "parsed data for table {table} cannot be resolved into a table of the expected size: \
         got n={elements} items, expected c={columns} columns{}",
        remainder(.elements, .columns)
    )]
    ShapeMismatch {
        /// 1-based index the table would have had.
        table: usize,
        elements: usize,
        columns: usize,
    },
    #[error("duplicate column label {label} in table {table}; table was not processed")]
    DuplicateColumn { table: usize, label: String },
    #[error("text contains single and double quotes; value may be parsed incorrectly")]
    AmbiguousQuoteFold,
    #[error("text field is not terminated before end of input")]
    UnterminatedTextField,
    #[error("setting cast_values true->false has no effect on stored data")]
    CastNotReversible,
}

fn remainder(elements: &usize, columns: &usize) -> String {
    match elements.checked_rem(*columns) {
        Some(rem) => format!(" (n%c={rem})"),
        None => String::new(),
    }
}

/// A diagnostic with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// 1-based physical line number, when the condition is tied to one.
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, line: Option<usize>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            line,
        }
    }

    pub fn error(kind: DiagnosticKind, line: Option<usize>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            line,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.line {
            Some(line) => write!(f, "{level} (line {line}): {}", self.kind),
            None => write!(f, "{level}: {}", self.kind),
        }
    }
}

impl std::error::Error for Diagnostic {}

//! A peekable cursor over logical lines.
//!
//! Physical lines are classified as they are read. A line opening a text
//! field (`;`, `'''` or `"""`) swallows every following physical line up to
//! the matching terminator, and the span comes out as a single
//! [`LineKind::Continuation`] whose text is the quoted payload.

use std::iter::Enumerate;
use std::str;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::line::{self, LineKind};
use super::patterns;

/// One logical line with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: usize,
    pub kind: LineKind,
    /// Comment-stripped text, or the quoted payload for a continuation.
    pub text: String,
    /// Data tokens following the closing delimiter of a text field.
    pub trailing: Vec<String>,
}

pub struct Lines<'a> {
    physical: Enumerate<str::Lines<'a>>,
    pending: Option<LogicalLine>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lines<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            physical: input.lines().enumerate(),
            pending: None,
            diagnostics: Vec::new(),
        }
    }

    /// Look at the next logical line without consuming it.
    pub fn peek(&mut self) -> Option<&LogicalLine> {
        if self.pending.is_none() {
            self.pending = self.read_logical();
        }
        self.pending.as_ref()
    }

    /// Return a line so that the next call to [`next`](Iterator::next) yields
    /// it again.
    pub fn push_back(&mut self, line: LogicalLine) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(line);
    }

    /// Diagnostics raised while folding text fields so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn read_logical(&mut self) -> Option<LogicalLine> {
        let (idx, raw) = self.physical.next()?;
        let number = idx + 1;
        let kind = line::classify(raw);
        let (text, trailing) = match kind {
            LineKind::Continuation => self.fold_text_field(number, raw),
            _ => (line::strip_comments(raw).to_string(), Vec::new()),
        };
        Some(LogicalLine {
            number,
            kind,
            text,
            trailing,
        })
    }

    fn fold_text_field(&mut self, number: usize, raw: &'a str) -> (String, Vec<String>) {
        let opening = raw.trim_start();
        let delimiter = line::text_field_delimiter(opening).unwrap_or(";");
        let first = &opening[delimiter.len()..];

        let mut parts: Vec<&str> = Vec::new();
        let mut tail: Option<&str> = None;

        // Triple-quoted fields may close on the line that opens them.
        match first.find(delimiter) {
            Some(end) if delimiter != ";" => {
                parts.push(&first[..end]);
                tail = Some(&first[end + delimiter.len()..]);
            }
            _ => parts.push(first),
        }

        while tail.is_none() {
            let Some((_, next)) = self.physical.next() else {
                break;
            };
            if delimiter == ";" {
                match next.trim_start().strip_prefix(';') {
                    Some(rest) => tail = Some(rest),
                    None => parts.push(next),
                }
            } else if let Some(end) = next.find(delimiter) {
                parts.push(&next[..end]);
                tail = Some(&next[end + delimiter.len()..]);
            } else {
                parts.push(next);
            }
        }

        let trailing = match tail {
            Some(rest) => patterns::data_tokens(line::strip_comments(rest))
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::UnterminatedTextField,
                    Some(number),
                ));
                Vec::new()
            }
        };

        let payload = parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let (folded, warning) = line::quote_text_field(&payload);
        if let Some(kind) = warning {
            self.diagnostics.push(Diagnostic::warning(kind, Some(number)));
        }
        (folded, trailing)
    }
}

impl Iterator for Lines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<Self::Item> {
        match self.pending.take() {
            Some(line) => Some(line),
            None => self.read_logical(),
        }
    }
}

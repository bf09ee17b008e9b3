//! Line normalization and classification.
//!
//! These are pure functions over a single line. Classification happens once
//! per logical line, producing a [`LineKind`] that the parser dispatches on.

use super::diagnostics::DiagnosticKind;
use super::patterns;

/// Delimiters that open a multi-line text field when they start a line.
const TEXT_FIELD_DELIMITERS: [&str; 3] = ["'''", "\"\"\"", ";"];

/// Classification of one logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Whitespace only.
    Blank,
    /// Nothing left once the comment is stripped.
    Comment,
    /// `data_<name>`.
    BlockMarker { name: String },
    /// `loop_`, with any text following the keyword on the same line.
    LoopMarker { inline: String },
    /// Starts with `_`.
    Key,
    /// Anything else.
    Data,
    /// A folded multi-line text field; the text is already quoted.
    Continuation,
}

/// Truncate at the first `#` and trim whitespace.
///
/// This is quote-unaware: a `#` inside a quoted value also starts a comment.
pub fn strip_comments(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Remove every `'` and `"` character, wherever it appears.
pub fn strip_quotes(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\'' | '"')).collect()
}

/// Whether `line` opens a multi-line text field (`;`, `'''` or `"""`).
pub fn is_continuation(line: &str) -> bool {
    text_field_delimiter(line).is_some()
}

/// The text-field delimiter that `line` starts with, if any.
pub fn text_field_delimiter(line: &str) -> Option<&'static str> {
    let line = line.trim_start();
    TEXT_FIELD_DELIMITERS
        .into_iter()
        .find(|d| line.starts_with(d))
}

pub fn is_key(line: &str) -> bool {
    line.trim_start().starts_with('_')
}

/// Not a key and not a `loop_` delimiter.
pub fn is_data(line: &str) -> bool {
    let line = line.trim();
    !line.starts_with('_') && patterns::loop_delimiter(line).is_none()
}

/// Wrap the payload of a text field in quotes so it tokenizes as one value.
///
/// Single quotes are used unless the payload already contains one, in which
/// case double quotes are used. A payload containing both kinds cannot be
/// represented faithfully, which is reported alongside the best-effort fold.
pub fn quote_text_field(payload: &str) -> (String, Option<DiagnosticKind>) {
    let has_single = payload.contains('\'');
    let has_double = payload.contains('"');
    let quote = if has_single { '"' } else { '\'' };
    let folded = format!("{quote}{payload}{quote}");
    let warning = (has_single && has_double).then_some(DiagnosticKind::AmbiguousQuoteFold);
    (folded, warning)
}

/// Classify a single physical line that is not part of a text field.
pub fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if is_continuation(line) {
        return LineKind::Continuation;
    }
    let stripped = strip_comments(line);
    if stripped.is_empty() {
        return LineKind::Comment;
    }
    if let Some(name) = patterns::block_delimiter(stripped) {
        return LineKind::BlockMarker {
            name: name.to_string(),
        };
    }
    if let Some(inline) = patterns::loop_delimiter(stripped) {
        return LineKind::LoopMarker {
            inline: inline.to_string(),
        };
    }
    if is_key(stripped) {
        LineKind::Key
    } else {
        LineKind::Data
    }
}

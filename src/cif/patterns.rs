//! The fixed pattern table used to classify and split logical lines.
//!
//! Every pattern is compiled once, on first use. All matching is line-local:
//! text fields spanning several physical lines are folded by
//! [`Lines`](super::lines::Lines) before any pattern sees them.

use once_cell::sync::Lazy;
use regex::Regex;

/// A data name: leading underscore, then word characters plus `.`, `*`, `-`
/// and `/`, optionally followed by bracketed array indices such as `[3]`.
const NAME: &str = r"_[\w.*/\-]+(?:\[\d+\])*";

static BLOCK_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i:data_)(\S*)").unwrap());

static LOOP_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:loop_)(?:[ \t]+(.*))?$").unwrap());

static KEY_VALUE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^({NAME})[ \t]+(-?\d+\.?\d*)(?:\(\d+\))?[ \t]*$"
    ))
    .unwrap()
});

static KEY_VALUE_GENERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({NAME})[ \t]+(.+)$")).unwrap());

static KEY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^{NAME}$")).unwrap());

static DATA_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'[^']*'|"[^"]*"|[^'"\s]+"#).unwrap());

/// Name of a `data_<name>` block delimiter, if `line` is one.
pub fn block_delimiter(line: &str) -> Option<&str> {
    BLOCK_DELIMITER
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text following a `loop_` delimiter, if `line` is one. The returned
/// fragment is empty when the keyword stands alone.
pub fn loop_delimiter(line: &str) -> Option<&str> {
    let caps = LOOP_DELIMITER.captures(line)?;
    Some(caps.get(1).map_or("", |m| m.as_str().trim()))
}

/// Split a `_key value` line into its key and trimmed value.
///
/// With `numeric_only`, the value must be a signed decimal number (an
/// optional parenthesized precision is allowed and dropped).
pub fn key_value(line: &str, numeric_only: bool) -> Option<(&str, &str)> {
    let pattern = if numeric_only {
        &KEY_VALUE_NUMERIC
    } else {
        &KEY_VALUE_GENERAL
    };
    let caps = pattern.captures(line)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Whether `token` is a complete data name.
pub fn is_key_name(token: &str) -> bool {
    KEY_NAME.is_match(token)
}

/// Column labels declared on a loop header line.
pub fn key_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace().filter(|t| is_key_name(t))
}

/// Split a data line into fields: single-quoted runs, double-quoted runs, or
/// maximal runs of characters that are neither whitespace nor quotes. Quotes
/// are kept verbatim.
pub fn data_tokens(line: &str) -> Vec<&str> {
    DATA_TOKEN
        .find_iter(line)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .collect()
}

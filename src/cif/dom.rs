//! Parsed-file object model.
//!
//! A [`CifFile`] owns the key-value pairs and loop tables of the first data
//! block of one source, plus every diagnostic raised while parsing it.

use std::collections::HashMap;
use std::fmt;

use ndarray::Array2;
use once_cell::sync::Lazy;
use regex::Regex;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::line::strip_quotes;
use super::table::{RaggedTable, Table};

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.?\d*").unwrap());
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.()]").unwrap());

/// A key-value pair's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Value {
    /// The string content; `None` for numbers.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as `f64`.
    ///
    /// Strings are parsed after dropping quotes and any parenthesized
    /// uncertainty, so `"50.123(4)"` gives `50.123`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Str(s) => {
                let s = strip_quotes(s);
                let s = match s.find('(') {
                    Some(idx) => &s[..idx],
                    None => s.as_str(),
                };
                s.trim().parse().ok()
            }
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Float(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Cast a string to a number if it looks like one.
///
/// After trimming, the string may only hold digits, `.` and parentheses, and
/// must start with a digit. The leading run of digits with at most one
/// decimal point is cast, so `5.98(4)` gives `5.98` and `1.2.3` gives `1.2`.
/// A decimal point makes it a float, otherwise an integer. Anything else,
/// including signed numbers, is returned unchanged as a string.
pub fn try_cast_to_numeric(s: &str) -> Value {
    let trimmed = s.trim();
    if NON_NUMERIC.is_match(trimmed) {
        return Value::Str(s.to_string());
    }
    let Some(number) = NUMERIC_PREFIX.find(trimmed).map(|m| m.as_str()) else {
        return Value::Str(s.to_string());
    };
    let parsed = if number.contains('.') {
        number.parse().ok().map(Value::Float)
    } else {
        number.parse().ok().map(Value::Int)
    };
    parsed.unwrap_or_else(|| Value::Str(s.to_string()))
}

/// Key-value pairs and tables from a single CIF data block.
#[derive(Debug, Clone, Default)]
pub struct CifFile {
    pub(crate) block_name: Option<String>,
    pub(crate) pairs: Vec<(String, Value)>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) tables: Vec<Table>,
    pub(crate) ragged: Vec<RaggedTable>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) cast_values: bool,
}

impl PartialEq for CifFile {
    /// Structural equality of the parsed data; diagnostics are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.block_name == other.block_name
            && self.pairs == other.pairs
            && self.tables == other.tables
            && self.ragged == other.ragged
            && self.cast_values == other.cast_values
    }
}

impl CifFile {
    /// Name of the data block, from its `data_<name>` line.
    pub fn block_name(&self) -> Option<&str> {
        self.block_name.as_deref()
    }

    /// All pairs, in order of first appearance.
    pub fn pairs(&self) -> &[(String, Value)] {
        &self.pairs
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    /// Insert or overwrite a pair. An overwritten key keeps its position.
    pub(crate) fn upsert(&mut self, key: &str, value: Value) {
        match self.index.get(key) {
            Some(&idx) => self.pairs[idx].1 = value,
            None => {
                self.index.insert(key.to_string(), self.pairs.len());
                self.pairs.push((key.to_string(), value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&idx| &self.pairs[idx].1)
    }

    /// Look up several keys at once; missing keys give `None` in their slot.
    pub fn get_many<S: AsRef<str>>(&self, keys: &[S]) -> Vec<Option<&Value>> {
        keys.iter().map(|k| self.get(k.as_ref())).collect()
    }

    pub fn cast_values(&self) -> bool {
        self.cast_values
    }

    /// Turn on numeric casting of every stored value.
    ///
    /// Casting happens in place, one value at a time, and cannot be undone:
    /// asking to turn it back off leaves the data as it is and returns a
    /// [`DiagnosticKind::CastNotReversible`] warning.
    pub fn set_cast_values(&mut self, cast: bool) -> Option<Diagnostic> {
        if !cast {
            let was_cast = self.cast_values;
            self.cast_values = false;
            return was_cast
                .then(|| Diagnostic::warning(DiagnosticKind::CastNotReversible, None));
        }
        for (_, value) in &mut self.pairs {
            if let Value::Str(s) = value {
                *value = try_cast_to_numeric(&strip_quotes(s));
            }
        }
        self.cast_values = true;
        None
    }

    /// Tables in the order they appear in the file.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Column labels of every table.
    pub fn table_labels(&self) -> Vec<&[String]> {
        self.tables.iter().map(Table::labels).collect()
    }

    /// Loops kept despite an unresolvable shape
    /// ([`ShapePolicy::Retain`](super::parse::ShapePolicy::Retain) only).
    pub fn ragged_tables(&self) -> &[RaggedTable] {
        &self.ragged
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The first table declaring `label`.
    pub fn find_table(&self, label: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.contains(label))
    }

    /// Extract columns by label.
    ///
    /// Every table holding at least one requested label contributes one
    /// array, in table discovery order; labels found nowhere are ignored.
    /// When all matches fall in a single table, its columns follow the order
    /// of `labels`. When they span several tables, each array keeps the
    /// column order the file declared.
    pub fn columns<S: AsRef<str>>(&self, labels: &[S]) -> Vec<Array2<String>> {
        let matching: Vec<&Table> = self
            .tables
            .iter()
            .filter(|t| labels.iter().any(|l| t.contains(l.as_ref())))
            .collect();

        if let [table] = matching.as_slice() {
            return vec![table.select(labels)];
        }

        matching
            .into_iter()
            .map(|table| {
                let native: Vec<&str> = table
                    .labels()
                    .iter()
                    .map(String::as_str)
                    .filter(|l| labels.iter().any(|r| r.as_ref() == *l))
                    .collect();
                table.select(native.as_slice())
            })
            .collect()
    }
}

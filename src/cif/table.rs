//! Loop tables and the builder that assembles them.
//!
//! A table is a column-labeled 2-D array of strings. Cells keep every
//! character of the source token verbatim, quotes and precision suffixes
//! included; numeric views are produced on request with [`cast_to_f64`].

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::diagnostics::DiagnosticKind;

/// One parsed `loop_` construct.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    labels: Vec<String>,
    data: Array2<String>,
}

/// The raw rows of a loop whose token count did not fit its header.
///
/// Only produced when parsing with
/// [`ShapePolicy::Retain`](super::parse::ShapePolicy::Retain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaggedTable {
    pub labels: Vec<String>,
    /// Tokens grouped by the logical line they came from.
    pub rows: Vec<Vec<String>>,
    /// Line of the `loop_` keyword.
    pub line: usize,
}

impl RaggedTable {
    pub fn n_elements(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Why a loop could not be turned into a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("loop header declares no columns")]
    NoColumns,
    #[error("duplicate column label {0}")]
    DuplicateColumn(String),
    #[error("{elements} items cannot fill {columns} columns")]
    ShapeMismatch { elements: usize, columns: usize },
}

impl TableError {
    /// The diagnostic to report for this failure, if any. Header-less loops
    /// are dropped silently.
    pub fn into_diagnostic(self, table: usize) -> Option<DiagnosticKind> {
        match self {
            TableError::NoColumns => None,
            TableError::DuplicateColumn(label) => {
                Some(DiagnosticKind::DuplicateColumn { table, label })
            }
            TableError::ShapeMismatch { elements, columns } => Some(DiagnosticKind::ShapeMismatch {
                table,
                elements,
                columns,
            }),
        }
    }
}

/// Errors from casting table cells to numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot cast {text:?} at row {row}, column {column} to a float")]
pub struct CastError {
    pub row: usize,
    pub column: usize,
    pub text: String,
}

impl Table {
    /// Validate a loop header against its body tokens and reshape the tokens
    /// row-major into a table.
    pub fn build(labels: Vec<String>, rows: &[Vec<String>]) -> Result<Self, TableError> {
        let n_cols = labels.len();
        if n_cols == 0 {
            return Err(TableError::NoColumns);
        }

        let mut seen = HashSet::with_capacity(n_cols);
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(TableError::DuplicateColumn(dup.clone()));
        }

        let tokens: Vec<String> = rows.iter().flatten().cloned().collect();
        let n_elements = tokens.len();
        if n_elements % n_cols != 0 {
            return Err(TableError::ShapeMismatch {
                elements: n_elements,
                columns: n_cols,
            });
        }

        let data = Array2::from_shape_vec((n_elements / n_cols, n_cols), tokens).map_err(|_| {
            TableError::ShapeMismatch {
                elements: n_elements,
                columns: n_cols,
            }
        })?;
        Ok(Self { labels, data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Position of a column label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.column_index(label).is_some()
    }

    /// One column by label.
    pub fn column(&self, label: &str) -> Option<ArrayView1<'_, String>> {
        let idx = self.column_index(label)?;
        Some(self.data.column(idx))
    }

    /// The whole table as an unlabeled array view.
    pub fn data(&self) -> ArrayView2<'_, String> {
        self.data.view()
    }

    /// An owned, unlabeled copy of the whole table.
    pub fn to_array(&self) -> Array2<String> {
        self.data.clone()
    }

    /// Copy out the named columns in the order given. Labels not in this
    /// table are skipped.
    pub fn select<S: AsRef<str>>(&self, labels: &[S]) -> Array2<String> {
        let indices: Vec<usize> = labels
            .iter()
            .filter_map(|l| self.column_index(l.as_ref()))
            .collect();
        self.data.select(Axis(1), &indices)
    }

    /// Length of the longest cell, i.e. the width a fixed-width string
    /// layout would need.
    pub fn max_width(&self) -> usize {
        self.data.iter().map(|s| s.chars().count()).max().unwrap_or(0)
    }

    /// All cells cast to `f64`; see [`cast_to_f64`].
    pub fn to_f64(&self) -> Result<Array2<f64>, CastError> {
        cast_to_f64(self.data.view())
    }
}

/// Cast string cells to `f64`, dropping everything from the first `(`
/// (the standard-uncertainty suffix, e.g. `5.98(4)` becomes `5.98`).
pub fn cast_to_f64(cells: ArrayView2<'_, String>) -> Result<Array2<f64>, CastError> {
    let mut out = Array2::zeros(cells.raw_dim());
    for ((row, column), text) in cells.indexed_iter() {
        let number = match text.find('(') {
            Some(idx) => &text[..idx],
            None => text.as_str(),
        };
        out[[row, column]] = number.trim().parse().map_err(|_| CastError {
            row,
            column,
            text: text.clone(),
        })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn symmetry_table() -> Table {
        Table::build(
            strings(&["_symmetry_equiv_pos_site_id", "_symmetry_equiv_pos_as_xyz"]),
            &[strings(&["1", "x,y,z"]), strings(&["2", "-x,y,-z"])],
        )
        .unwrap()
    }

    #[test]
    fn builds_rectangular_table() {
        let table = symmetry_table();
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.ncols(), 2);
        assert_eq!(
            table.labels(),
            ["_symmetry_equiv_pos_site_id", "_symmetry_equiv_pos_as_xyz"]
        );
        let xyz: Vec<_> = table
            .column("_symmetry_equiv_pos_as_xyz")
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(xyz, ["x,y,z", "-x,y,-z"]);
        assert!(table.column("_missing").is_none());
    }

    #[test]
    fn rows_are_reflowed_by_token_order() {
        // Tokens need not line up with physical rows.
        let table = Table::build(
            strings(&["_a", "_b", "_c"]),
            &[strings(&["1", "2"]), strings(&["3", "4", "5", "6"])],
        )
        .unwrap();
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.data()[[1, 0]], "4");
        assert_eq!(table.data()[[0, 2]], "3");
    }

    #[test]
    fn rejects_empty_header() {
        let err = Table::build(Vec::new(), &[strings(&["1"])]).unwrap_err();
        assert_eq!(err, TableError::NoColumns);
        assert_eq!(err.into_diagnostic(1), None);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let err = Table::build(strings(&["_a", "_b", "_a"]), &[strings(&["1", "2", "3"])])
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("_a".into()));
    }

    #[test]
    fn rejects_ragged_body() {
        let err = Table::build(strings(&["_a", "_b"]), &[strings(&["1", "2", "3"])]).unwrap_err();
        assert_eq!(
            err,
            TableError::ShapeMismatch {
                elements: 3,
                columns: 2
            }
        );
        assert_eq!(
            err.into_diagnostic(4),
            Some(DiagnosticKind::ShapeMismatch {
                table: 4,
                elements: 3,
                columns: 2
            })
        );
    }

    #[test]
    fn empty_body_gives_zero_rows() {
        let table = Table::build(strings(&["_a", "_b"]), &[]).unwrap();
        assert_eq!(table.nrows(), 0);
        assert_eq!(table.ncols(), 2);
        assert_eq!(table.max_width(), 0);
    }

    #[test]
    fn select_follows_requested_order() {
        let table = symmetry_table();
        let selected = table.select(&["_symmetry_equiv_pos_as_xyz", "_nope", "_symmetry_equiv_pos_site_id"]);
        assert_eq!(selected.shape(), &[2, 2]);
        assert_eq!(selected[[0, 0]], "x,y,z");
        assert_eq!(selected[[1, 1]], "2");
    }

    #[test]
    fn width_is_longest_cell() {
        assert_eq!(symmetry_table().max_width(), 7);
    }

    #[test]
    fn float_cast_strips_precision() {
        let table = Table::build(
            strings(&["_x", "_y"]),
            &[strings(&["0.5", "5.98(4)"]), strings(&["-0.125", "12"])],
        )
        .unwrap();
        let values = table.to_f64().unwrap();
        assert_eq!(values[[0, 1]], 5.98);
        assert_eq!(values[[1, 0]], -0.125);
        assert_eq!(values[[1, 1]], 12.0);
    }

    #[test]
    fn float_cast_reports_position() {
        let err = symmetry_table().to_f64().unwrap_err();
        assert_eq!(
            err,
            CastError {
                row: 0,
                column: 1,
                text: "x,y,z".into()
            }
        );
    }
}

//! CIF line parser.
//!
//! A single forward pass over logical lines drives a three-state machine:
//! `Scanning` between constructs, `LoopHeader` while collecting column labels
//! after `loop_`, and `LoopBody` while collecting row tokens. Only the first
//! data block is read. Lines that match nothing are ignored.

use std::fs;
use std::io::Read;
use std::path::Path;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::dom::{try_cast_to_numeric, CifFile, Value};
use super::line::{strip_quotes, LineKind};
use super::lines::{Lines, LogicalLine};
use super::patterns;
use super::table::{RaggedTable, Table, TableError};

/// Errors that can occur while reading CIF input.
#[derive(Debug, thiserror::Error)]
pub enum CifParseError {
    #[error("failed to read CIF input: {0}")]
    Io(#[from] std::io::Error),
}

/// What to do with a loop whose token count is not a multiple of its
/// column count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapePolicy {
    /// Drop the loop and report a diagnostic.
    #[default]
    Discard,
    /// Report a diagnostic and keep the raw rows in
    /// [`CifFile::ragged_tables`].
    Retain,
}

/// Parser settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Cast numeric-looking pair values to integers and floats.
    pub cast_values: bool,
    pub shape_policy: ShapePolicy,
    /// Only accept pairs whose value is a signed decimal number.
    pub numeric_pairs_only: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast_values(mut self, cast: bool) -> Self {
        self.cast_values = cast;
        self
    }

    pub fn shape_policy(mut self, policy: ShapePolicy) -> Self {
        self.shape_policy = policy;
        self
    }

    pub fn numeric_pairs_only(mut self, numeric_only: bool) -> Self {
        self.numeric_pairs_only = numeric_only;
        self
    }
}

/// Parse CIF text with default options.
pub fn parse(input: &str) -> CifFile {
    parse_with(input, ParseOptions::default())
}

/// Parse CIF text.
pub fn parse_with(input: &str, options: ParseOptions) -> CifFile {
    Parser::new(input, options).run()
}

/// Parse CIF text given as separate lines.
pub fn parse_lines<I, S>(lines: I, options: ParseOptions) -> CifFile
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = lines
        .into_iter()
        .map(|l| l.as_ref().trim_end_matches(['\r', '\n']).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    parse_with(&joined, options)
}

/// Read and parse a CIF file with default options.
pub fn parse_file(path: impl AsRef<Path>) -> Result<CifFile, CifParseError> {
    parse_file_with(path, ParseOptions::default())
}

/// Read and parse a CIF file.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn parse_file_with(
    path: impl AsRef<Path>,
    options: ParseOptions,
) -> Result<CifFile, CifParseError> {
    let input = fs::read_to_string(path.as_ref())?;
    Ok(parse_with(&input, options))
}

/// Read CIF text to the end of `reader` and parse it.
pub fn parse_reader<R: Read>(reader: R) -> Result<CifFile, CifParseError> {
    parse_reader_with(reader, ParseOptions::default())
}

pub fn parse_reader_with<R: Read>(
    mut reader: R,
    options: ParseOptions,
) -> Result<CifFile, CifParseError> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    Ok(parse_with(&input, options))
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    LoopHeader,
    LoopBody,
}

/// A loop under construction.
#[derive(Debug)]
struct PendingLoop {
    line: usize,
    labels: Vec<String>,
    rows: Vec<Vec<String>>,
    /// A blank line seen in the header, not yet known to split it.
    blank: Option<usize>,
    /// A blank line that did split two header keys.
    broken_at: Option<usize>,
}

impl PendingLoop {
    fn new(line: usize) -> Self {
        Self {
            line,
            labels: Vec::new(),
            rows: Vec::new(),
            blank: None,
            broken_at: None,
        }
    }
}

struct Parser<'a> {
    lines: Lines<'a>,
    options: ParseOptions,
    state: State,
    pending: Option<PendingLoop>,
    file: CifFile,
    seen_block: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, options: ParseOptions) -> Self {
        let file = CifFile {
            cast_values: options.cast_values,
            ..CifFile::default()
        };
        Self {
            lines: Lines::new(input),
            options,
            state: State::Scanning,
            pending: None,
            file,
            seen_block: false,
        }
    }

    fn run(mut self) -> CifFile {
        tracing::debug!(options = ?self.options, "parsing CIF input");

        while let Some(line) = self.lines.next() {
            let keep_going = match self.state {
                State::Scanning => self.scan(line),
                State::LoopHeader => self.header(line),
                State::LoopBody => self.body(line),
            };
            if !keep_going {
                break;
            }
        }
        self.finish_loop();

        let mut file = self.file;
        file.diagnostics.extend(self.lines.take_diagnostics());
        file.diagnostics.sort_by_key(|d| d.line);
        tracing::debug!(
            pairs = file.pairs.len(),
            tables = file.tables.len(),
            diagnostics = file.diagnostics.len(),
            "parsed CIF input"
        );
        file
    }

    /// Handle one line between constructs. Returns `false` to stop reading.
    fn scan(&mut self, line: LogicalLine) -> bool {
        match line.kind {
            LineKind::Blank | LineKind::Comment | LineKind::Data | LineKind::Continuation => {}
            LineKind::BlockMarker { name } => {
                if self.seen_block {
                    tracing::debug!(block = %name, line = line.number, "ignoring further data blocks");
                    return false;
                }
                self.seen_block = true;
                self.file.block_name = Some(name);
            }
            LineKind::Key => self.key_value(&line.text),
            LineKind::LoopMarker { inline } => {
                let mut pending = PendingLoop::new(line.number);
                if !inline.is_empty() {
                    if !inline.starts_with('_') {
                        // Not a loop header after all.
                        return true;
                    }
                    pending
                        .labels
                        .extend(patterns::key_tokens(&inline).map(str::to_string));
                }
                self.pending = Some(pending);
                self.state = State::LoopHeader;
            }
        }
        true
    }

    fn key_value(&mut self, text: &str) {
        if let Some((key, value)) = patterns::key_value(text, self.options.numeric_pairs_only) {
            let value = self.make_value(value);
            self.file.upsert(key, value);
            return;
        }

        // A bare key may take its value from a text field on the next lines.
        if !patterns::is_key_name(text) || self.options.numeric_pairs_only {
            return;
        }
        while let Some(next) = self.lines.next() {
            match next.kind {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Continuation => {
                    let value = self.make_value(&next.text);
                    self.file.upsert(text, value);
                    return;
                }
                _ => {
                    self.lines.push_back(next);
                    return;
                }
            }
        }
    }

    fn make_value(&self, raw: &str) -> Value {
        if self.file.cast_values {
            try_cast_to_numeric(&strip_quotes(raw))
        } else {
            Value::Str(raw.trim().to_string())
        }
    }

    fn header(&mut self, line: LogicalLine) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            self.state = State::Scanning;
            return true;
        };
        match line.kind {
            LineKind::Comment => {}
            LineKind::Blank => {
                pending.blank.get_or_insert(line.number);
            }
            LineKind::Key => {
                if let Some(blank) = pending.blank.take() {
                    pending.broken_at.get_or_insert(blank);
                }
                pending
                    .labels
                    .extend(patterns::key_tokens(&line.text).map(str::to_string));
            }
            LineKind::Data | LineKind::Continuation => {
                self.state = State::LoopBody;
                return self.body(line);
            }
            LineKind::LoopMarker { .. } | LineKind::BlockMarker { .. } => {
                return self.end_loop(line);
            }
        }
        true
    }

    fn body(&mut self, line: LogicalLine) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            self.state = State::Scanning;
            return true;
        };
        match line.kind {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Data => {
                let tokens: Vec<String> = patterns::data_tokens(&line.text)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                if !tokens.is_empty() {
                    pending.rows.push(tokens);
                }
            }
            // A text field belongs to the row it follows.
            LineKind::Continuation => {
                let mut cells = vec![line.text];
                cells.extend(line.trailing);
                match pending.rows.last_mut() {
                    Some(row) => row.extend(cells),
                    None => pending.rows.push(cells),
                }
            }
            LineKind::Key | LineKind::LoopMarker { .. } | LineKind::BlockMarker { .. } => {
                return self.end_loop(line);
            }
        }
        true
    }

    /// Close the current loop and hand `line` back to the scanner.
    fn end_loop(&mut self, line: LogicalLine) -> bool {
        self.finish_loop();
        self.scan(line)
    }

    fn finish_loop(&mut self) {
        self.state = State::Scanning;
        let Some(pending) = self.pending.take() else {
            return;
        };

        if let Some(blank) = pending.broken_at {
            tracing::debug!(line = pending.line, "discarding loop with split header");
            self.file.diagnostics.push(Diagnostic::error(
                DiagnosticKind::BlankLineInLoopHeader,
                Some(blank),
            ));
            return;
        }

        let index = self.file.tables.len() + 1;
        match Table::build(pending.labels.clone(), &pending.rows) {
            Ok(table) => {
                tracing::trace!(
                    line = pending.line,
                    rows = table.nrows(),
                    columns = table.ncols(),
                    "built table"
                );
                self.file.tables.push(table);
            }
            Err(err) => {
                tracing::debug!(line = pending.line, error = %err, "discarding loop");
                let retain = matches!(err, TableError::ShapeMismatch { .. })
                    && self.options.shape_policy == ShapePolicy::Retain;
                if let Some(kind) = err.into_diagnostic(index) {
                    self.file
                        .diagnostics
                        .push(Diagnostic::warning(kind, Some(pending.line)));
                }
                if retain {
                    self.file.ragged.push(RaggedTable {
                        labels: pending.labels,
                        rows: pending.rows,
                        line: pending.line,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
data_example
# Key-value pairs describing the unit cell:
_cell_length_a  5.40
_cell_length_b  3.43
_cell_length_c  5.08
_cell_angle_alpha  90.0
_cell_angle_beta  132.3
_cell_angle_gamma  90.0

# A table with two columns and eight rows:
loop_
_symmetry_equiv_pos_site_id
_symmetry_equiv_pos_as_xyz
1  x,y,z
2  -x,y,-z
3  -x,-y,-z
4  x,-y,z
5  x+1/2,y+1/2,z
6  -x+1/2,y+1/2,-z
7  -x+1/2,-y+1/2,-z
8  x+1/2,-y+1/2,z

_symmetry_space_group_name_H-M  'C2 / m' # One more key-value pair
";

    #[test]
    fn key_value_pairs() {
        let cif = parse(SIMPLE);
        assert_eq!(cif.block_name(), Some("example"));
        assert_eq!(cif.get("_cell_length_a"), Some(&Value::from("5.40")));
        assert_eq!(cif.get("_cell_angle_beta"), Some(&Value::from("132.3")));
        assert_eq!(
            cif.get("_symmetry_space_group_name_H-M"),
            Some(&Value::from("'C2 / m'"))
        );
        assert_eq!(cif.pairs().len(), 7);
        assert!(cif.diagnostics().is_empty());
    }

    #[test]
    fn cast_at_parse_time() {
        let cif = parse_with(SIMPLE, ParseOptions::new().cast_values(true));
        assert!(cif.cast_values());
        assert_eq!(cif.get("_cell_length_a"), Some(&Value::Float(5.40)));
        assert_eq!(
            cif.get("_symmetry_space_group_name_H-M"),
            Some(&Value::from("C2 / m"))
        );
    }

    #[test]
    fn loop_table() {
        let cif = parse(SIMPLE);
        assert_eq!(cif.tables().len(), 1);
        let table = &cif.tables()[0];
        assert_eq!(table.nrows(), 8);
        assert_eq!(
            table.labels(),
            ["_symmetry_equiv_pos_site_id", "_symmetry_equiv_pos_as_xyz"]
        );
        let xyz = table.column("_symmetry_equiv_pos_as_xyz").unwrap();
        assert_eq!(xyz[0], "x,y,z");
        assert_eq!(xyz[7], "x+1/2,-y+1/2,z");
    }

    #[test]
    fn comment_truncates_value() {
        let cif = parse("_key value # trailing\n");
        assert_eq!(cif.get("_key"), Some(&Value::from("value")));
    }

    #[test]
    fn last_write_wins() {
        let cif = parse("_a first\nloop_\n_b\n1\n2\n_a second\n");
        assert_eq!(cif.get("_a"), Some(&Value::from("second")));
        assert_eq!(cif.tables()[0].nrows(), 2);
    }

    #[test]
    fn inline_loop_key() {
        let cif = parse("loop_ _a\n_b\n1 2\n3 4\n");
        assert_eq!(cif.tables()[0].labels(), ["_a", "_b"]);
        assert_eq!(cif.tables()[0].nrows(), 2);
    }

    #[test]
    fn loop_with_non_key_fragment_is_ignored() {
        let cif = parse("loop_ junk\n_a 1\n");
        assert!(cif.tables().is_empty());
        assert_eq!(cif.get("_a"), Some(&Value::from("1")));
    }

    #[test]
    fn shape_mismatch_is_discarded() {
        let cif = parse("loop_\n_a\n_b\n1 2\n3\n_after x\n");
        assert!(cif.tables().is_empty());
        assert!(cif.ragged_tables().is_empty());
        assert_eq!(
            cif.diagnostics()[0].kind,
            DiagnosticKind::ShapeMismatch {
                table: 1,
                elements: 3,
                columns: 2
            }
        );
        assert_eq!(cif.diagnostics()[0].line, Some(1));
        assert_eq!(cif.get("_after"), Some(&Value::from("x")));
    }

    #[test]
    fn shape_mismatch_can_be_retained() {
        let options = ParseOptions::new().shape_policy(ShapePolicy::Retain);
        let cif = parse_with("loop_\n_a\n_b\n1 2\n3\n", options);
        assert!(cif.tables().is_empty());
        let ragged = &cif.ragged_tables()[0];
        assert_eq!(ragged.labels, ["_a", "_b"]);
        assert_eq!(ragged.rows, vec![vec!["1", "2"], vec!["3"]]);
        assert_eq!(ragged.n_elements(), 3);
        assert_eq!(cif.diagnostics().len(), 1);
    }

    #[test]
    fn duplicate_labels_are_discarded() {
        let cif = parse("loop_\n_a\n_a\n1 2\n");
        assert!(cif.tables().is_empty());
        assert_eq!(
            cif.diagnostics()[0].kind,
            DiagnosticKind::DuplicateColumn {
                table: 1,
                label: "_a".into()
            }
        );
    }

    #[test]
    fn blank_line_splitting_header_is_an_error() {
        let cif = parse("loop_\n_a\n\n_b\n1 2\n_next ok\nloop_\n_c\n5\n");
        assert_eq!(cif.tables().len(), 1);
        assert_eq!(cif.tables()[0].labels(), ["_c"]);
        assert_eq!(cif.get("_next"), Some(&Value::from("ok")));
        let diagnostic = &cif.diagnostics()[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::BlankLineInLoopHeader);
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.line, Some(3));
    }

    #[test]
    fn blank_line_before_body_is_fine() {
        let cif = parse("loop_\n_a\n_b\n\n1 2\n\n3 4\n");
        assert_eq!(cif.tables()[0].nrows(), 2);
        assert!(cif.diagnostics().is_empty());
    }

    #[test]
    fn comment_inside_header_is_fine() {
        let cif = parse("loop_\n_a\n# about b\n_b\n1 2\n");
        assert_eq!(cif.tables()[0].labels(), ["_a", "_b"]);
    }

    #[test]
    fn empty_loop_is_skipped() {
        let cif = parse("loop_\n1 2 3\n_a b\n");
        assert!(cif.tables().is_empty());
        assert!(cif.diagnostics().is_empty());
        assert_eq!(cif.get("_a"), Some(&Value::from("b")));
    }

    #[test]
    fn header_only_loop_has_no_rows() {
        let cif = parse("loop_\n_a\n_b\n");
        assert_eq!(cif.tables()[0].nrows(), 0);
    }

    #[test]
    fn consecutive_loops() {
        let cif = parse("loop_\n_a\n1\n2\nloop_\n_b\n_c\nx y\n");
        assert_eq!(cif.tables().len(), 2);
        let labels = cif.table_labels();
        assert_eq!(labels[0], ["_a"]);
        assert_eq!(labels[1], ["_b", "_c"]);
    }

    #[test]
    fn text_field_value() {
        let input = "_publ_section_title\n;\nA long title\n over lines\n;\n_next 1\n";
        let cif = parse(input);
        assert_eq!(
            cif.get("_publ_section_title"),
            Some(&Value::from("'A long title over lines'"))
        );
        assert_eq!(cif.get("_next"), Some(&Value::from("1")));
    }

    #[test]
    fn text_field_in_loop_body() {
        let input = "loop_\n_id\n_note\n1\n;\nfirst note\n;\n2 'second note'\n";
        let cif = parse(input);
        let table = &cif.tables()[0];
        assert_eq!(table.nrows(), 2);
        let notes = table.column("_note").unwrap();
        assert_eq!(notes[0], "'first note'");
        assert_eq!(notes[1], "'second note'");
    }

    #[test]
    fn text_field_opens_loop_body() {
        let input = "loop_\n_note\n;\nonly value\n;\n";
        let cif = parse(input);
        assert_eq!(cif.tables()[0].column("_note").unwrap()[0], "'only value'");
    }

    #[test]
    fn text_field_after_blank_and_comment_lines() {
        let cif = parse("_title\n\n# the title\n;\nSpaced out\n;\n_next 1\n");
        assert_eq!(cif.get("_title"), Some(&Value::from("'Spaced out'")));
        assert_eq!(cif.get("_next"), Some(&Value::from("1")));
    }

    #[test]
    fn bare_key_without_field_leaves_next_line() {
        let cif = parse("_orphan\n\n_next 1\nloop_\n_a\nx\n");
        assert!(cif.get("_orphan").is_none());
        assert_eq!(cif.get("_next"), Some(&Value::from("1")));
        assert_eq!(cif.tables().len(), 1);
    }

    #[test]
    fn tokens_after_triple_quoted_cell() {
        let cif = parse("loop_\n_a\n_b\n\"\"\"x\"\"\" 2\n3 4\n");
        assert!(cif.diagnostics().is_empty());
        let table = &cif.tables()[0];
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column("_a").unwrap().to_vec(), ["'x'", "3"]);
        assert_eq!(table.column("_b").unwrap().to_vec(), ["2", "4"]);
    }

    #[test]
    fn cast_keeps_signed_values_as_strings() {
        let input = "_cell_angle_beta -10.12345\n_version 1.2.3\n_z +5\n";
        let cif = parse_with(input, ParseOptions::new().cast_values(true));
        assert_eq!(cif.get("_cell_angle_beta"), Some(&Value::from("-10.12345")));
        assert_eq!(cif.get("_version"), Some(&Value::Float(1.2)));
        assert_eq!(cif.get("_z"), Some(&Value::from("+5")));
    }

    #[test]
    fn second_block_is_not_processed() {
        let cif = parse("data_first\n_a 1\ndata_second\n_b 2\n");
        assert_eq!(cif.block_name(), Some("first"));
        assert_eq!(cif.get("_a"), Some(&Value::from("1")));
        assert!(cif.get("_b").is_none());
    }

    #[test]
    fn second_block_ends_open_loop() {
        let cif = parse("data_a\nloop_\n_x\n1\ndata_b\nloop_\n_y\n2\n");
        assert_eq!(cif.tables().len(), 1);
        assert_eq!(cif.tables()[0].labels(), ["_x"]);
    }

    #[test]
    fn numeric_only_pairs() {
        let options = ParseOptions::new().numeric_pairs_only(true);
        let cif = parse_with("_a 5.98(4)\n_b 'text'\n_c -2\n", options);
        assert_eq!(cif.get("_a"), Some(&Value::from("5.98")));
        assert!(cif.get("_b").is_none());
        assert_eq!(cif.get("_c"), Some(&Value::from("-2")));
    }

    #[test]
    fn noise_is_ignored() {
        let cif = parse("random words\n'quoted' # c\n;\n;\n_ok yes\n");
        assert_eq!(cif.pairs().len(), 1);
        assert_eq!(cif.get("_ok"), Some(&Value::from("yes")));
    }

    #[test]
    fn lines_input() {
        let lines = vec!["_a 1\r\n", "loop_\n", "_b\n", "x\n"];
        let cif = parse_lines(lines, ParseOptions::default());
        assert_eq!(cif.get("_a"), Some(&Value::from("1")));
        assert_eq!(cif.tables()[0].nrows(), 1);
    }

    #[test]
    fn reader_input() {
        let cif = parse_reader(SIMPLE.as_bytes()).unwrap();
        assert_eq!(cif, parse(SIMPLE));
    }

    #[test]
    fn missing_file() {
        let err = parse_file("/definitely/not/here.cif").unwrap_err();
        assert!(matches!(err, CifParseError::Io(_)));
    }

    #[test]
    fn reparse_is_identical() {
        assert_eq!(parse(SIMPLE), parse(SIMPLE));
    }

    #[test]
    fn empty_input() {
        let cif = parse("");
        assert!(cif.pairs().is_empty());
        assert!(cif.tables().is_empty());
        assert!(cif.block_name().is_none());
    }
}

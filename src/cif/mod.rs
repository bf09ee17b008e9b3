//! CIF parser, table builder and typed extractors.
//!
//! - **Parsing**: [`parse`] a CIF source into a [`CifFile`] holding key-value
//!   pairs and loop [`Table`]s, plus any [`Diagnostic`]s raised on the way.
//! - **Lookup**: [`CifFile::get`], [`CifFile::get_many`] and
//!   [`CifFile::columns`] pull data back out by key or column label.
//! - **Extractors**: [`UnitCell`], [`read_symmetry_operations`] and
//!   [`read_wyckoff_positions`] convert common categories to numbers.
//!
//! ```ignore
//! let cif = parsnip::cif::parse_file("structure.cif")?;
//! let a = cif.get("_cell_length_a");
//! let ops = cif.columns(&["_symmetry_equiv_pos_as_xyz"]);
//!
//! for warning in cif.diagnostics() {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod clean;
pub mod diagnostics;
pub mod dom;
pub mod extract;
pub mod line;
pub mod lines;
pub mod parse;
pub mod patterns;
pub mod table;

// Parsed data
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use dom::{try_cast_to_numeric, CifFile, Value};
pub use table::{cast_to_f64, CastError, RaggedTable, Table, TableError};

// Parser
pub use parse::{
    parse, parse_file, parse_file_with, parse_lines, parse_reader, parse_reader_with, parse_with,
    CifParseError, ParseOptions, ShapePolicy,
};

// Helpers and typed extractors
pub use clean::{remove_nondelimiting_whitespace, LineCleaner};
pub use extract::{
    read_symmetry_operations, read_wyckoff_positions, CellConvention, ExtractionError, UnitCell,
};
pub use line::{strip_comments, strip_quotes};

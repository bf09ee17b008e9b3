//! Lightweight reader for CIF (Crystallographic Information File) data.
//!
//! Parses the first data block of a CIF source into key-value pairs and
//! column-labeled loop tables. See [`cif`] for the full API.

pub mod cif;

pub use cif::{
    parse, parse_file, parse_with, CifFile, CifParseError, Diagnostic, DiagnosticKind,
    ParseOptions, ShapePolicy, Table, Value,
};

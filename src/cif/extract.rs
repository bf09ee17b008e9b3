//! Typed extractors over a parsed [`CifFile`].
//!
//! These pull commonly needed crystallographic quantities out of the untyped
//! pairs and tables. They only read and convert data; applying symmetry
//! operations to build a full unit cell is left to the caller.

use ndarray::Array2;
use once_cell::sync::Lazy;

use super::clean::LineCleaner;
use super::dom::{CifFile, Value};
use super::line::strip_quotes;
use super::table::{cast_to_f64, CastError};

const SYMMETRY_KEYS: [&str; 2] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
];

const FRACTIONAL_KEYS: [&str; 3] = [
    "_atom_site_fract_x",
    "_atom_site_fract_y",
    "_atom_site_fract_z",
];

/// Collapses `x, y, z` to `x,y,z`.
static OPERATION_CLEANER: Lazy<LineCleaner> =
    Lazy::new(|| LineCleaner::new(&[(r",\s+", ",")]).unwrap());

/// Errors from typed extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing required tag: {0}")]
    MissingTag(String),
    #[error("no table provides {0}")]
    MissingColumns(String),
    #[error("parse error in {tag}: expected float, got {value}")]
    ParseError { tag: String, value: String },
    #[error("cell angle {tag} = {value} is not between 0 and 180 degrees")]
    AngleOutOfRange { tag: String, value: f64 },
    #[error(transparent)]
    Cast(#[from] CastError),
}

/// Naming style of the unit cell keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellConvention {
    /// `_cell_length_a`, `_cell_angle_alpha`, ...
    #[default]
    Cif,
    /// `_cell.length_a`, `_cell.angle_alpha`, ...
    MmCif,
}

impl CellConvention {
    /// Keys for a, b, c, alpha, beta and gamma, in that order.
    pub fn keys(self) -> [&'static str; 6] {
        match self {
            CellConvention::Cif => [
                "_cell_length_a",
                "_cell_length_b",
                "_cell_length_c",
                "_cell_angle_alpha",
                "_cell_angle_beta",
                "_cell_angle_gamma",
            ],
            CellConvention::MmCif => [
                "_cell.length_a",
                "_cell.length_b",
                "_cell.length_c",
                "_cell.angle_alpha",
                "_cell.angle_beta",
                "_cell.angle_gamma",
            ],
        }
    }
}

/// Unit cell parameters: lengths in Angstroms, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    /// Read the six cell parameters using the given key convention.
    pub fn read(file: &CifFile, convention: CellConvention) -> Result<Self, ExtractionError> {
        let keys = convention.keys();
        let mut params = [0.0; 6];
        for (param, key) in params.iter_mut().zip(keys) {
            let value = file
                .get(key)
                .ok_or_else(|| ExtractionError::MissingTag(key.into()))?;
            *param = require_f64(value, key)?;
        }

        for (&angle, key) in params[3..].iter().zip(&keys[3..]) {
            if !(angle > 0.0 && angle < 180.0) {
                return Err(ExtractionError::AngleOutOfRange {
                    tag: key.to_string(),
                    value: angle,
                });
            }
        }

        let [a, b, c, alpha, beta, gamma] = params;
        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        })
    }

    pub fn lengths(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    pub fn angles(&self) -> [f64; 3] {
        [self.alpha, self.beta, self.gamma]
    }

    pub fn angles_in_radians(&self) -> [f64; 3] {
        self.angles().map(f64::to_radians)
    }
}

impl TryFrom<&CifFile> for UnitCell {
    type Error = ExtractionError;

    /// Core CIF keys first, then mmCIF keys.
    fn try_from(file: &CifFile) -> Result<Self, Self::Error> {
        match UnitCell::read(file, CellConvention::Cif) {
            Err(ExtractionError::MissingTag(_)) => UnitCell::read(file, CellConvention::MmCif),
            other => other,
        }
    }
}

fn require_f64(value: &Value, tag: &str) -> Result<f64, ExtractionError> {
    value.as_f64().ok_or_else(|| ExtractionError::ParseError {
        tag: tag.into(),
        value: value.to_string(),
    })
}

/// Symmetry operations in algebraic `x,y,z` form, quotes removed and
/// whitespace after commas collapsed.
pub fn read_symmetry_operations(file: &CifFile) -> Result<Vec<String>, ExtractionError> {
    let table = SYMMETRY_KEYS
        .iter()
        .find_map(|key| file.find_table(key).map(|t| (key, t)));
    let Some((key, table)) = table else {
        return Err(ExtractionError::MissingColumns(SYMMETRY_KEYS.join(" or ")));
    };
    let Some(column) = table.column(key) else {
        return Err(ExtractionError::MissingColumns(key.to_string()));
    };
    Ok(column
        .iter()
        .map(|op| OPERATION_CLEANER.apply(&strip_quotes(op)).into_owned())
        .collect())
}

/// Fractional coordinates of the symmetry-irreducible atom sites, as an
/// `N x 3` array.
pub fn read_wyckoff_positions(file: &CifFile) -> Result<Array2<f64>, ExtractionError> {
    let mut arrays = file.columns(&FRACTIONAL_KEYS);
    match arrays.pop() {
        Some(xyz) if arrays.is_empty() && xyz.ncols() == FRACTIONAL_KEYS.len() => {
            Ok(cast_to_f64(xyz.view())?)
        }
        _ => Err(ExtractionError::MissingColumns(FRACTIONAL_KEYS.join(", "))),
    }
}

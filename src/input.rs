//! Loading item data from JSON or YAML files.
//!
//! Two document shapes are accepted, tagged by `kind`:
//!
//! ```yaml
//! kind: raw
//! columns: [q1, q2, q3]
//! rows:
//!   - [1, 2, 3]
//!   - [2, null, 4]
//! ```
//!
//! ```json
//! {"kind": "correlation", "columns": ["q1", "q2"], "matrix": [[1.0, 0.4], [0.4, 1.0]]}
//! ```
//!
//! `columns` is optional; missing names default to `item_1`, `item_2`, ...

use crate::correlation::CorrelationMatrix;
use crate::matrix::{InputKind, ItemMatrix, ReliabilityError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading item data
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse YAML input: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unsupported input format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Invalid(#[from] ReliabilityError),
}

/// On-disk representation of an analysis input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemFile {
    /// Raw responses; `null` marks a missing cell
    Raw {
        #[serde(default)]
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Option<f64>>>,
    },
    /// Pre-computed correlation matrix
    Correlation {
        #[serde(default)]
        columns: Option<Vec<String>>,
        matrix: Vec<Vec<f64>>,
    },
}

impl ItemFile {
    /// Validate and convert into the boundary type
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind` for ragged, empty, or malformed data.
    pub fn into_input_kind(self) -> Result<InputKind, ReliabilityError> {
        match self {
            Self::Raw { columns, rows } => {
                let width = columns
                    .as_ref()
                    .map_or_else(|| rows.first().map_or(0, Vec::len), Vec::len);
                let names = columns.unwrap_or_else(|| ItemMatrix::default_names(width));
                Ok(InputKind::RawTable(ItemMatrix::from_rows(names, &rows)?))
            }
            Self::Correlation { columns, matrix } => {
                let names = columns.unwrap_or_else(|| ItemMatrix::default_names(matrix.len()));
                Ok(InputKind::CorrelationMatrix(CorrelationMatrix::new(
                    names, matrix,
                )?))
            }
        }
    }
}

/// Parse a JSON document into an input
///
/// # Errors
///
/// Returns an error if the JSON is malformed or the data is invalid.
pub fn parse_json(content: &str) -> Result<InputKind, InputError> {
    let file: ItemFile = serde_json::from_str(content)?;
    Ok(file.into_input_kind()?)
}

/// Parse a YAML document into an input
///
/// # Errors
///
/// Returns an error if the YAML is malformed or the data is invalid.
pub fn parse_yaml(content: &str) -> Result<InputKind, InputError> {
    let file: ItemFile = serde_yaml::from_str(content)?;
    Ok(file.into_input_kind()?)
}

/// Load an input file, choosing the parser by extension
///
/// # Errors
///
/// Returns an error for unreadable files, unknown extensions, parse failures,
/// or invalid data.
pub fn load_input<P: AsRef<Path>>(path: P) -> Result<InputKind, InputError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let input = match extension.as_deref() {
        Some("json") => parse_json(&std::fs::read_to_string(path)?)?,
        Some("yaml" | "yml") => parse_yaml(&std::fs::read_to_string(path)?)?,
        _ => return Err(InputError::UnsupportedFormat(path.display().to_string())),
    };

    tracing::debug!(
        path = %path.display(),
        kind = input.label(),
        items = input.n_items(),
        "Loaded input"
    );

    Ok(input)
}

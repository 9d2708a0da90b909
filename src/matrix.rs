//! Item score tables and the input boundary.
//!
//! An [`ItemMatrix`] holds N observations (rows) of M named items (columns).
//! Cells are `Option<f64>`; `None` marks a missing response. Every transform
//! returns a new matrix and leaves the receiver untouched.
//!
//! [`InputKind`] is the tagged boundary type: callers either hand over raw item
//! scores or an already aggregated correlation matrix, and the distinction is
//! resolved once, before any estimator runs.

use crate::correlation::CorrelationMatrix;
use thiserror::Error;

/// Errors raised by the reliability estimators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReliabilityError {
    /// Input is neither a rectangular numeric table nor a valid correlation matrix
    #[error("Invalid input: {0}")]
    InvalidInputKind(String),

    /// Fewer columns than the operation needs
    #[error("{operation} requires at least {required} columns, found {found}")]
    InsufficientColumns {
        operation: &'static str,
        required: usize,
        found: usize,
    },

    /// A statistic evaluated to a non-finite value
    #[error("Undefined statistic: {statistic} is not finite")]
    UndefinedStatistic { statistic: String },
}

/// Fail with [`ReliabilityError::UndefinedStatistic`] when `value` is NaN or infinite.
///
/// Estimators never call this themselves; it is the opt-in strict check.
///
/// # Errors
///
/// Returns `UndefinedStatistic` naming `statistic` if `value` is not finite.
pub fn ensure_finite(statistic: &str, value: f64) -> Result<f64, ReliabilityError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ReliabilityError::UndefinedStatistic {
            statistic: statistic.to_string(),
        })
    }
}

/// Rectangular table of item responses with named columns.
///
/// Constructors store `NaN` input as `None`, so an observed cell is always a
/// number. The one exception is [`ItemMatrix::standardized`], which writes
/// `Some(NaN)` for every observed cell of a zero-variance column; those cells
/// still count as observed and make the dependent statistics `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMatrix {
    names: Vec<String>,
    /// Column-major cell storage, one vector per item
    columns: Vec<Vec<Option<f64>>>,
    n_rows: usize,
}

impl ItemMatrix {
    /// Build a matrix from named columns.
    ///
    /// `NaN` cells are normalized to missing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind` if there are no columns, the name count does not
    /// match the column count, or the columns differ in length.
    pub fn from_columns<S: Into<String>>(
        names: Vec<S>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, ReliabilityError> {
        if columns.is_empty() {
            return Err(ReliabilityError::InvalidInputKind(
                "item table has no columns".to_string(),
            ));
        }
        if names.len() != columns.len() {
            return Err(ReliabilityError::InvalidInputKind(format!(
                "{} column names supplied for {} columns",
                names.len(),
                columns.len()
            )));
        }

        let n_rows = columns[0].len();
        if let Some((idx, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(ReliabilityError::InvalidInputKind(format!(
                "column {idx} has {} rows, expected {n_rows}",
                col.len()
            )));
        }

        let columns = columns
            .into_iter()
            .map(|col| col.into_iter().map(normalize_cell).collect())
            .collect();

        Ok(Self {
            names: names.into_iter().map(Into::into).collect(),
            columns,
            n_rows,
        })
    }

    /// Build a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind` for ragged rows, an empty header, or a header
    /// that does not match the row width.
    pub fn from_rows<S: Into<String>>(
        names: Vec<S>,
        rows: &[Vec<Option<f64>>],
    ) -> Result<Self, ReliabilityError> {
        let width = names.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ReliabilityError::InvalidInputKind(format!(
                "row {idx} has {} cells, expected {width}",
                row.len()
            )));
        }

        let columns = (0..width)
            .map(|c| rows.iter().map(|row| row[c]).collect())
            .collect();

        Self::from_columns(names, columns)
    }

    /// Build a matrix from dense numeric rows, treating `NaN` as missing.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ItemMatrix::from_rows`].
    pub fn from_f64_rows<S: Into<String>>(
        names: Vec<S>,
        rows: &[Vec<f64>],
    ) -> Result<Self, ReliabilityError> {
        let rows: Vec<Vec<Option<f64>>> = rows
            .iter()
            .map(|row| row.iter().copied().map(Some).collect())
            .collect();
        Self::from_rows(names, &rows)
    }

    /// Default column names (`item_1`, `item_2`, ...) for unnamed input
    #[must_use]
    pub fn default_names(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("item_{i}")).collect()
    }

    /// Number of observations
    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of items
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Item names in column order
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Cells of one item
    #[must_use]
    pub fn column(&self, index: usize) -> &[Option<f64>] {
        &self.columns[index]
    }

    /// Look up an item by name
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Observed (non-missing) values of one item, in row order
    #[must_use]
    pub fn observed(&self, index: usize) -> Vec<f64> {
        self.columns[index].iter().flatten().copied().collect()
    }

    /// Single cell
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.columns[col][row]
    }

    /// True when no cell is missing
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(|col| col.iter().all(Option::is_some))
    }

    /// Keep only rows in which every item was answered (row-wise deletion)
    #[must_use]
    pub fn complete_cases(&self) -> Self {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&r| self.columns.iter().all(|col| col[r].is_some()))
            .collect();

        if keep.len() < self.n_rows {
            tracing::debug!(
                dropped = self.n_rows - keep.len(),
                kept = keep.len(),
                "Dropped incomplete rows"
            );
        }

        let columns = self
            .columns
            .iter()
            .map(|col| keep.iter().map(|&r| col[r]).collect())
            .collect();

        Self {
            names: self.names.clone(),
            columns,
            n_rows: keep.len(),
        }
    }

    /// Z-score every column (zero mean, unit sample variance).
    ///
    /// Mean and standard deviation come from each column's observed values.
    /// Observed cells of a zero-variance column become `Some(NaN)` (not
    /// missing), which downstream statistics surface as undefined.
    #[must_use]
    pub fn standardized(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let observed: Vec<f64> = col.iter().flatten().copied().collect();
                let mean = crate::variance::mean(&observed);
                let sd = crate::variance::sample_variance(&observed).sqrt();
                col.iter().map(|cell| cell.map(|v| (v - mean) / sd)).collect()
            })
            .collect();

        Self {
            names: self.names.clone(),
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Copy of the matrix with one item removed
    #[must_use]
    pub fn without_column(&self, index: usize) -> Self {
        let keep: Vec<usize> = (0..self.n_cols()).filter(|&c| c != index).collect();
        self.select_columns(&keep)
    }

    /// Copy of the matrix restricted to `indices`, in the given order
    #[must_use]
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            n_rows: self.n_rows,
        }
    }

    /// Row-wise sums accumulated in column order; `None` for rows with a missing cell
    #[must_use]
    pub fn row_sums(&self) -> Vec<Option<f64>> {
        (0..self.n_rows)
            .map(|r| {
                self.columns
                    .iter()
                    .try_fold(0.0, |acc, col| col[r].map(|v| acc + v))
            })
            .collect()
    }
}

fn normalize_cell(cell: Option<f64>) -> Option<f64> {
    cell.filter(|v| !v.is_nan())
}

/// What the caller handed over, resolved once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    /// Raw item responses, one row per respondent
    RawTable(ItemMatrix),
    /// A pre-computed item correlation matrix, used as-is
    CorrelationMatrix(CorrelationMatrix),
}

impl InputKind {
    /// Number of items described by the input
    #[must_use]
    pub fn n_items(&self) -> usize {
        match self {
            Self::RawTable(matrix) => matrix.n_cols(),
            Self::CorrelationMatrix(cor) => cor.size(),
        }
    }

    /// Item names
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        match self {
            Self::RawTable(matrix) => matrix.column_names(),
            Self::CorrelationMatrix(cor) => cor.column_names(),
        }
    }

    /// Short label for reports and logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RawTable(_) => "raw",
            Self::CorrelationMatrix(_) => "correlation",
        }
    }

    /// Raw scores, for operations that cannot work from correlations alone
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind` when the input is a correlation matrix.
    pub fn as_table(&self) -> Result<&ItemMatrix, ReliabilityError> {
        match self {
            Self::RawTable(matrix) => Ok(matrix),
            Self::CorrelationMatrix(_) => Err(ReliabilityError::InvalidInputKind(
                "operation requires raw item scores, got a correlation matrix".to_string(),
            )),
        }
    }
}

impl From<ItemMatrix> for InputKind {
    fn from(matrix: ItemMatrix) -> Self {
        Self::RawTable(matrix)
    }
}

impl From<CorrelationMatrix> for InputKind {
    fn from(cor: CorrelationMatrix) -> Self {
        Self::CorrelationMatrix(cor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn sample() -> ItemMatrix {
        ItemMatrix::from_rows(
            vec!["a", "b", "c"],
            &[
                vec![Some(1.0), Some(2.0), Some(3.0)],
                vec![Some(2.0), None, Some(4.0)],
                vec![Some(3.0), Some(4.0), Some(5.0)],
                vec![None, Some(1.0), Some(2.0)],
            ],
        )
        .unwrap()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_from_rows_shape() {
        let m = sample();
        assert_eq!(m.n_rows(), 4);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.column_names(), &["a", "b", "c"]);
        assert_eq!(m.cell(1, 1), None);
        assert_eq!(m.cell(2, 0), Some(3.0));
    }

    #[test]
    fn test_from_rows_ragged_is_invalid() {
        let result = ItemMatrix::from_rows(
            vec!["a", "b"],
            &[vec![Some(1.0), Some(2.0)], vec![Some(1.0)]],
        );
        assert!(matches!(
            result,
            Err(ReliabilityError::InvalidInputKind(_))
        ));
    }

    #[test]
    fn test_from_columns_empty_is_invalid() {
        let result = ItemMatrix::from_columns(Vec::<String>::new(), vec![]);
        assert!(matches!(
            result,
            Err(ReliabilityError::InvalidInputKind(_))
        ));
    }

    #[test]
    fn test_from_columns_name_mismatch() {
        let result = ItemMatrix::from_columns(vec!["only"], vec![vec![Some(1.0)], vec![Some(2.0)]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_nan_becomes_missing() {
        let m = ItemMatrix::from_f64_rows(vec!["x", "y"], &[vec![1.0, f64::NAN]]).unwrap();
        assert_eq!(m.cell(0, 1), None);
        assert!(!m.is_complete());
    }

    #[test]
    fn test_default_names() {
        assert_eq!(ItemMatrix::default_names(2), vec!["item_1", "item_2"]);
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    #[test]
    fn test_complete_cases_drops_rows_with_any_missing() {
        let m = sample();
        let complete = m.complete_cases();
        assert_eq!(complete.n_rows(), 2);
        assert!(complete.is_complete());
        assert_eq!(complete.observed(0), vec![1.0, 3.0]);
        // Receiver untouched
        assert_eq!(m.n_rows(), 4);
    }

    #[test]
    fn test_without_column_preserves_order() {
        let m = sample().without_column(1);
        assert_eq!(m.column_names(), &["a", "c"]);
        assert_eq!(m.n_rows(), 4);
    }

    #[test]
    fn test_row_sums() {
        let sums = sample().row_sums();
        assert_eq!(sums, vec![Some(6.0), None, Some(12.0), None]);
    }

    #[test]
    fn test_standardized_has_zero_mean_unit_variance() {
        let m = ItemMatrix::from_f64_rows(vec!["x"], &[vec![2.0], vec![4.0], vec![6.0]]).unwrap();
        let z = m.standardized().observed(0);
        assert!((z[0] + 1.0).abs() < 1e-12);
        assert!(z[1].abs() < 1e-12);
        assert!((z[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_constant_column_is_nan() {
        let m = ItemMatrix::from_f64_rows(vec!["x"], &[vec![3.0], vec![3.0]]).unwrap();
        let z = m.standardized();
        assert!(z.column(0).iter().all(|c| c.is_some_and(f64::is_nan)));
        // Still observed, not missing
        assert_eq!(z.observed(0).len(), 2);
        assert!(z.is_complete());
    }

    // =========================================================================
    // Boundary
    // =========================================================================

    #[test]
    fn test_input_kind_as_table() {
        let input = InputKind::from(sample());
        assert_eq!(input.label(), "raw");
        assert_eq!(input.n_items(), 3);
        assert!(input.as_table().is_ok());
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("alpha", 0.8).unwrap(), 0.8);
        let err = ensure_finite("alpha", f64::NAN).unwrap_err();
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn test_error_display() {
        let err = ReliabilityError::InsufficientColumns {
            operation: "item reliability",
            required: 3,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("at least 3"));
        assert!(msg.contains("found 2"));
    }
}

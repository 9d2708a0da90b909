//! Pairwise item correlations.
//!
//! Supports Pearson, Spearman (average-tie ranks) and Kendall's tau-b.
//! Missing values are handled pairwise: each column pair uses the rows in
//! which both items were observed. Callers that need globally complete rows
//! (the reliability engine, mean inter-item correlation on raw data) filter
//! with [`ItemMatrix::complete_cases`] before calling in.

use crate::config::ConfigError;
use crate::matrix::{InputKind, ItemMatrix, ReliabilityError};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};
use std::fmt;

/// Tolerance for validating externally supplied correlation matrices
pub const CORRELATION_TOLERANCE: f64 = 1e-8;

/// Correlation coefficient to compute
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Product-moment correlation
    #[default]
    Pearson,
    /// Rank correlation (Pearson on average-tie ranks)
    Spearman,
    /// Kendall's tau-b
    Kendall,
}

impl CorrelationMethod {
    /// Lowercase name as used in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CorrelationMethod {
    type Err = ConfigError;

    /// Parse a correlation method name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMethod` for unknown names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            "kendall" | "kendall_tau" | "tau" => Ok(Self::Kendall),
            _ => Err(ConfigError::InvalidMethod(s.to_string())),
        }
    }
}

/// Symmetric item-by-item correlation matrix.
///
/// Serialized as `{columns, matrix}` with nested rows; deserialization goes
/// through [`CorrelationMatrix::new`] so every invariant is re-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCorrelationMatrix", into = "RawCorrelationMatrix")]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    /// Row-major, `size * size` entries
    values: Vec<f64>,
}

/// Unvalidated wire form of [`CorrelationMatrix`]
#[derive(Serialize, Deserialize)]
struct RawCorrelationMatrix {
    columns: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

impl TryFrom<RawCorrelationMatrix> for CorrelationMatrix {
    type Error = ReliabilityError;

    fn try_from(raw: RawCorrelationMatrix) -> Result<Self, Self::Error> {
        Self::new(raw.columns, raw.matrix)
    }
}

impl From<CorrelationMatrix> for RawCorrelationMatrix {
    fn from(cor: CorrelationMatrix) -> Self {
        Self {
            matrix: cor.to_rows(),
            columns: cor.columns,
        }
    }
}

impl CorrelationMatrix {
    /// Accept a caller-supplied matrix after checking it looks like a correlation matrix.
    ///
    /// Requirements: square, one name per row, unit diagonal, symmetric, and
    /// finite entries within [-1, 1], all up to [`CORRELATION_TOLERANCE`].
    /// Off-diagonal `NaN` is accepted when mirrored, so matrices produced from
    /// zero-variance items round-trip.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind` describing the first violated requirement.
    pub fn new<S: Into<String>>(
        columns: Vec<S>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, ReliabilityError> {
        let size = rows.len();
        if size == 0 {
            return Err(ReliabilityError::InvalidInputKind(
                "correlation matrix is empty".to_string(),
            ));
        }
        if columns.len() != size {
            return Err(ReliabilityError::InvalidInputKind(format!(
                "{} column names supplied for a {size}x{size} correlation matrix",
                columns.len()
            )));
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(ReliabilityError::InvalidInputKind(format!(
                "correlation matrix is not square: row {idx} has {} entries, expected {size}",
                row.len()
            )));
        }

        for i in 0..size {
            if (rows[i][i] - 1.0).abs() > CORRELATION_TOLERANCE {
                return Err(ReliabilityError::InvalidInputKind(format!(
                    "correlation matrix diagonal entry {i} is {}, expected 1",
                    rows[i][i]
                )));
            }
            for j in 0..i {
                let (a, b) = (rows[i][j], rows[j][i]);
                let mirrored = if a.is_nan() || b.is_nan() {
                    a.is_nan() && b.is_nan()
                } else {
                    (a - b).abs() <= CORRELATION_TOLERANCE
                };
                if !mirrored {
                    return Err(ReliabilityError::InvalidInputKind(format!(
                        "correlation matrix is not symmetric at ({i}, {j})"
                    )));
                }
                if a.is_infinite() || a.abs() > 1.0 + CORRELATION_TOLERANCE {
                    return Err(ReliabilityError::InvalidInputKind(format!(
                        "correlation {a} at ({i}, {j}) is outside [-1, 1]"
                    )));
                }
            }
        }

        Ok(Self {
            columns: columns.into_iter().map(Into::into).collect(),
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of items
    #[must_use]
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    /// Item names
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Entry at row `i`, column `j`
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size() + j]
    }

    /// Matrix as nested rows
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.size()).map(<[f64]>::to_vec).collect()
    }

    /// Entries strictly below the diagonal, row by row.
    ///
    /// Each unordered item pair appears exactly once: `size * (size - 1) / 2` values.
    #[must_use]
    pub fn lower_triangle(&self) -> Vec<f64> {
        let n = self.size();
        (1..n)
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .collect()
    }
}

/// Correlation between two complete series of equal length.
///
/// Fewer than two observations, or a constant series, yields `NaN`.
#[must_use]
pub fn correlate_complete(x: &[f64], y: &[f64], method: CorrelationMethod) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => spearman(x, y),
        CorrelationMethod::Kendall => kendall_tau_b(x, y),
    }
}

/// Correlation over pairwise-complete observations
#[must_use]
pub fn correlate(x: &[Option<f64>], y: &[Option<f64>], method: CorrelationMethod) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();
    correlate_complete(&xs, &ys, method)
}

/// Full item correlation matrix with pairwise-complete handling per column pair.
///
/// A fresh matrix is built on every call; the diagonal is exactly 1.
#[must_use]
pub fn correlation_matrix(matrix: &ItemMatrix, method: CorrelationMethod) -> CorrelationMatrix {
    let n = matrix.n_cols();
    let mut values = vec![1.0; n * n];

    for i in 0..n {
        for j in 0..i {
            let r = correlate(matrix.column(i), matrix.column(j), method);
            values[i * n + j] = r;
            values[j * n + i] = r;
        }
    }

    CorrelationMatrix {
        columns: matrix.column_names().to_vec(),
        values,
    }
}

/// Correlation matrix for any input kind.
///
/// Raw tables are correlated pairwise; a supplied correlation matrix is
/// returned unchanged and `method` is ignored.
#[must_use]
pub fn resolve_correlation(input: &InputKind, method: CorrelationMethod) -> CorrelationMatrix {
    match input {
        InputKind::RawTable(matrix) => correlation_matrix(matrix, method),
        InputKind::CorrelationMatrix(cor) => cor.clone(),
    }
}

/// Pearson product-moment correlation (two-pass)
#[allow(clippy::suboptimal_flops)]
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let mean_x = crate::variance::mean(x);
    let mean_y = crate::variance::mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    // Finite results are kept inside [-1, 1]; NaN passes through clamp unchanged.
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

fn spearman(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Ranks with ties resolved to their average rank (1-based)
fn average_ranks(values: &[f64]) -> Vec<f64> {
    Data::new(values.to_vec()).ranks(RankTieBreaker::Average)
}

/// Kendall's tau-b, corrected for ties in either series
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }

    let mut concordant: i64 = 0;
    let mut discordant: i64 = 0;
    let mut ties_x: i64 = 0;
    let mut ties_y: i64 = 0;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                continue;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let n_x = (concordant + discordant + ties_y) as f64;
    let n_y = (concordant + discordant + ties_x) as f64;
    ((concordant - discordant) as f64 / (n_x * n_y).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // =========================================================================
    // Coefficients
    // =========================================================================

    #[test]
    fn test_pearson_perfect_positive() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((correlate_complete(&x, &y, CorrelationMethod::Pearson) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_known_value() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        // cov = 2.0, var_x = var_y = 2.5
        let r = correlate_complete(&x, &y, CorrelationMethod::Pearson);
        assert!((r - 0.8).abs() < 1e-12, "r = {r}");
    }

    #[test]
    fn test_pearson_constant_is_nan() {
        let x = [3.0, 3.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        assert!(correlate_complete(&x, &y, CorrelationMethod::Pearson).is_nan());
    }

    #[test]
    fn test_too_few_observations_is_nan() {
        assert!(correlate_complete(&[1.0], &[2.0], CorrelationMethod::Pearson).is_nan());
        assert!(correlate_complete(&[1.0], &[2.0], CorrelationMethod::Spearman).is_nan());
        assert!(correlate_complete(&[1.0], &[2.0], CorrelationMethod::Kendall).is_nan());
    }

    #[test]
    fn test_spearman_monotone_nonlinear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 8.0, 27.0, 64.0, 125.0];
        let r = correlate_complete(&x, &y, CorrelationMethod::Spearman);
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_with_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        // ranks x = [1, 2.5, 2.5, 4]
        let r = correlate_complete(&x, &y, CorrelationMethod::Spearman);
        let expected = 4.5 / (4.5_f64 * 5.0).sqrt();
        assert!((r - expected).abs() < 1e-12, "r = {r}");
    }

    #[test]
    fn test_kendall_perfect_and_reversed() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let up = [10.0, 20.0, 30.0, 40.0];
        let down = [40.0, 30.0, 20.0, 10.0];
        assert!((correlate_complete(&x, &up, CorrelationMethod::Kendall) - 1.0).abs() < 1e-12);
        assert!((correlate_complete(&x, &down, CorrelationMethod::Kendall) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kendall_tau_b_with_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        // 5 concordant, 0 discordant, 1 tie in x only
        let tau = correlate_complete(&x, &y, CorrelationMethod::Kendall);
        let expected = 5.0 / (5.0_f64 * 6.0).sqrt();
        assert!((tau - expected).abs() < 1e-12, "tau = {tau}");
    }

    #[test]
    fn test_correlate_pairwise_complete() {
        let x = [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        let y = [Some(2.0), Some(4.0), Some(100.0), None, Some(10.0)];
        // Remaining pairs: (1,2), (2,4), (5,10) -> perfectly linear
        let r = correlate(&x, &y, CorrelationMethod::Pearson);
        assert!((r - 1.0).abs() < 1e-12);
    }

    // =========================================================================
    // Matrices
    // =========================================================================

    #[test]
    fn test_correlation_matrix_symmetric_unit_diagonal() {
        let m = ItemMatrix::from_f64_rows(
            vec!["a", "b", "c"],
            &[
                vec![1.0, 2.0, 5.0],
                vec![2.0, 1.0, 3.0],
                vec![3.0, 4.0, 4.0],
                vec![4.0, 3.0, 1.0],
            ],
        )
        .unwrap();
        let cor = correlation_matrix(&m, CorrelationMethod::Pearson);
        assert_eq!(cor.size(), 3);
        for i in 0..3 {
            assert_eq!(cor.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(cor.get(i, j), cor.get(j, i));
            }
        }
        assert_eq!(cor.column_names(), &["a", "b", "c"]);
    }

    #[test]
    fn test_correlation_matrix_pairwise_missing() {
        let m = ItemMatrix::from_rows(
            vec!["a", "b", "c"],
            &[
                vec![Some(1.0), Some(1.0), None],
                vec![Some(2.0), Some(2.0), Some(3.0)],
                vec![Some(3.0), Some(3.0), Some(2.0)],
                vec![Some(4.0), Some(4.0), Some(1.0)],
            ],
        )
        .unwrap();
        let cor = correlation_matrix(&m, CorrelationMethod::Pearson);
        // a/b use all four rows, a/c use rows 2..4 only
        assert!((cor.get(0, 1) - 1.0).abs() < 1e-12);
        assert!((cor.get(0, 2) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lower_triangle_count() {
        let rows = vec![
            vec![1.0, 0.1, 0.2, 0.3],
            vec![0.1, 1.0, 0.4, 0.5],
            vec![0.2, 0.4, 1.0, 0.6],
            vec![0.3, 0.5, 0.6, 1.0],
        ];
        let cor = CorrelationMatrix::new(ItemMatrix::default_names(4), rows).unwrap();
        let lower = cor.lower_triangle();
        assert_eq!(lower.len(), 6);
        assert_eq!(lower, vec![0.1, 0.2, 0.4, 0.3, 0.5, 0.6]);
    }

    #[test]
    fn test_new_rejects_non_square() {
        let result = CorrelationMatrix::new(vec!["a", "b"], vec![vec![1.0, 0.5], vec![0.5]]);
        assert!(matches!(result, Err(ReliabilityError::InvalidInputKind(_))));
    }

    #[test]
    fn test_new_rejects_asymmetric() {
        let result =
            CorrelationMatrix::new(vec!["a", "b"], vec![vec![1.0, 0.5], vec![0.4, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_bad_diagonal() {
        let result =
            CorrelationMatrix::new(vec!["a", "b"], vec![vec![2.0, 0.5], vec![0.5, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let result =
            CorrelationMatrix::new(vec!["a", "b"], vec![vec![1.0, 1.5], vec![1.5, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_validates_matrix() {
        let bad_entries = serde_json::from_str::<CorrelationMatrix>(
            r#"{"columns": ["a", "b"], "matrix": [[5.0, 3.0], [-7.0, 5.0]]}"#,
        );
        assert!(bad_entries.is_err());

        let too_short =
            serde_json::from_str::<CorrelationMatrix>(r#"{"columns": ["a", "b", "c"], "matrix": [[1.0]]}"#);
        assert!(too_short.is_err());

        let cor =
            CorrelationMatrix::new(vec!["a", "b"], vec![vec![1.0, 0.3], vec![0.3, 1.0]]).unwrap();
        let json = serde_json::to_string(&cor).unwrap();
        assert!(json.contains("\"matrix\""));
        assert_eq!(serde_json::from_str::<CorrelationMatrix>(&json).unwrap(), cor);
    }

    #[test]
    fn test_resolve_correlation_uses_matrix_as_is() {
        let cor =
            CorrelationMatrix::new(vec!["a", "b"], vec![vec![1.0, 0.3], vec![0.3, 1.0]]).unwrap();
        let input = InputKind::from(cor.clone());
        assert_eq!(resolve_correlation(&input, CorrelationMethod::Kendall), cor);
    }

    // =========================================================================
    // Method parsing
    // =========================================================================

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            CorrelationMethod::from_str("Pearson").unwrap(),
            CorrelationMethod::Pearson
        );
        assert_eq!(
            CorrelationMethod::from_str("SPEARMAN").unwrap(),
            CorrelationMethod::Spearman
        );
        assert_eq!(
            CorrelationMethod::from_str("kendall").unwrap(),
            CorrelationMethod::Kendall
        );
        assert!(CorrelationMethod::from_str("polychoric").is_err());
    }

    #[test]
    fn test_method_default_and_display() {
        assert_eq!(CorrelationMethod::default(), CorrelationMethod::Pearson);
        assert_eq!(CorrelationMethod::Spearman.to_string(), "spearman");
    }
}

//! Item and total-score variances.
//!
//! All variances are sample variances (N−1 denominator), computed in two
//! passes: mean first, then squared deviations.

use crate::matrix::ItemMatrix;
use serde::{Deserialize, Serialize};

/// Arithmetic mean; `NaN` for an empty slice
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance; `NaN` with fewer than two values
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(values);
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Round to `digits` decimal places, ties to even (IEC 60559).
///
/// Non-finite values and precisions beyond 15 digits are returned unchanged.
#[must_use]
pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() || digits > 15 {
        return value;
    }
    let factor = 10_f64.powi(i32::try_from(digits).unwrap_or(15));
    (value * factor).round_ties_even() / factor
}

/// Variance components of a scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    /// Sample variance of each item, in column order
    pub item_variances: Vec<f64>,
    /// Sum of the item variances
    pub sum_item_variance: f64,
    /// Sample variance of the row-wise total score
    pub total_variance: f64,
    /// Number of complete rows used
    pub rows: usize,
}

/// Row totals over complete rows, accumulated in column order
#[must_use]
pub fn row_totals(matrix: &ItemMatrix) -> Vec<f64> {
    matrix.row_sums().into_iter().flatten().collect()
}

/// Item variances and total-score variance over the complete rows of `matrix`
#[must_use]
pub fn summarize_variance(matrix: &ItemMatrix) -> VarianceSummary {
    let complete;
    let matrix = if matrix.is_complete() {
        matrix
    } else {
        complete = matrix.complete_cases();
        &complete
    };

    let item_variances: Vec<f64> = (0..matrix.n_cols())
        .map(|c| sample_variance(&matrix.observed(c)))
        .collect();

    VarianceSummary {
        sum_item_variance: item_variances.iter().sum(),
        total_variance: sample_variance(&row_totals(matrix)),
        item_variances,
        rows: matrix.n_rows(),
    }
}

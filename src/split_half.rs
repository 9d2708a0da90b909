//! Split-half reliability with Spearman-Brown correction.

use crate::correlation::{correlate, CorrelationMethod};
use crate::matrix::{ensure_finite, ItemMatrix, ReliabilityError};
use crate::variance::round_to;
use serde::{Deserialize, Serialize};

/// Split-half correlation and its Spearman-Brown adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitHalfResult {
    /// Correlation between the two half-test scores
    #[serde(rename = "splithalf")]
    pub split_half: f64,
    /// Reliability projected to full test length: `2r / (1 + r)`
    #[serde(rename = "spearmanbrown")]
    pub spearman_brown: f64,
}

impl SplitHalfResult {
    /// Both values rounded to `digits`
    #[must_use]
    pub fn rounded(&self, digits: u32) -> Self {
        Self {
            split_half: round_to(self.split_half, digits),
            spearman_brown: round_to(self.spearman_brown, digits),
        }
    }

    /// Fail if either value is non-finite
    ///
    /// # Errors
    ///
    /// Returns `UndefinedStatistic` for the first non-finite value.
    pub fn ensure_finite(&self) -> Result<(), ReliabilityError> {
        ensure_finite("split-half correlation", self.split_half)?;
        ensure_finite("Spearman-Brown coefficient", self.spearman_brown)?;
        Ok(())
    }
}

/// Spearman-Brown prophecy for doubling test length
#[must_use]
pub fn spearman_brown(r: f64) -> f64 {
    (2.0 * r) / (1.0 + r)
}

/// Split items by column parity and correlate the half scores.
///
/// Columns at even positions (0, 2, ...) form the first half, odd positions the
/// second. Each half score is the row mean over that half's observed cells;
/// a row with no observed cell in a half has no score. The two score vectors are
/// correlated (Pearson) over rows where both exist.
///
/// # Errors
///
/// Returns `InsufficientColumns` with fewer than two items.
pub fn split_half(matrix: &ItemMatrix) -> Result<SplitHalfResult, ReliabilityError> {
    let m = matrix.n_cols();
    if m < 2 {
        return Err(ReliabilityError::InsufficientColumns {
            operation: "split-half reliability",
            required: 2,
            found: m,
        });
    }
    if m % 2 == 1 {
        tracing::debug!(items = m, "Odd item count; first half gets the extra item");
    }

    let even: Vec<usize> = (0..m).step_by(2).collect();
    let odd: Vec<usize> = (1..m).step_by(2).collect();

    let first = half_scores(matrix, &even);
    let second = half_scores(matrix, &odd);

    let r = correlate(&first, &second, CorrelationMethod::Pearson);
    let result = SplitHalfResult {
        split_half: r,
        spearman_brown: spearman_brown(r),
    };

    if !result.spearman_brown.is_finite() {
        tracing::warn!(split_half = r, "Split-half reliability is undefined");
    }

    Ok(result)
}

#[allow(clippy::cast_precision_loss)]
fn half_scores(matrix: &ItemMatrix, columns: &[usize]) -> Vec<Option<f64>> {
    (0..matrix.n_rows())
        .map(|r| {
            let observed: Vec<f64> = columns.iter().filter_map(|&c| matrix.cell(r, c)).collect();
            if observed.is_empty() {
                None
            } else {
                Some(observed.iter().sum::<f64>() / observed.len() as f64)
            }
        })
        .collect()
}

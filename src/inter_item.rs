//! Mean inter-item correlation.
//!
//! Averages every distinct item pair once (the strictly lower triangle of the
//! correlation matrix). Values between 0.2 and 0.4 are usually read as items
//! that are homogeneous yet still carry distinct information.

use crate::correlation::{correlation_matrix, CorrelationMatrix, CorrelationMethod};
use crate::matrix::{ensure_finite, InputKind, ReliabilityError};
use crate::variance::{mean, round_to};
use serde::{Deserialize, Serialize};

/// Lower bound of the recommended mean inter-item correlation range
pub const RECOMMENDED_MIN: f64 = 0.2;
/// Upper bound of the recommended mean inter-item correlation range
pub const RECOMMENDED_MAX: f64 = 0.4;

/// How a mean inter-item correlation compares to the recommended range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterItemAssessment {
    /// Below 0.2: items share too little
    TooLow,
    /// Within [0.2, 0.4]
    Acceptable,
    /// Above 0.4: items may be redundant
    TooHigh,
    /// Mean could not be computed
    Undefined,
}

/// Mean inter-item correlation of a scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterItemResult {
    /// Mean of the distinct off-diagonal correlations
    pub mean: f64,
    /// Number of item pairs averaged, `M × (M − 1) / 2`
    pub pairs: usize,
    /// Method used when correlations were computed from raw scores
    pub method: CorrelationMethod,
}

impl InterItemResult {
    /// Compare against the recommended 0.2–0.4 range
    #[must_use]
    pub fn assessment(&self) -> InterItemAssessment {
        if !self.mean.is_finite() {
            InterItemAssessment::Undefined
        } else if self.mean < RECOMMENDED_MIN {
            InterItemAssessment::TooLow
        } else if self.mean > RECOMMENDED_MAX {
            InterItemAssessment::TooHigh
        } else {
            InterItemAssessment::Acceptable
        }
    }

    /// Copy with the mean rounded to `digits`
    #[must_use]
    pub fn rounded(&self, digits: u32) -> Self {
        Self {
            mean: round_to(self.mean, digits),
            ..*self
        }
    }

    /// Fail if the mean is non-finite
    ///
    /// # Errors
    ///
    /// Returns `UndefinedStatistic`.
    pub fn ensure_finite(&self) -> Result<(), ReliabilityError> {
        ensure_finite("mean inter-item correlation", self.mean).map(|_| ())
    }
}

/// Mean of the strictly-below-diagonal entries and how many there were
#[must_use]
pub fn lower_triangle_mean(cor: &CorrelationMatrix) -> (f64, usize) {
    let lower = cor.lower_triangle();
    (mean(&lower), lower.len())
}

/// Mean inter-item correlation.
///
/// Raw tables are reduced to complete rows and correlated with `method`. A
/// supplied correlation matrix is used as-is and `method` is only recorded.
///
/// # Errors
///
/// Returns `InsufficientColumns` with fewer than two items.
pub fn mean_inter_item_correlation(
    input: &InputKind,
    method: CorrelationMethod,
) -> Result<InterItemResult, ReliabilityError> {
    let m = input.n_items();
    if m < 2 {
        return Err(ReliabilityError::InsufficientColumns {
            operation: "mean inter-item correlation",
            required: 2,
            found: m,
        });
    }

    let computed;
    let cor = match input {
        InputKind::RawTable(matrix) => {
            computed = correlation_matrix(&matrix.complete_cases(), method);
            &computed
        }
        InputKind::CorrelationMatrix(cor) => cor,
    };

    let (mean, pairs) = lower_triangle_mean(cor);
    debug_assert_eq!(pairs, m * (m - 1) / 2);

    if !mean.is_finite() {
        tracing::warn!(items = m, %method, "Mean inter-item correlation is undefined");
    }

    Ok(InterItemResult {
        mean,
        pairs,
        method,
    })
}

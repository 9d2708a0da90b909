//! Cronbach's Alpha and item analysis.
//!
//! [`compute_reliability`] is the leave-one-item-out engine: for every item it
//! reports the corrected item-total correlation (item discrimination) and the
//! Alpha the scale would have without that item.
//!
//! Interpretation of item discrimination (documented, never enforced):
//! - |r| < 0.1: poor
//! - 0.1 ≤ |r| ≤ 0.3: fair
//! - |r| > 0.3: good
//! - negative: the item runs against the scale, usually miscoded or reverse-scored

use crate::config::BootstrapConfig;
use crate::correlation::{correlate_complete, CorrelationMethod};
use crate::matrix::{ensure_finite, ItemMatrix, ReliabilityError};
use crate::variance::{round_to, row_totals, summarize_variance};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Cronbach's Alpha on the complete rows of `matrix`.
///
/// `alpha = K / (K − 1) × (1 − Σ var(item) / var(total))` with sample variances.
/// A zero or undefined total-score variance yields a non-finite Alpha, which is
/// returned as-is.
///
/// # Errors
///
/// Returns `InsufficientColumns` if the matrix has fewer than two items.
pub fn cronbach_alpha(matrix: &ItemMatrix) -> Result<f64, ReliabilityError> {
    alpha_of_complete(&matrix.complete_cases())
}

#[allow(clippy::cast_precision_loss)]
fn alpha_of_complete(matrix: &ItemMatrix) -> Result<f64, ReliabilityError> {
    let k = matrix.n_cols();
    if k < 2 {
        return Err(ReliabilityError::InsufficientColumns {
            operation: "Cronbach's alpha",
            required: 2,
            found: k,
        });
    }

    let summary = summarize_variance(matrix);
    let k = k as f64;
    let alpha = k / (k - 1.0) * (1.0 - summary.sum_item_variance / summary.total_variance);

    if !alpha.is_finite() {
        tracing::warn!(
            items = matrix.n_cols(),
            rows = summary.rows,
            total_variance = summary.total_variance,
            "Cronbach's alpha is undefined"
        );
    }

    Ok(alpha)
}

/// Qualitative reading of Cronbach's Alpha
#[must_use]
pub fn interpret_alpha(alpha: f64) -> &'static str {
    if !alpha.is_finite() {
        "undefined"
    } else if alpha >= 0.9 {
        "excellent"
    } else if alpha >= 0.8 {
        "good"
    } else if alpha >= 0.7 {
        "acceptable"
    } else if alpha >= 0.6 {
        "questionable"
    } else if alpha >= 0.5 {
        "poor"
    } else {
        "unacceptable"
    }
}

/// Quality band of an item's discrimination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminationQuality {
    /// Negative correlation with the rest of the scale
    Negative,
    /// |r| < 0.1
    Poor,
    /// 0.1 ≤ |r| ≤ 0.3
    Fair,
    /// |r| > 0.3
    Good,
    /// Discrimination could not be computed
    Undefined,
}

impl DiscriminationQuality {
    /// Classify a corrected item-total correlation
    #[must_use]
    pub fn from_value(r: f64) -> Self {
        if !r.is_finite() {
            Self::Undefined
        } else if r < 0.0 {
            Self::Negative
        } else if r < 0.1 {
            Self::Poor
        } else if r <= 0.3 {
            Self::Fair
        } else {
            Self::Good
        }
    }

    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Undefined => "undefined",
        }
    }
}

/// Item analysis row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReliability {
    /// Item name
    pub term: String,
    /// Correlation of the item with the sum of all other items
    #[serde(rename = "item_discr")]
    pub item_discrimination: f64,
    /// Cronbach's Alpha of the scale without this item
    pub alpha_if_deleted: f64,
}

impl ItemReliability {
    /// Quality band of this item's discrimination
    #[must_use]
    pub fn quality(&self) -> DiscriminationQuality {
        DiscriminationQuality::from_value(self.item_discrimination)
    }
}

/// Result of [`compute_reliability`], one row per item in column order.
///
/// Values are kept at full precision; [`ReliabilityReport::rounded`] applies
/// the requested `digits` for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    /// Per-item rows
    pub items: Vec<ItemReliability>,
    /// Output precision
    pub digits: u32,
    /// Complete rows the analysis ran on
    pub rows_used: usize,
    /// Whether items were z-scored first
    pub standardized: bool,
}

impl ReliabilityReport {
    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the report has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Row for a named item
    #[must_use]
    pub fn get(&self, term: &str) -> Option<&ItemReliability> {
        self.items.iter().find(|item| item.term == term)
    }

    /// Rows rounded to `digits` decimal places
    #[must_use]
    pub fn rounded(&self) -> Vec<ItemReliability> {
        self.items
            .iter()
            .map(|item| ItemReliability {
                term: item.term.clone(),
                item_discrimination: round_to(item.item_discrimination, self.digits),
                alpha_if_deleted: round_to(item.alpha_if_deleted, self.digits),
            })
            .collect()
    }

    /// Fail on the first non-finite statistic
    ///
    /// # Errors
    ///
    /// Returns `UndefinedStatistic` naming the item and statistic.
    pub fn ensure_finite(&self) -> Result<(), ReliabilityError> {
        for item in &self.items {
            ensure_finite(
                &format!("item discrimination of {}", item.term),
                item.item_discrimination,
            )?;
            ensure_finite(
                &format!("alpha if {} deleted", item.term),
                item.alpha_if_deleted,
            )?;
        }
        Ok(())
    }
}

/// Leave-one-item-out analysis.
///
/// Rows with any missing value are dropped first; that complete-case matrix is
/// used for every step. With `standardize`, every item is z-scored once before
/// the loop. For each item the remaining items form a sub-scale whose Alpha is
/// the item's alpha-if-deleted, and whose row totals the item is correlated
/// with (Pearson) to give its discrimination.
///
/// # Errors
///
/// Returns `InsufficientColumns` with fewer than three items.
pub fn compute_reliability(
    matrix: &ItemMatrix,
    standardize: bool,
    digits: u32,
) -> Result<ReliabilityReport, ReliabilityError> {
    let mut data = matrix.complete_cases();
    if standardize {
        data = data.standardized();
    }

    let k = data.n_cols();
    if k < 3 {
        return Err(ReliabilityError::InsufficientColumns {
            operation: "item reliability",
            required: 3,
            found: k,
        });
    }

    let items = (0..k)
        .map(|i| {
            let rest = data.without_column(i);
            let alpha_if_deleted = alpha_of_complete(&rest)?;
            let item_discrimination =
                correlate_complete(&data.observed(i), &row_totals(&rest), CorrelationMethod::Pearson);

            tracing::debug!(
                item = %data.column_names()[i],
                item_discrimination,
                alpha_if_deleted,
                "Item analysed"
            );

            Ok(ItemReliability {
                term: data.column_names()[i].clone(),
                item_discrimination,
                alpha_if_deleted,
            })
        })
        .collect::<Result<Vec<_>, ReliabilityError>>()?;

    Ok(ReliabilityReport {
        items,
        digits,
        rows_used: data.n_rows(),
        standardized: standardize,
    })
}

/// Percentile bootstrap confidence interval for Cronbach's Alpha.
///
/// Complete rows are resampled with replacement `config.resamples` times from a
/// `ChaCha8Rng` seeded with `config.seed`, so a given seed always yields the same
/// interval. Resamples with a non-finite Alpha are discarded. With fewer than
/// two complete rows the point estimate is returned as both bounds.
///
/// # Errors
///
/// Returns `InsufficientColumns` if the matrix has fewer than two items.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
pub fn alpha_bootstrap_ci(
    matrix: &ItemMatrix,
    config: &BootstrapConfig,
) -> Result<(f64, f64), ReliabilityError> {
    let data = matrix.complete_cases();
    let point = alpha_of_complete(&data)?;
    let n = data.n_rows();
    if n < 2 || config.resamples == 0 {
        return Ok((point, point));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut alphas = Vec::with_capacity(config.resamples);

    for _ in 0..config.resamples {
        let picks: Vec<usize> = (0..n).map(|_| rng.next_u64() as usize % n).collect();
        let columns = (0..data.n_cols())
            .map(|c| picks.iter().map(|&r| data.cell(r, c)).collect())
            .collect();
        let resample = ItemMatrix::from_columns(data.column_names().to_vec(), columns)?;
        let alpha = alpha_of_complete(&resample)?;
        if alpha.is_finite() {
            alphas.push(alpha);
        }
    }

    if alphas.is_empty() {
        return Ok((f64::NAN, f64::NAN));
    }
    alphas.sort_by(f64::total_cmp);

    let (lower, upper) = percentile_bounds(&alphas, config.confidence);

    tracing::debug!(
        resamples = config.resamples,
        usable = alphas.len(),
        lower,
        upper,
        "Bootstrapped alpha"
    );

    Ok((lower, upper))
}

/// Equal-tailed percentile bounds of a sorted, non-empty sample.
///
/// Both tails drop the same number of values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
fn percentile_bounds(sorted: &[f64], confidence: f64) -> (f64, f64) {
    let count = sorted.len();
    let tail = (1.0 - confidence) / 2.0;
    let lower_idx = ((count as f64 * tail).floor() as usize).min(count - 1);
    let upper_idx = (count - 1).saturating_sub(lower_idx).max(lower_idx);
    (sorted[lower_idx], sorted[upper_idx])
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::suboptimal_flops
)]
mod tests {
    use super::*;

    fn scale(rows: &[Vec<f64>]) -> ItemMatrix {
        let width = rows.first().map_or(0, Vec::len);
        ItemMatrix::from_f64_rows(ItemMatrix::default_names(width), rows).unwrap()
    }

    /// Four items: 1 and 2 track each other closely, 3 and 4 are near noise.
    fn mixed_scale_rows() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 1.0, 1.0, 3.0],
            vec![2.0, 2.0, 4.0, 5.0],
            vec![3.0, 2.0, 1.0, 5.0],
            vec![4.0, 4.0, 2.0, 1.0],
            vec![5.0, 5.0, 1.0, 5.0],
            vec![2.0, 3.0, 4.0, 5.0],
            vec![3.0, 3.0, 4.0, 3.0],
            vec![4.0, 5.0, 2.0, 4.0],
            vec![1.0, 2.0, 2.0, 1.0],
            vec![5.0, 4.0, 4.0, 2.0],
        ]
    }

    fn mixed_scale() -> ItemMatrix {
        ItemMatrix::from_f64_rows(vec!["q1", "q2", "q3", "q4"], &mixed_scale_rows()).unwrap()
    }

    // =========================================================================
    // Cronbach's alpha
    // =========================================================================

    #[test]
    fn test_alpha_identical_columns_is_one() {
        let m = scale(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![4.0, 4.0], vec![7.0, 7.0]]);
        let alpha = cronbach_alpha(&m).unwrap();
        assert!((alpha - 1.0).abs() < 1e-12, "alpha = {alpha}");
    }

    #[test]
    fn test_alpha_known_value() {
        let m = scale(&[
            vec![1.0, 2.0, 3.0],
            vec![2.0, 2.0, 4.0],
            vec![3.0, 4.0, 4.0],
            vec![4.0, 5.0, 5.0],
        ]);
        // var = [5/3, 9/4, 2/3], var(total) = 14.25
        let expected = 1.5 * (1.0 - (5.0 / 3.0 + 2.25 + 2.0 / 3.0) / 14.25);
        let alpha = cronbach_alpha(&m).unwrap();
        assert!((alpha - expected).abs() < 1e-12, "alpha = {alpha}");
    }

    #[test]
    fn test_alpha_single_column_fails() {
        let m = scale(&[vec![1.0], vec![2.0]]);
        assert!(matches!(
            cronbach_alpha(&m),
            Err(ReliabilityError::InsufficientColumns { required: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_alpha_drops_incomplete_rows() {
        let with_missing = ItemMatrix::from_rows(
            vec!["a", "b", "c"],
            &[
                vec![Some(1.0), Some(2.0), Some(3.0)],
                vec![Some(2.0), Some(2.0), Some(4.0)],
                vec![Some(9.0), None, Some(1.0)],
                vec![Some(3.0), Some(4.0), Some(4.0)],
                vec![Some(4.0), Some(5.0), Some(5.0)],
            ],
        )
        .unwrap();
        let complete = scale(&[
            vec![1.0, 2.0, 3.0],
            vec![2.0, 2.0, 4.0],
            vec![3.0, 4.0, 4.0],
            vec![4.0, 5.0, 5.0],
        ]);
        assert_eq!(
            cronbach_alpha(&with_missing).unwrap(),
            cronbach_alpha(&complete).unwrap()
        );
    }

    #[test]
    fn test_alpha_zero_total_variance_is_not_finite() {
        let m = scale(&[vec![2.0, 2.0], vec![2.0, 2.0], vec![2.0, 2.0]]);
        let alpha = cronbach_alpha(&m).unwrap();
        assert!(!alpha.is_finite());
    }

    #[test]
    fn test_interpret_alpha() {
        assert_eq!(interpret_alpha(0.95), "excellent");
        assert_eq!(interpret_alpha(0.85), "good");
        assert_eq!(interpret_alpha(0.75), "acceptable");
        assert_eq!(interpret_alpha(0.65), "questionable");
        assert_eq!(interpret_alpha(0.55), "poor");
        assert_eq!(interpret_alpha(0.2), "unacceptable");
        assert_eq!(interpret_alpha(f64::NAN), "undefined");
    }

    // =========================================================================
    // Leave-one-out engine
    // =========================================================================

    #[test]
    fn test_reliability_two_columns_fails() {
        let m = scale(&[vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 5.0]]);
        let err = compute_reliability(&m, false, 3).unwrap_err();
        assert!(matches!(
            err,
            ReliabilityError::InsufficientColumns { required: 3, found: 2, .. }
        ));
    }

    #[test]
    fn test_reliability_three_columns_three_rows() {
        let m = scale(&[
            vec![1.0, 2.0, 3.0],
            vec![2.0, 2.0, 4.0],
            vec![3.0, 4.0, 4.0],
            vec![4.0, 5.0, 5.0],
        ]);
        let report = compute_reliability(&m, false, 3).unwrap();
        assert_eq!(report.len(), 3);
        let terms: Vec<&str> = report.items.iter().map(|i| i.term.as_str()).collect();
        assert_eq!(terms, vec!["item_1", "item_2", "item_3"]);
        assert_eq!(report.rows_used, 4);
    }

    #[test]
    fn test_reliability_matches_manual_leave_one_out() {
        let m = mixed_scale();
        let report = compute_reliability(&m, false, 3).unwrap();

        for (i, item) in report.items.iter().enumerate() {
            let rest = m.without_column(i);
            assert_eq!(item.alpha_if_deleted, cronbach_alpha(&rest).unwrap());

            let totals: Vec<f64> = (0..m.n_rows())
                .map(|r| (0..m.n_cols()).filter(|&c| c != i).map(|c| m.cell(r, c).unwrap()).sum())
                .collect();
            let r = correlate_complete(&m.observed(i), &totals, CorrelationMethod::Pearson);
            assert!((item.item_discrimination - r).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reliability_weak_items_discriminate_less() {
        let report = compute_reliability(&mixed_scale(), false, 3).unwrap();
        let q1 = report.get("q1").unwrap();
        let q2 = report.get("q2").unwrap();
        for weak in ["q3", "q4"] {
            let item = report.get(weak).unwrap();
            assert!(item.item_discrimination.abs() < q1.item_discrimination.abs());
            assert!(item.item_discrimination.abs() < q2.item_discrimination.abs());
            assert!(item.alpha_if_deleted > q1.alpha_if_deleted);
            assert!(item.alpha_if_deleted > q2.alpha_if_deleted);
        }
    }

    #[test]
    fn test_reliability_drops_incomplete_rows_before_everything() {
        let mut rows: Vec<Vec<Option<f64>>> = vec![
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(2.0), Some(2.0), Some(4.0)],
            vec![Some(3.0), Some(4.0), Some(4.0)],
            vec![Some(4.0), Some(5.0), Some(5.0)],
        ];
        let clean = ItemMatrix::from_rows(ItemMatrix::default_names(3), &rows).unwrap();
        rows.push(vec![Some(50.0), None, Some(-20.0)]);
        let dirty = ItemMatrix::from_rows(ItemMatrix::default_names(3), &rows).unwrap();

        assert_eq!(
            compute_reliability(&clean, false, 3).unwrap().items,
            compute_reliability(&dirty, false, 3).unwrap().items
        );
    }

    #[test]
    fn test_reliability_standardizes_after_dropping_incomplete_rows() {
        let mut rows: Vec<Vec<Option<f64>>> = mixed_scale_rows()
            .into_iter()
            .map(|r| r.into_iter().map(Some).collect())
            .collect();
        let clean = ItemMatrix::from_rows(vec!["q1", "q2", "q3", "q4"], &rows).unwrap();
        // An extreme row would shift every item's mean and sd if it were
        // z-scored before being dropped
        rows.push(vec![Some(400.0), Some(-250.0), None, Some(90.0)]);
        let dirty = ItemMatrix::from_rows(vec!["q1", "q2", "q3", "q4"], &rows).unwrap();

        let expected = compute_reliability(&clean, true, 3).unwrap();
        let actual = compute_reliability(&dirty, true, 3).unwrap();
        assert_eq!(actual.items, expected.items);
        assert_eq!(actual.rows_used, 10);
        assert!(actual.standardized);
    }

    #[test]
    fn test_reliability_standardized_is_scale_invariant() {
        let m = mixed_scale();
        let rows: Vec<Vec<f64>> = (0..m.n_rows())
            .map(|r| {
                (0..m.n_cols())
                    .map(|c| {
                        let v = m.cell(r, c).unwrap();
                        if c == 0 { v * 10.0 + 5.0 } else { v }
                    })
                    .collect()
            })
            .collect();
        let rescaled = ItemMatrix::from_f64_rows(m.column_names().to_vec(), &rows).unwrap();

        let a = compute_reliability(&m, true, 3).unwrap();
        let b = compute_reliability(&rescaled, true, 3).unwrap();
        assert!(a.standardized);
        for (x, y) in a.items.iter().zip(&b.items) {
            assert!((x.alpha_if_deleted - y.alpha_if_deleted).abs() < 1e-9);
            assert!((x.item_discrimination - y.item_discrimination).abs() < 1e-9);
        }

        // Without standardization the rescaled item dominates the total
        let raw = compute_reliability(&rescaled, false, 3).unwrap();
        assert!((raw.items[1].alpha_if_deleted - a.items[1].alpha_if_deleted).abs() > 1e-6);
    }

    #[test]
    fn test_reliability_rounding_only_at_output() {
        let report = compute_reliability(&mixed_scale(), false, 2).unwrap();
        let rounded = report.rounded();
        for (raw, shown) in report.items.iter().zip(&rounded) {
            assert_eq!(shown.alpha_if_deleted, round_to(raw.alpha_if_deleted, 2));
            assert_eq!(
                shown.item_discrimination,
                round_to(raw.item_discrimination, 2)
            );
        }
    }

    #[test]
    fn test_reliability_is_deterministic_and_non_mutating() {
        let m = mixed_scale();
        let before = m.clone();
        let first = compute_reliability(&m, true, 3).unwrap();
        let second = compute_reliability(&m, true, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(m, before);
    }

    #[test]
    fn test_reliability_ensure_finite() {
        let constant = scale(&[vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0]]);
        let report = compute_reliability(&constant, false, 3).unwrap();
        assert!(report.ensure_finite().is_err());
        assert!(compute_reliability(&mixed_scale(), false, 3)
            .unwrap()
            .ensure_finite()
            .is_ok());
    }

    #[test]
    fn test_discrimination_quality_bands() {
        assert_eq!(DiscriminationQuality::from_value(-0.2), DiscriminationQuality::Negative);
        assert_eq!(DiscriminationQuality::from_value(0.05), DiscriminationQuality::Poor);
        assert_eq!(DiscriminationQuality::from_value(0.2), DiscriminationQuality::Fair);
        assert_eq!(DiscriminationQuality::from_value(0.3), DiscriminationQuality::Fair);
        assert_eq!(DiscriminationQuality::from_value(0.6), DiscriminationQuality::Good);
        assert_eq!(
            DiscriminationQuality::from_value(f64::NAN),
            DiscriminationQuality::Undefined
        );
    }

    #[test]
    fn test_item_reliability_serializes_documented_fields() {
        let item = ItemReliability {
            term: "q1".to_string(),
            item_discrimination: 0.5,
            alpha_if_deleted: 0.7,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["term"], "q1");
        assert_eq!(json["item_discr"], 0.5);
        assert_eq!(json["alpha_if_deleted"], 0.7);
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    #[test]
    fn test_bootstrap_ci_reproducible() {
        let config = BootstrapConfig::default();
        let m = mixed_scale();
        assert_eq!(
            alpha_bootstrap_ci(&m, &config).unwrap(),
            alpha_bootstrap_ci(&m, &config).unwrap()
        );
    }

    #[test]
    fn test_bootstrap_ci_ordered() {
        let config = BootstrapConfig::default();
        let (lower, upper) = alpha_bootstrap_ci(&mixed_scale(), &config).unwrap();
        assert!(lower <= upper);
    }

    #[test]
    fn test_bootstrap_ci_single_row() {
        let m = scale(&[vec![1.0, 2.0, 3.0]]);
        let (lower, upper) = alpha_bootstrap_ci(&m, &BootstrapConfig::default()).unwrap();
        assert!(lower.is_nan() && upper.is_nan());
    }

    #[test]
    fn test_percentile_bounds_equal_tails() {
        let sorted: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let (lower, upper) = percentile_bounds(&sorted, 0.95);
        assert_eq!(lower, 25.0);
        assert_eq!(upper, 974.0);
        // 25 values strictly below and strictly above
        assert_eq!(sorted.iter().filter(|&&v| v < lower).count(), 25);
        assert_eq!(sorted.iter().filter(|&&v| v > upper).count(), 25);

        assert_eq!(percentile_bounds(&[0.7], 0.95), (0.7, 0.7));
    }
}

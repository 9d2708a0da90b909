//! # Scale Reliability
//!
//! Internal-consistency reliability statistics for multi-item measurement
//! scales such as questionnaires and tests.
//!
//! ## Estimators
//!
//! - Cronbach's Alpha, with an optional seeded bootstrap interval
//! - Leave-one-out item analysis: item discrimination and alpha-if-deleted
//! - Split-half reliability with the Spearman-Brown correction
//! - Mean inter-item correlation (Pearson, Spearman, or Kendall)
//! - Item difficulty against the ideal difficulty of the response scale
//!
//! ## Architecture
//!
//! ```text
//! JSON / YAML file
//!        ↓
//! InputKind (raw item table | correlation matrix)
//!        ↓
//! Estimators (full precision, NaN for undefined statistics)
//!        ↓
//! ScaleReport (rounded to configured digits)
//!        ↓
//! Text | Markdown | Structured JSON
//! ```
//!
//! ## Example
//!
//! ```
//! use scale_reliability::{compute_reliability, cronbach_alpha, ItemMatrix};
//!
//! let items = ItemMatrix::from_f64_rows(
//!     vec!["q1", "q2", "q3"],
//!     &[
//!         vec![1.0, 2.0, 1.0],
//!         vec![2.0, 3.0, 2.0],
//!         vec![4.0, 4.0, 5.0],
//!         vec![5.0, 4.0, 4.0],
//!     ],
//! )?;
//!
//! let alpha = cronbach_alpha(&items)?;
//! assert!(alpha > 0.8);
//!
//! let report = compute_reliability(&items, false, 3)?;
//! assert_eq!(report.len(), 3);
//! # Ok::<(), scale_reliability::ReliabilityError>(())
//! ```

pub mod config;
pub mod correlation;
pub mod difficulty;
pub mod input;
pub mod inter_item;
pub mod matrix;
pub mod reliability;
pub mod report;
pub mod split_half;
pub mod variance;

pub use config::{AnalysisConfig, BootstrapConfig, ConfigError, OutputMode};
pub use correlation::{
    correlate, correlation_matrix, resolve_correlation, CorrelationMatrix, CorrelationMethod,
};
pub use difficulty::{item_difficulty, DifficultyResult, ItemDifficulty};
pub use input::{load_input, parse_json, parse_yaml, InputError, ItemFile};
pub use inter_item::{
    mean_inter_item_correlation, InterItemAssessment, InterItemResult, RECOMMENDED_MAX,
    RECOMMENDED_MIN,
};
pub use matrix::{InputKind, ItemMatrix, ReliabilityError};
pub use reliability::{
    alpha_bootstrap_ci, compute_reliability, cronbach_alpha, interpret_alpha,
    DiscriminationQuality, ItemReliability, ReliabilityReport,
};
pub use report::{AlphaSummary, ReportMetadata, ScaleReport, ScaleReportBuilder, Section};
pub use split_half::{spearman_brown, split_half, SplitHalfResult};
pub use variance::{round_to, summarize_variance, VarianceSummary};

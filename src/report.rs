//! Scale report generation.
//!
//! Runs every estimator on one input and renders the results as JSON,
//! markdown, or plain text. An estimator whose preconditions fail (too few
//! items, correlation-only input) leaves a note instead of aborting the report.
//! Rounding to the configured digits happens here and nowhere earlier.

use crate::config::{AnalysisConfig, OutputMode};
use crate::correlation::CorrelationMethod;
use crate::difficulty::{item_difficulty, DifficultyResult};
use crate::inter_item::{mean_inter_item_correlation, InterItemAssessment, InterItemResult};
use crate::matrix::{ensure_finite, InputKind, ReliabilityError};
use crate::reliability::{
    alpha_bootstrap_ci, compute_reliability, cronbach_alpha, interpret_alpha, ReliabilityReport,
};
use crate::split_half::{split_half, SplitHalfResult};
use crate::variance::round_to;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Sections a report can contain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Alpha,
    Reliability,
    SplitHalf,
    InterItem,
    Difficulty,
}

impl Section {
    /// Every section, in report order
    pub const ALL: [Self; 5] = [
        Self::Alpha,
        Self::Reliability,
        Self::SplitHalf,
        Self::InterItem,
        Self::Difficulty,
    ];
}

/// Full scale report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Cronbach's Alpha of the full scale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<AlphaSummary>,
    /// Leave-one-out item analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability: Option<ReliabilityReport>,
    /// Split-half reliability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_half: Option<SplitHalfResult>,
    /// Mean inter-item correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_item: Option<InterItemResult>,
    /// Item difficulty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<DifficultyResult>,
    /// Sections that could not be computed, with the reason
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Crate version
    pub framework_version: String,
    /// `raw` or `correlation`
    pub input_kind: String,
    /// Number of items
    pub items: usize,
    /// Observations in the input (raw input only)
    pub rows: Option<usize>,
    /// Observations without any missing item (raw input only)
    pub complete_rows: Option<usize>,
    /// Settings used
    pub config: ConfigSummary,
}

/// Settings recorded in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    /// Correlation method for inter-item correlations
    pub correlation_method: CorrelationMethod,
    /// Items z-scored before item analysis
    pub standardize: bool,
    /// Decimal places
    pub digits: u32,
}

impl From<&AnalysisConfig> for ConfigSummary {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            correlation_method: config.correlation_method,
            standardize: config.standardize,
            digits: config.digits,
        }
    }
}

/// Cronbach's Alpha with its reading and optional bootstrap interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaSummary {
    /// Point estimate
    pub value: f64,
    /// Qualitative reading
    pub interpretation: String,
    /// Lower bound of the bootstrap interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    /// Upper bound of the bootstrap interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
}

/// Builder for [`ScaleReport`]
pub struct ScaleReportBuilder {
    title: String,
    config: AnalysisConfig,
    sections: Vec<Section>,
}

impl ScaleReportBuilder {
    /// Create a builder with default configuration and every section
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            config: AnalysisConfig::default(),
            sections: Section::ALL.to_vec(),
        }
    }

    /// Set analysis configuration
    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Restrict the report to `sections`
    #[must_use]
    pub fn with_sections(mut self, sections: &[Section]) -> Self {
        self.sections = sections.to_vec();
        self
    }

    /// Run the selected estimators on `input`
    #[must_use]
    pub fn build(self, input: &InputKind) -> ScaleReport {
        let (rows, complete_rows) = match input {
            InputKind::RawTable(matrix) => (
                Some(matrix.n_rows()),
                Some(matrix.complete_cases().n_rows()),
            ),
            InputKind::CorrelationMatrix(_) => (None, None),
        };

        let mut report = ScaleReport {
            metadata: ReportMetadata {
                title: self.title,
                generated_at: Utc::now(),
                framework_version: env!("CARGO_PKG_VERSION").to_string(),
                input_kind: input.label().to_string(),
                items: input.n_items(),
                rows,
                complete_rows,
                config: ConfigSummary::from(&self.config),
            },
            alpha: None,
            reliability: None,
            split_half: None,
            inter_item: None,
            difficulty: None,
            notes: Vec::new(),
        };

        let config = &self.config;
        for section in &self.sections {
            let outcome = match section {
                Section::Alpha => Self::alpha_section(input, config).map(|a| report.alpha = Some(a)),
                Section::Reliability => input
                    .as_table()
                    .and_then(|m| compute_reliability(m, config.standardize, config.digits))
                    .map(|r| report.reliability = Some(r)),
                Section::SplitHalf => input
                    .as_table()
                    .and_then(split_half)
                    .map(|s| report.split_half = Some(s)),
                Section::InterItem => mean_inter_item_correlation(input, config.correlation_method)
                    .map(|i| report.inter_item = Some(i)),
                Section::Difficulty => input
                    .as_table()
                    .map(|m| report.difficulty = Some(item_difficulty(m))),
            };

            if let Err(e) = outcome {
                tracing::warn!(section = ?section, error = %e, "Section skipped");
                report.notes.push(format!("{}: {e}", section_title(*section)));
            }
        }

        report
    }

    fn alpha_section(
        input: &InputKind,
        config: &AnalysisConfig,
    ) -> Result<AlphaSummary, ReliabilityError> {
        let matrix = input.as_table()?;
        let value = cronbach_alpha(matrix)?;
        let (ci_lower, ci_upper) = if config.bootstrap.enabled {
            let (lower, upper) = alpha_bootstrap_ci(matrix, &config.bootstrap)?;
            (Some(lower), Some(upper))
        } else {
            (None, None)
        };

        Ok(AlphaSummary {
            value,
            interpretation: interpret_alpha(value).to_string(),
            ci_lower,
            ci_upper,
        })
    }
}

const fn section_title(section: Section) -> &'static str {
    match section {
        Section::Alpha => "Cronbach's Alpha",
        Section::Reliability => "Item Reliability",
        Section::SplitHalf => "Split-Half Reliability",
        Section::InterItem => "Mean Inter-Item Correlation",
        Section::Difficulty => "Item Difficulty",
    }
}

/// Table row for item analysis output
#[derive(Tabled)]
struct ReliabilityRow {
    #[tabled(rename = "Item")]
    term: String,
    #[tabled(rename = "Discrimination")]
    discrimination: String,
    #[tabled(rename = "Alpha if deleted")]
    alpha_if_deleted: String,
    #[tabled(rename = "Quality")]
    quality: String,
}

/// Table row for difficulty output
#[derive(Tabled)]
struct DifficultyRow {
    #[tabled(rename = "Item")]
    term: String,
    #[tabled(rename = "Difficulty")]
    difficulty: String,
    #[tabled(rename = "Ideal")]
    ideal: String,
}

/// Format with the same ties-to-even rounding the JSON output uses
fn fmt_value(value: f64, digits: u32) -> String {
    format!("{:.*}", digits as usize, round_to(value, digits))
}

impl ScaleReport {
    /// Copy with every statistic rounded to the configured digits
    #[must_use]
    pub fn rounded(&self) -> Self {
        let digits = self.metadata.config.digits;
        let mut out = self.clone();

        if let Some(alpha) = out.alpha.as_mut() {
            alpha.value = round_to(alpha.value, digits);
            alpha.ci_lower = alpha.ci_lower.map(|v| round_to(v, digits));
            alpha.ci_upper = alpha.ci_upper.map(|v| round_to(v, digits));
        }
        if let Some(reliability) = out.reliability.as_mut() {
            reliability.items = reliability.rounded();
        }
        out.split_half = out.split_half.map(|s| s.rounded(digits));
        out.inter_item = out.inter_item.map(|i| i.rounded(digits));

        out
    }

    /// Fail on the first non-finite statistic
    ///
    /// # Errors
    ///
    /// Returns `UndefinedStatistic` naming the statistic.
    pub fn ensure_finite(&self) -> Result<(), ReliabilityError> {
        if let Some(alpha) = &self.alpha {
            ensure_finite("Cronbach's alpha", alpha.value)?;
        }
        if let Some(reliability) = &self.reliability {
            reliability.ensure_finite()?;
        }
        if let Some(split) = &self.split_half {
            split.ensure_finite()?;
        }
        if let Some(inter_item) = &self.inter_item {
            inter_item.ensure_finite()?;
        }
        if let Some(difficulty) = &self.difficulty {
            for item in &difficulty.items {
                ensure_finite(&format!("difficulty of {}", item.term), item.difficulty)?;
            }
        }
        Ok(())
    }

    /// Render in the requested mode
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, mode: OutputMode) -> Result<String, serde_json::Error> {
        match mode {
            OutputMode::Text => Ok(self.to_text()),
            OutputMode::Markdown => Ok(self.to_markdown()),
            OutputMode::Structured => self.to_json(),
        }
    }

    /// Render report as JSON, values rounded
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rounded())
    }

    fn reliability_rows(&self) -> Option<Vec<ReliabilityRow>> {
        let digits = self.metadata.config.digits;
        self.reliability.as_ref().map(|r| {
            r.items
                .iter()
                .map(|item| ReliabilityRow {
                    term: item.term.clone(),
                    discrimination: fmt_value(item.item_discrimination, digits),
                    alpha_if_deleted: fmt_value(item.alpha_if_deleted, digits),
                    quality: item.quality().as_str().to_string(),
                })
                .collect()
        })
    }

    fn difficulty_rows(&self) -> Option<Vec<DifficultyRow>> {
        self.difficulty.as_ref().map(|d| {
            d.items
                .iter()
                .map(|item| DifficultyRow {
                    term: item.term.clone(),
                    difficulty: fmt_value(item.difficulty, 2),
                    ideal: fmt_value(item.ideal_difficulty, 2),
                })
                .collect()
        })
    }

    /// Render report as markdown
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn to_markdown(&self) -> String {
        let digits = self.metadata.config.digits;
        let mut output = String::new();

        writeln!(output, "# {}", self.metadata.title).ok();
        writeln!(output).ok();
        writeln!(
            output,
            "**Generated:** {}",
            self.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .ok();
        writeln!(
            output,
            "**Framework Version:** {}",
            self.metadata.framework_version
        )
        .ok();
        writeln!(output).ok();

        writeln!(output, "## Input").ok();
        writeln!(output).ok();
        writeln!(output, "| Property | Value |").ok();
        writeln!(output, "|----------|-------|").ok();
        writeln!(output, "| Kind | {} |", self.metadata.input_kind).ok();
        writeln!(output, "| Items | {} |", self.metadata.items).ok();
        if let (Some(rows), Some(complete)) = (self.metadata.rows, self.metadata.complete_rows) {
            writeln!(output, "| Rows | {rows} |").ok();
            writeln!(output, "| Complete rows | {complete} |").ok();
        }
        writeln!(output).ok();

        if let Some(alpha) = &self.alpha {
            writeln!(output, "## {}", section_title(Section::Alpha)).ok();
            writeln!(output).ok();
            writeln!(
                output,
                "**Alpha:** {} ({})",
                fmt_value(alpha.value, digits),
                alpha.interpretation
            )
            .ok();
            if let (Some(lower), Some(upper)) = (alpha.ci_lower, alpha.ci_upper) {
                writeln!(
                    output,
                    "**Bootstrap CI:** [{}, {}]",
                    fmt_value(lower, digits),
                    fmt_value(upper, digits)
                )
                .ok();
            }
            writeln!(output).ok();
        }

        if let Some(rows) = self.reliability_rows() {
            writeln!(output, "## {}", section_title(Section::Reliability)).ok();
            writeln!(output).ok();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            writeln!(output, "{table}").ok();
            writeln!(output).ok();
        }

        if let Some(split) = &self.split_half {
            writeln!(output, "## {}", section_title(Section::SplitHalf)).ok();
            writeln!(output).ok();
            writeln!(output, "| Statistic | Value |").ok();
            writeln!(output, "|-----------|-------|").ok();
            writeln!(
                output,
                "| Split-half r | {} |",
                fmt_value(split.split_half, digits)
            )
            .ok();
            writeln!(
                output,
                "| Spearman-Brown | {} |",
                fmt_value(split.spearman_brown, digits)
            )
            .ok();
            writeln!(output).ok();
        }

        if let Some(inter_item) = &self.inter_item {
            writeln!(output, "## {}", section_title(Section::InterItem)).ok();
            writeln!(output).ok();
            writeln!(
                output,
                "**Mean r ({}):** {} over {} pairs ({})",
                inter_item.method,
                fmt_value(inter_item.mean, digits),
                inter_item.pairs,
                assessment_label(inter_item.assessment())
            )
            .ok();
            writeln!(output).ok();
        }

        if let Some(rows) = self.difficulty_rows() {
            writeln!(output, "## {}", section_title(Section::Difficulty)).ok();
            writeln!(output).ok();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            writeln!(output, "{table}").ok();
            writeln!(output).ok();
        }

        if !self.notes.is_empty() {
            writeln!(output, "## Notes").ok();
            writeln!(output).ok();
            for note in &self.notes {
                writeln!(output, "- {note}").ok();
            }
            writeln!(output).ok();
        }

        output
    }

    /// Render report as plain text tables
    #[must_use]
    pub fn to_text(&self) -> String {
        let digits = self.metadata.config.digits;
        let mut output = String::new();

        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(output, "  {}", self.metadata.title).ok();
        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(output).ok();
        writeln!(
            output,
            "  Items: {}   Input: {}",
            self.metadata.items, self.metadata.input_kind
        )
        .ok();
        if let (Some(rows), Some(complete)) = (self.metadata.rows, self.metadata.complete_rows) {
            writeln!(output, "  Rows:  {rows}   Complete: {complete}").ok();
        }
        writeln!(output).ok();

        if let Some(alpha) = &self.alpha {
            writeln!(
                output,
                "  Cronbach's Alpha:  {} ({})",
                fmt_value(alpha.value, digits),
                alpha.interpretation
            )
            .ok();
            if let (Some(lower), Some(upper)) = (alpha.ci_lower, alpha.ci_upper) {
                writeln!(
                    output,
                    "  Bootstrap CI:      [{}, {}]",
                    fmt_value(lower, digits),
                    fmt_value(upper, digits)
                )
                .ok();
            }
        }
        if let Some(split) = &self.split_half {
            writeln!(
                output,
                "  Split-half r:      {}",
                fmt_value(split.split_half, digits)
            )
            .ok();
            writeln!(
                output,
                "  Spearman-Brown:    {}",
                fmt_value(split.spearman_brown, digits)
            )
            .ok();
        }
        if let Some(inter_item) = &self.inter_item {
            writeln!(
                output,
                "  Mean inter-item r: {} ({}, {})",
                fmt_value(inter_item.mean, digits),
                inter_item.method,
                assessment_label(inter_item.assessment())
            )
            .ok();
        }
        writeln!(output).ok();

        if let Some(rows) = self.reliability_rows() {
            writeln!(output, "ITEM RELIABILITY").ok();
            writeln!(output, "{}", Table::new(rows)).ok();
            writeln!(output).ok();
        }
        if let Some(rows) = self.difficulty_rows() {
            writeln!(output, "ITEM DIFFICULTY").ok();
            writeln!(output, "{}", Table::new(rows)).ok();
            writeln!(output).ok();
        }

        for note in &self.notes {
            writeln!(output, "  note: {note}").ok();
        }

        output
    }
}

const fn assessment_label(assessment: InterItemAssessment) -> &'static str {
    match assessment {
        InterItemAssessment::TooLow => "below 0.2",
        InterItemAssessment::Acceptable => "within 0.2-0.4",
        InterItemAssessment::TooHigh => "above 0.4",
        InterItemAssessment::Undefined => "undefined",
    }
}

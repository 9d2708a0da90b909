//! Analysis configuration.
//!
//! Every option is an explicit value threaded through each call; nothing is
//! read from global state. Configurations load from YAML with per-field
//! defaults, and CLI flags override individual fields.

use crate::correlation::CorrelationMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid correlation method: {0} (expected pearson, spearman or kendall)")]
    InvalidMethod(String),

    #[error("Invalid output mode: {0} (expected text, markdown or structured)")]
    InvalidOutputMode(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// How results are presented
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Plain text tables
    #[default]
    Text,
    /// Markdown document
    Markdown,
    /// JSON with the documented field names
    #[serde(alias = "json")]
    Structured,
}

impl std::str::FromStr for OutputMode {
    type Err = ConfigError;

    /// Parse output mode from string
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidOutputMode` for unknown names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "structured" | "json" => Ok(Self::Structured),
            _ => Err(ConfigError::InvalidOutputMode(s.to_string())),
        }
    }
}

/// Bootstrap settings for the Alpha confidence interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootstrapConfig {
    /// Compute the interval at all
    #[serde(default)]
    pub enabled: bool,
    /// Number of resamples
    #[serde(default = "default_resamples")]
    pub resamples: usize,
    /// Confidence level
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Random seed for reproducibility
    #[serde(default = "default_seed")]
    pub seed: u64,
}

const fn default_resamples() -> usize {
    1000
}
const fn default_confidence() -> f64 {
    0.95
}
const fn default_seed() -> u64 {
    42
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            resamples: default_resamples(),
            confidence: default_confidence(),
            seed: default_seed(),
        }
    }
}

/// Settings for a scale analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Correlation method for inter-item correlations
    #[serde(default)]
    pub correlation_method: CorrelationMethod,
    /// Z-score items before item analysis
    #[serde(default)]
    pub standardize: bool,
    /// Decimal places in presented results
    #[serde(default = "default_digits")]
    pub digits: u32,
    /// Presentation format
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Alpha confidence interval
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

const fn default_digits() -> u32 {
    3
}

/// Upper bound for `digits`; beyond this `f64` carries no more decimals
pub const MAX_DIGITS: u32 = 15;

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            correlation_method: CorrelationMethod::default(),
            standardize: false,
            digits: default_digits(),
            output_mode: OutputMode::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or fails validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` describing the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.digits > MAX_DIGITS {
            return Err(ConfigError::InvalidValue(format!(
                "digits must be at most {MAX_DIGITS}, got {}",
                self.digits
            )));
        }
        if !(self.bootstrap.confidence > 0.0 && self.bootstrap.confidence < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "bootstrap.confidence must be in (0, 1), got {}",
                self.bootstrap.confidence
            )));
        }
        if self.bootstrap.resamples == 0 {
            return Err(ConfigError::InvalidValue(
                "bootstrap.resamples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

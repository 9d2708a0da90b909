//! Scale Reliability CLI
//!
//! Reliability statistics for multi-item scales

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scale_reliability::{
    load_input, AnalysisConfig, CorrelationMethod, OutputMode, ScaleReportBuilder, Section,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scale-reliability")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Flags shared by every subcommand
#[derive(Args)]
struct CommonArgs {
    /// Item data file (.json, .yaml or .yml)
    #[arg(short, long)]
    input: PathBuf,

    /// Analysis configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: text, markdown or structured
    #[arg(long)]
    output_mode: Option<OutputMode>,

    /// Decimal places in the output
    #[arg(long)]
    digits: Option<u32>,

    /// Fail when any statistic is undefined
    #[arg(long)]
    strict: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cronbach's Alpha for the whole scale
    Alpha {
        #[command(flatten)]
        common: CommonArgs,

        /// Add a bootstrap confidence interval
        #[arg(long)]
        bootstrap: bool,

        /// Bootstrap resamples (overrides config)
        #[arg(long)]
        resamples: Option<usize>,

        /// Bootstrap seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Item discrimination and alpha-if-deleted per item
    Reliability {
        #[command(flatten)]
        common: CommonArgs,

        /// Z-score items before the analysis
        #[arg(long)]
        standardize: bool,
    },

    /// Split-half reliability with Spearman-Brown correction
    SplitHalf {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Mean inter-item correlation
    InterItem {
        #[command(flatten)]
        common: CommonArgs,

        /// Correlation method: pearson, spearman or kendall
        #[arg(long)]
        method: Option<CorrelationMethod>,
    },

    /// Item difficulty against the ideal difficulty
    Difficulty {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Full report with every statistic
    Report {
        #[command(flatten)]
        common: CommonArgs,

        /// Report title
        #[arg(long, default_value = "Scale Reliability Report")]
        title: String,

        /// Correlation method: pearson, spearman or kendall
        #[arg(long)]
        method: Option<CorrelationMethod>,

        /// Z-score items before the item analysis
        #[arg(long)]
        standardize: bool,

        /// Add a bootstrap confidence interval for Alpha
        #[arg(long)]
        bootstrap: bool,
    },
}

/// Settings that subcommand flags can override
#[derive(Default)]
struct Overrides {
    method: Option<CorrelationMethod>,
    standardize: bool,
    bootstrap: bool,
    resamples: Option<usize>,
    seed: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Alpha {
            common,
            bootstrap,
            resamples,
            seed,
        } => {
            let overrides = Overrides {
                bootstrap,
                resamples,
                seed,
                ..Overrides::default()
            };
            analyze(&common, &overrides, "Cronbach's Alpha", Some(Section::Alpha))
        }
        Commands::Reliability {
            common,
            standardize,
        } => {
            let overrides = Overrides {
                standardize,
                ..Overrides::default()
            };
            analyze(
                &common,
                &overrides,
                "Item Reliability",
                Some(Section::Reliability),
            )
        }
        Commands::SplitHalf { common } => analyze(
            &common,
            &Overrides::default(),
            "Split-Half Reliability",
            Some(Section::SplitHalf),
        ),
        Commands::InterItem { common, method } => {
            let overrides = Overrides {
                method,
                ..Overrides::default()
            };
            analyze(
                &common,
                &overrides,
                "Mean Inter-Item Correlation",
                Some(Section::InterItem),
            )
        }
        Commands::Difficulty { common } => analyze(
            &common,
            &Overrides::default(),
            "Item Difficulty",
            Some(Section::Difficulty),
        ),
        Commands::Report {
            common,
            title,
            method,
            standardize,
            bootstrap,
        } => {
            let overrides = Overrides {
                method,
                standardize,
                bootstrap,
                ..Overrides::default()
            };
            analyze(&common, &overrides, &title, None)
        }
    }
}

/// Load config, apply flag overrides, and validate the result
fn resolve_config(common: &CommonArgs, overrides: &Overrides) -> Result<AnalysisConfig> {
    let mut config = match &common.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(mode) = common.output_mode {
        config.output_mode = mode;
    }
    if let Some(digits) = common.digits {
        config.digits = digits;
    }
    if let Some(method) = overrides.method {
        config.correlation_method = method;
    }
    if overrides.standardize {
        config.standardize = true;
    }
    if overrides.bootstrap {
        config.bootstrap.enabled = true;
    }
    if let Some(resamples) = overrides.resamples {
        config.bootstrap.resamples = resamples;
    }
    if let Some(seed) = overrides.seed {
        config.bootstrap.seed = seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run one section (or all of them) and emit the rendered report
fn analyze(
    common: &CommonArgs,
    overrides: &Overrides,
    title: &str,
    section: Option<Section>,
) -> Result<()> {
    let config = resolve_config(common, overrides)?;
    let input = load_input(&common.input)
        .with_context(|| format!("Failed to load input {}", common.input.display()))?;

    tracing::info!(
        input = %common.input.display(),
        kind = input.label(),
        items = input.n_items(),
        method = %config.correlation_method,
        digits = config.digits,
        "Analyzing scale"
    );

    let output_mode = config.output_mode;
    let mut builder = ScaleReportBuilder::new(title).with_config(config);
    if let Some(section) = section {
        builder = builder.with_sections(&[section]);
    }
    let report = builder.build(&input);

    // A single requested statistic that could not be computed is an error
    if section.is_some() && !report.notes.is_empty() {
        bail!("{}", report.notes.join("; "));
    }
    if common.strict {
        report
            .ensure_finite()
            .context("Strict mode: undefined statistic")?;
    }

    let rendered = report
        .render(output_mode)
        .context("Failed to render report")?;

    match &common.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(output = %path.display(), "Report written");
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

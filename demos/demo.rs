//! Demo: reliability analysis of a short questionnaire
//!
//! Builds a five-item scale where the last two items were badly worded,
//! then walks through every estimator and the full report.

use scale_reliability::{
    compute_reliability, cronbach_alpha, interpret_alpha, item_difficulty,
    mean_inter_item_correlation, split_half, AnalysisConfig, CorrelationMethod, InputKind,
    ItemMatrix, OutputMode, ScaleReportBuilder,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Scale Reliability Demo ===\n");

    // 1-5 Likert responses; `None` is a skipped question
    let responses = vec![
        vec![Some(4.0), Some(5.0), Some(4.0), Some(2.0), Some(3.0)],
        vec![Some(2.0), Some(2.0), Some(3.0), Some(4.0), Some(1.0)],
        vec![Some(5.0), Some(4.0), Some(5.0), Some(1.0), Some(4.0)],
        vec![Some(3.0), Some(3.0), Some(2.0), Some(5.0), Some(2.0)],
        vec![Some(1.0), Some(2.0), Some(1.0), Some(3.0), Some(5.0)],
        vec![Some(4.0), Some(4.0), None, Some(2.0), Some(3.0)],
        vec![Some(2.0), Some(1.0), Some(2.0), Some(4.0), Some(4.0)],
        vec![Some(5.0), Some(5.0), Some(4.0), Some(3.0), Some(1.0)],
    ];
    let items = ItemMatrix::from_rows(
        vec!["enjoy", "recommend", "return", "confusing", "price"],
        &responses,
    )?;

    let alpha = cronbach_alpha(&items)?;
    println!("Cronbach's alpha: {alpha:.3} ({})", interpret_alpha(alpha));

    println!("\nItem analysis:");
    let reliability = compute_reliability(&items, false, 3)?;
    for item in reliability.rounded() {
        println!(
            "  {:<10} discrimination {:>7.3}   alpha if deleted {:>6.3}   [{}]",
            item.term,
            item.item_discrimination,
            item.alpha_if_deleted,
            item.quality().as_str()
        );
    }

    let halves = split_half(&items)?;
    println!(
        "\nSplit-half r = {:.3}, Spearman-Brown = {:.3}",
        halves.split_half, halves.spearman_brown
    );

    let input = InputKind::from(items.clone());
    for method in [
        CorrelationMethod::Pearson,
        CorrelationMethod::Spearman,
        CorrelationMethod::Kendall,
    ] {
        let result = mean_inter_item_correlation(&input, method)?;
        println!(
            "Mean inter-item r ({method}): {:.3} over {} pairs",
            result.mean, result.pairs
        );
    }

    println!("\nItem difficulty:");
    for item in item_difficulty(&items).items {
        println!(
            "  {:<10} {:.2} (ideal {:.2})",
            item.term, item.difficulty, item.ideal_difficulty
        );
    }

    println!("\n=== Full Report ===\n");
    let mut config = AnalysisConfig::default();
    config.bootstrap.enabled = true;
    config.bootstrap.resamples = 500;
    let report = ScaleReportBuilder::new("Customer Satisfaction Pilot")
        .with_config(config)
        .build(&input);
    print!("{}", report.render(OutputMode::Markdown)?);

    Ok(())
}

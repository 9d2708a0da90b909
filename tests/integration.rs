//! Integration tests for scale-reliability CLI and library.
//!
//! These tests verify end-to-end functionality including:
//! - Library estimators agree with hand-computed values
//! - Estimators are deterministic and never mutate their input
//! - CLI commands load files and render every output mode

// Allow less strict lints for test code
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use scale_reliability::{
    compute_reliability, correlation_matrix, cronbach_alpha, item_difficulty,
    mean_inter_item_correlation, parse_yaml, split_half, AnalysisConfig, CorrelationMatrix,
    CorrelationMethod, InputKind, ItemMatrix, ReliabilityError, ScaleReportBuilder,
};
use std::process::Command;

/// Four items, ten complete rows: q1/q2 move together, q3/q4 barely relate to
/// anything
fn mixed_scale() -> ItemMatrix {
    ItemMatrix::from_f64_rows(
        vec!["q1", "q2", "q3", "q4"],
        &[
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
        ],
    )
    .unwrap()
}

const MIXED_SCALE_JSON: &str = r#"{
  "kind": "raw",
  "columns": ["q1", "q2", "q3", "q4"],
  "rows": [
    [1, 1, 1, 3], [2, 2, 4, 5], [3, 2, 1, 5], [4, 4, 2, 1], [5, 5, 1, 5],
    [2, 3, 4, 5], [3, 3, 4, 3], [4, 5, 2, 4], [1, 2, 2, 1], [5, 4, 4, 2]
  ]
}"#;

// ============================================================================
// Library Integration Tests
// ============================================================================

#[test]
fn test_weak_items_show_in_item_analysis() {
    let report = compute_reliability(&mixed_scale(), false, 3).unwrap();
    assert_eq!(report.len(), 4);

    let strong = ["q1", "q2"].map(|t| report.get(t).unwrap().clone());
    let weak = ["q3", "q4"].map(|t| report.get(t).unwrap().clone());

    for s in &strong {
        for w in &weak {
            assert!(
                s.item_discrimination.abs() > w.item_discrimination.abs(),
                "{} should discriminate better than {}",
                s.term,
                w.term
            );
            assert!(
                w.alpha_if_deleted > s.alpha_if_deleted,
                "dropping {} should help more than dropping {}",
                w.term,
                s.term
            );
        }
    }
}

#[test]
fn test_identical_pair_alpha_is_one() {
    let column = [2.0, 4.0, 1.0, 5.0, 3.0];
    let rows: Vec<Vec<f64>> = column.iter().map(|&v| vec![v, v]).collect();
    let m = ItemMatrix::from_f64_rows(vec!["a", "b"], &rows).unwrap();
    assert!((cronbach_alpha(&m).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_identical_halves_split_half_is_one() {
    // Columns 0/2 form one half, 1/3 the other; both halves share row means
    let m = ItemMatrix::from_f64_rows(
        vec!["a", "b", "c", "d"],
        &[
            vec![1.0, 2.0, 3.0, 2.0],
            vec![4.0, 4.0, 4.0, 4.0],
            vec![2.0, 1.0, 2.0, 3.0],
            vec![5.0, 5.0, 3.0, 3.0],
        ],
    )
    .unwrap();
    let result = split_half(&m).unwrap();
    assert!((result.split_half - 1.0).abs() < 1e-12);
    assert!((result.spearman_brown - 1.0).abs() < 1e-12);
}

#[test]
fn test_reliability_column_minimum() {
    let two = mixed_scale().select_columns(&[0, 1]);
    assert!(matches!(
        compute_reliability(&two, false, 3),
        Err(ReliabilityError::InsufficientColumns {
            required: 3,
            found: 2,
            ..
        })
    ));

    let three = mixed_scale().select_columns(&[0, 1, 2]);
    assert_eq!(compute_reliability(&three, false, 3).unwrap().len(), 3);
}

#[test]
fn test_difficulty_constant_and_binary_items() {
    let m = ItemMatrix::from_f64_rows(
        vec!["constant", "binary"],
        &[vec![5.0, 1.0], vec![5.0, 0.0], vec![5.0, 1.0], vec![5.0, 1.0]],
    )
    .unwrap();
    let result = item_difficulty(&m);

    let constant = result.get("constant").unwrap();
    assert_eq!(constant.difficulty, 1.0);
    assert_eq!(constant.ideal_difficulty, 0.6);

    let binary = result.get("binary").unwrap();
    assert_eq!(binary.difficulty, 0.75);
    assert_eq!(binary.ideal_difficulty, 1.0);
}

#[test]
fn test_inter_item_pair_count_and_order_invariance() {
    let columns = vec!["a", "b", "c", "d"];
    let matrix = vec![
        vec![1.0, 0.1, 0.2, 0.3],
        vec![0.1, 1.0, 0.4, 0.5],
        vec![0.2, 0.4, 1.0, 0.6],
        vec![0.3, 0.5, 0.6, 1.0],
    ];
    let original = InputKind::from(CorrelationMatrix::new(columns, matrix.clone()).unwrap());
    let result = mean_inter_item_correlation(&original, CorrelationMethod::Pearson).unwrap();
    assert_eq!(result.pairs, 6);
    assert!((result.mean - 0.35).abs() < 1e-12);

    // Reverse item order on both axes
    let order = [3, 2, 1, 0];
    let permuted: Vec<Vec<f64>> = order
        .iter()
        .map(|&i| order.iter().map(|&j| matrix[i][j]).collect())
        .collect();
    let reversed =
        InputKind::from(CorrelationMatrix::new(vec!["d", "c", "b", "a"], permuted).unwrap());
    let again = mean_inter_item_correlation(&reversed, CorrelationMethod::Pearson).unwrap();
    assert_eq!(again.pairs, 6);
    assert!((again.mean - result.mean).abs() < 1e-12);
}

#[test]
fn test_raw_and_precomputed_inter_item_agree() {
    let raw = mixed_scale();
    let cor = correlation_matrix(&raw, CorrelationMethod::Spearman);

    let from_raw =
        mean_inter_item_correlation(&InputKind::from(raw), CorrelationMethod::Spearman).unwrap();
    let from_matrix =
        mean_inter_item_correlation(&InputKind::from(cor), CorrelationMethod::Pearson).unwrap();
    assert!((from_raw.mean - from_matrix.mean).abs() < 1e-12);
}

#[test]
fn test_operations_are_deterministic_and_pure() {
    let m = mixed_scale();
    let snapshot = m.clone();

    let first = compute_reliability(&m, true, 3).unwrap();
    let second = compute_reliability(&m, true, 3).unwrap();
    for (a, b) in first.items.iter().zip(&second.items) {
        assert_eq!(a.item_discrimination.to_bits(), b.item_discrimination.to_bits());
        assert_eq!(a.alpha_if_deleted.to_bits(), b.alpha_if_deleted.to_bits());
    }

    let s1 = split_half(&m).unwrap();
    let s2 = split_half(&m).unwrap();
    assert_eq!(s1.split_half.to_bits(), s2.split_half.to_bits());

    assert_eq!(
        cronbach_alpha(&m).unwrap().to_bits(),
        cronbach_alpha(&m).unwrap().to_bits()
    );
    assert_eq!(item_difficulty(&m), item_difficulty(&m));
    assert_eq!(m, snapshot);
}

#[test]
fn test_yaml_input_through_full_report() {
    let yaml = r"
kind: raw
columns: [q1, q2, q3]
rows:
  - [1, 2, 1]
  - [2, 3, 2]
  - [4, 4, ~]
  - [4, 4, 5]
  - [5, 4, 4]
";
    let input = parse_yaml(yaml).unwrap();
    let config = AnalysisConfig {
        digits: 2,
        ..AnalysisConfig::default()
    };
    let report = ScaleReportBuilder::new("YAML").with_config(config).build(&input);

    assert!(report.notes.is_empty(), "unexpected notes: {:?}", report.notes);
    assert_eq!(report.metadata.rows, Some(5));
    assert_eq!(report.metadata.complete_rows, Some(4));
    // Difficulty ignores the missing cell only in its own column
    let q3 = report.difficulty.as_ref().unwrap().get("q3").unwrap();
    assert_eq!(q3.difficulty, 0.6);
}

// ============================================================================
// CLI Integration Tests
// ============================================================================

fn write_input(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write input file");
    path.to_str().unwrap().to_string()
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_cli_help_command() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scale-reliability"));
    assert!(stdout.contains("reliability"));
    assert!(stdout.contains("split-half"));
    assert!(stdout.contains("inter-item"));
}

#[test]
fn test_cli_reliability_structured() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(&temp_dir, "scale.json", MIXED_SCALE_JSON);

    let output = run_cli(&[
        "reliability",
        "--input",
        &input,
        "--output-mode",
        "structured",
        "--digits",
        "2",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = json["reliability"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["term"], "q1");
    assert!(items[0]["item_discr"].is_number());
    assert!(items[0]["alpha_if_deleted"].is_number());
    assert!(json.get("split_half").is_none());
}

#[test]
fn test_cli_split_half_markdown() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(&temp_dir, "scale.json", MIXED_SCALE_JSON);

    let output = run_cli(&["split-half", "--input", &input, "--output-mode", "markdown"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("## Split-Half Reliability"));
    assert!(stdout.contains("Spearman-Brown"));
}

#[test]
fn test_cli_inter_item_on_correlation_matrix() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(
        &temp_dir,
        "cor.yaml",
        "kind: correlation\ncolumns: [a, b, c]\nmatrix:\n  - [1.0, 0.3, 0.2]\n  - [0.3, 1.0, 0.4]\n  - [0.2, 0.4, 1.0]\n",
    );

    let output = run_cli(&["inter-item", "--input", &input, "--output-mode", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["inter_item"]["pairs"], 3);
    assert_eq!(json["inter_item"]["mean"], 0.3);
}

#[test]
fn test_cli_alpha_rejects_correlation_input() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(
        &temp_dir,
        "cor.json",
        r#"{"kind": "correlation", "matrix": [[1.0, 0.5], [0.5, 1.0]]}"#,
    );

    let output = run_cli(&["alpha", "--input", &input]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"), "stderr: {}", stderr);
}

#[test]
fn test_cli_strict_mode_fails_on_constant_scale() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(
        &temp_dir,
        "flat.json",
        r#"{"kind": "raw", "rows": [[3, 3], [3, 3], [3, 3]]}"#,
    );

    let lenient = run_cli(&["alpha", "--input", &input]);
    assert!(lenient.status.success());
    assert!(String::from_utf8_lossy(&lenient.stdout).contains("NaN"));

    let strict = run_cli(&["alpha", "--input", &input, "--strict"]);
    assert!(!strict.status.success());
}

#[test]
fn test_cli_report_with_config_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_input(&temp_dir, "scale.json", MIXED_SCALE_JSON);
    let config = write_input(
        &temp_dir,
        "analysis.yaml",
        "correlation_method: kendall\ndigits: 4\noutput_mode: structured\nbootstrap:\n  enabled: true\n  resamples: 100\n",
    );
    let out_file = temp_dir.path().join("report.json");

    let output = run_cli(&[
        "report",
        "--input",
        &input,
        "--config",
        &config,
        "--title",
        "Pilot Scale",
        "--output",
        out_file.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
    assert_eq!(json["metadata"]["title"], "Pilot Scale");
    assert_eq!(json["metadata"]["config"]["correlation_method"], "kendall");
    assert_eq!(json["metadata"]["config"]["digits"], 4);
    assert_eq!(json["inter_item"]["method"], "kendall");
    assert!(json["alpha"]["ci_lower"].is_number());
    assert_eq!(json["difficulty"]["items"].as_array().unwrap().len(), 4);
}

#[test]
fn test_cli_missing_input_file() {
    let output = run_cli(&["difficulty", "--input", "nonexistent/scale.json"]);
    assert!(!output.status.success());
}

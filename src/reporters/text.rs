//! Text (terminal) reporter with colors and formatting

use crate::models::Label;
use crate::pubmed::DownloadReport;
use crate::scoring::{EvaluationMetrics, ScoreOutcome};
use crate::validation::ValidationReport;
use anyhow::Result;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Records listed before the output is truncated
const MAX_ROWS: usize = 20;

fn rule(out: &mut String) {
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
}

fn label_tag(label: Label) -> String {
    match label {
        Label::Positive => format!("{GREEN}POS{RESET}"),
        Label::Negative => format!("{DIM}neg{RESET}"),
    }
}

/// Render a scoring run as formatted terminal output
pub fn render_score(outcome: &ScoreOutcome) -> Result<String> {
    let classification = outcome.classification();
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}cardshark scoring{RESET}\n"));
    rule(&mut out);
    out.push_str(&format!(
        "Abstracts: {}  Cutoff: {BOLD}{:.2}{RESET}  Predicted positive: {GREEN}{}{RESET}\n\n",
        classification.records.len(),
        classification.cutoff,
        classification.positives()
    ));

    if !classification.records.is_empty() {
        out.push_str(&format!(
            "{DIM}  #   PMID          SCORE       PRED  LABEL{RESET}\n"
        ));
        for (i, record) in classification.records.iter().take(MAX_ROWS).enumerate() {
            let label = record
                .label
                .map(label_tag)
                .unwrap_or_else(|| format!("{DIM}-{RESET}"));
            out.push_str(&format!(
                "  {DIM}{:>3}{RESET}  {:<12}  {:>10.3}  {}   {}\n",
                i + 1,
                record.id,
                record.score,
                label_tag(record.prediction),
                label
            ));
        }
        let remaining = classification.records.len().saturating_sub(MAX_ROWS);
        if remaining > 0 {
            out.push_str(&format!(
                "\n  {DIM}...and {} more (use --format json for all records){RESET}\n",
                remaining
            ));
        }
        out.push('\n');
    }

    if let Some(metrics) = outcome.metrics() {
        render_metrics(&mut out, metrics);
    }
    Ok(out)
}

fn render_metrics(out: &mut String, metrics: &EvaluationMetrics) {
    let [[tn, fp], [fn_, tp]] = metrics.confusion.as_rows();
    out.push_str(&format!("{BOLD}EVALUATION{RESET}\n"));
    out.push_str(&format!("  {DIM}confusion      pred 0  pred 1{RESET}\n"));
    out.push_str(&format!("  actual 0       {:>6}  {:>6}\n", tn, fp));
    out.push_str(&format!("  actual 1       {:>6}  {:>6}\n\n", fn_, tp));
    out.push_str(&format!(
        "  Precision: {}  Recall: {}  F1: {}\n",
        format_ratio(metrics.precision),
        format_ratio(metrics.recall),
        format_ratio(metrics.f1)
    ));
    out.push_str(&format!("  MSE: {:.4}", metrics.mean_squared_error));
    match metrics.auc {
        Some(auc) => out.push_str(&format!("  AUC: {}\n", format_ratio(auc))),
        None => out.push_str(&format!(
            "  AUC: {DIM}n/a (single-class labels){RESET}\n"
        )),
    }
}

fn format_ratio(value: f64) -> String {
    let color = if value >= 0.8 {
        GREEN
    } else if value >= 0.6 {
        YELLOW
    } else {
        RED
    };
    format!("{color}{:.3}{RESET}", value)
}

/// Render validation tallies, one block per validation set
pub fn render_validation(reports: &[ValidationReport]) -> Result<String> {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("\n{BOLD}Validation set {}{RESET}\n", report.name));
        rule(&mut out);
        out.push_str(&format!(
            "Rows: {}  Dropped (reviewer conflicts): {}\n\n",
            report.rows, report.dropped_rows
        ));
        out.push_str(&format!(
            "{DIM}  MODEL             TP     TN     FP     FN   ACC    PREC   REC{RESET}\n"
        ));
        for (model, tally) in &report.tallies {
            out.push_str(&format!(
                "  {:<14}  {:>5}  {:>5}  {:>5}  {:>5}  {:.3}  {:.3}  {:.3}\n",
                model,
                tally.true_positive,
                tally.true_negative,
                tally.false_positive,
                tally.false_negative,
                tally.accuracy(),
                tally.precision(),
                tally.recall()
            ));
        }
    }
    if reports.is_empty() {
        out.push_str(&format!("{DIM}No validation sets.{RESET}\n"));
    }
    Ok(out)
}

/// Render the per-range download summary
pub fn render_downloads(reports: &[DownloadReport]) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("\n{BOLD}PubMed download{RESET}\n"));
    rule(&mut out);
    for report in reports {
        let skipped = &report.skipped;
        out.push_str(&format!(
            "  {}  found {}  kept {GREEN}{}{RESET}",
            report.range,
            report.found,
            report.papers.len()
        ));
        if skipped.total() > 0 {
            out.push_str(&format!(
                "  {DIM}skipped {} (no abstract {}, no pmid {}, other {}){RESET}",
                skipped.total(),
                skipped.missing_abstract.len(),
                skipped.missing_pmid,
                skipped.other_error.len()
            ));
        }
        out.push('\n');
    }
    let total: usize = reports.iter().map(|r| r.papers.len()).sum();
    out.push_str(&format!("\n{BOLD}{}{RESET} abstracts downloaded\n", total));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_classification, test_evaluated};
    use crate::validation::OutcomeTally;
    use indexmap::IndexMap;

    #[test]
    fn test_render_predictions() {
        let out = render_score(&ScoreOutcome::Predictions(test_classification())).expect("render");
        assert!(out.contains("Cutoff: "));
        assert!(out.contains("11.00"));
        assert!(out.contains("28000003"));
        assert!(!out.contains("EVALUATION"));
    }

    #[test]
    fn test_render_evaluation() {
        let out = render_score(&test_evaluated()).expect("render");
        assert!(out.contains("EVALUATION"));
        assert!(out.contains("AUC"));
    }

    #[test]
    fn test_render_validation() {
        let mut tallies = IndexMap::new();
        tallies.insert(
            "shark".to_string(),
            OutcomeTally {
                true_positive: 3,
                true_negative: 5,
                false_positive: 1,
                false_negative: 1,
            },
        );
        let report = ValidationReport {
            name: "card".into(),
            rows: 10,
            dropped_rows: 2,
            tallies,
            outcomes: Vec::new(),
        };
        let out = render_validation(&[report]).expect("render");
        assert!(out.contains("Validation set card"));
        assert!(out.contains("shark"));
        assert!(out.contains("0.800"));
    }
}

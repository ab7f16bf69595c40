//! JSON reporter
//!
//! Pretty-printed JSON for piping to jq or further processing. Download
//! summaries omit the paper bodies, which are written to their own files.

use crate::pubmed::{DateRange, DownloadReport, SkipCounts};
use crate::scoring::{Classification, EvaluationMetrics, ScoreOutcome};
use crate::validation::ValidationReport;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct ScoreView<'a> {
    #[serde(flatten)]
    classification: &'a Classification,
    positives: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<&'a EvaluationMetrics>,
}

#[derive(Serialize)]
struct DownloadView<'a> {
    range: &'a DateRange,
    found: usize,
    downloaded: usize,
    skipped: &'a SkipCounts,
}

pub fn render_score(outcome: &ScoreOutcome) -> Result<String> {
    let classification = outcome.classification();
    Ok(serde_json::to_string_pretty(&ScoreView {
        classification,
        positives: classification.positives(),
        metrics: outcome.metrics(),
    })?)
}

pub fn render_validation(reports: &[ValidationReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

pub fn render_downloads(reports: &[DownloadReport]) -> Result<String> {
    let views: Vec<DownloadView> = reports
        .iter()
        .map(|r| DownloadView {
            range: &r.range,
            found: r.found,
            downloaded: r.papers.len(),
            skipped: &r.skipped,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_classification, test_evaluated};

    #[test]
    fn test_predictions_json() {
        let outcome = ScoreOutcome::Predictions(test_classification());
        let parsed: serde_json::Value =
            serde_json::from_str(&render_score(&outcome).expect("render")).expect("parse");
        assert_eq!(parsed["cutoff"], 11.0);
        assert_eq!(parsed["positives"], 2);
        assert_eq!(parsed["records"].as_array().expect("records").len(), 3);
        assert_eq!(parsed["records"][1]["prediction"], 0);
        assert!(parsed.get("metrics").is_none());
    }

    #[test]
    fn test_evaluated_json_has_metrics() {
        let parsed: serde_json::Value =
            serde_json::from_str(&render_score(&test_evaluated()).expect("render")).expect("parse");
        let metrics = &parsed["metrics"];
        assert_eq!(metrics["confusion"]["true_positive"], 1);
        assert_eq!(metrics["confusion"]["false_positive"], 1);
        assert!(metrics["auc"].is_number());
    }

    #[test]
    fn test_downloads_json_omits_papers() {
        let report = DownloadReport {
            range: "2017/01/01:2017/12/31".parse().expect("range"),
            found: 3,
            papers: vec![crate::models::Abstract::new("1", "text", "title", "J")],
            skipped: SkipCounts {
                missing_abstract: vec!["2".into()],
                missing_pmid: 0,
                other_error: vec!["3".into()],
            },
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&render_downloads(&[report]).expect("render")).expect("parse");
        assert_eq!(parsed[0]["downloaded"], 1);
        assert_eq!(parsed[0]["skipped"]["missing_abstract"][0], "2");
        assert!(parsed[0].get("papers").is_none());
    }
}

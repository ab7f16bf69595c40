//! Compare model predictions with reviewer ground truth

use super::{ValidationError, ValidationResult, ValidationRow, ValidationSet};
use crate::models::Label;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    #[serde(rename = "TP")]
    TruePositive,
    #[serde(rename = "TN")]
    TrueNegative,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "FN")]
    FalseNegative,
}

impl Outcome {
    pub fn classify(actual: Label, predicted: Label) -> Self {
        match (predicted == actual, predicted) {
            (true, Label::Positive) => Outcome::TruePositive,
            (true, Label::Negative) => Outcome::TrueNegative,
            (false, Label::Positive) => Outcome::FalsePositive,
            (false, Label::Negative) => Outcome::FalseNegative,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    #[serde(rename = "TP")]
    pub true_positive: usize,
    #[serde(rename = "TN")]
    pub true_negative: usize,
    #[serde(rename = "FP")]
    pub false_positive: usize,
    #[serde(rename = "FN")]
    pub false_negative: usize,
}

impl OutcomeTally {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.true_positive += 1,
            Outcome::TrueNegative => self.true_negative += 1,
            Outcome::FalsePositive => self.false_positive += 1,
            Outcome::FalseNegative => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Predictions per model, keyed by pmid
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    models: IndexMap<String, HashMap<String, Label>>,
}

impl PredictionTable {
    pub fn insert(&mut self, model: &str, pmid: impl Into<String>, prediction: Label) {
        self.models
            .entry(model.to_string())
            .or_default()
            .insert(pmid.into(), prediction);
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn get(&self, model: &str, pmid: &str) -> Option<Label> {
        self.models.get(model)?.get(pmid).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Load a prediction file. JSON files hold `{model: [[pmid, prediction],
    /// ...]}`; CSV files hold `pmid,prediction` columns and are named after
    /// the file stem. CSV predictions may use `label_terms` words.
    pub fn load(&mut self, path: &Path, label_terms: &IndexMap<String, u8>) -> ValidationResult<()> {
        let file = path.display().to_string();
        let invalid = |reason: String| ValidationError::InvalidPredictions {
            file: file.clone(),
            reason,
        };

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        if is_csv {
            let model = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "predictions".to_string());
            let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
            let headers = reader.headers()?.clone();
            let column = |name: &str| {
                headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| invalid(format!("missing '{}' column", name)))
            };
            let (pmid_col, pred_col) = (column("pmid")?, column("prediction")?);

            for record in reader.records() {
                let record = record?;
                let pmid = record.get(pmid_col).unwrap_or("").trim();
                let raw = record.get(pred_col).unwrap_or("");
                let label = label_terms
                    .get(raw)
                    .and_then(|&v| Label::try_from(v).ok())
                    .or_else(|| parse_prediction(&Value::String(raw.to_string())))
                    .ok_or_else(|| invalid(format!("pmid {}: unreadable prediction {:?}", pmid, raw)))?;
                self.insert(&model, pmid, label);
            }
        } else {
            let data = std::fs::read_to_string(path)?;
            let parsed: IndexMap<String, Vec<(Value, Value)>> =
                serde_json::from_str(&data).map_err(|e| invalid(e.to_string()))?;
            for (model, pairs) in parsed {
                for (pmid, prediction) in pairs {
                    let pmid = value_to_id(&pmid)
                        .ok_or_else(|| invalid(format!("model {}: bad pmid {}", model, pmid)))?;
                    let label = parse_prediction(&prediction).ok_or_else(|| {
                        invalid(format!("model {}: bad prediction {}", model, prediction))
                    })?;
                    self.insert(&model, pmid, label);
                }
            }
        }
        debug!("Loaded predictions from {}", file);
        Ok(())
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| (f as i64).to_string())),
        _ => None,
    }
}

fn parse_prediction(value: &Value) -> Option<Label> {
    match value {
        Value::Bool(b) => Some(Label::from_bool(*b)),
        Value::Number(n) => match n.as_f64()? {
            v if v == 0.0 => Some(Label::Negative),
            v if v == 1.0 => Some(Label::Positive),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "0" => Some(Label::Negative),
            "1" => Some(Label::Positive),
            _ => None,
        },
        _ => None,
    }
}

/// Agreed label for a row: the first header's label when the first two
/// headers agree, negative otherwise
pub fn ground_truth(row: &ValidationRow, headers: &[String]) -> ValidationResult<Label> {
    let resolved = |i: usize| {
        row.labels[i].ok_or_else(|| ValidationError::UnresolvedLabel {
            row: row.index,
            pmid: row.pmid.clone(),
            header: headers[i].clone(),
            value: row.raw(&headers[i]).to_string(),
        })
    };
    let (first, second) = (resolved(0)?, resolved(1)?);
    Ok(if first == second {
        first
    } else {
        Label::Negative
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    pub pmid: String,
    pub actual: Label,
    pub outcomes: IndexMap<String, Outcome>,
}

/// Per-model outcome tallies for one validation set
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub name: String,
    pub rows: usize,
    pub dropped_rows: usize,
    pub tallies: IndexMap<String, OutcomeTally>,
    pub outcomes: Vec<RowOutcome>,
}

pub fn tabulate(
    set: &ValidationSet,
    predictions: &PredictionTable,
) -> ValidationResult<ValidationReport> {
    let mut tallies: IndexMap<String, OutcomeTally> = predictions
        .models()
        .map(|m| (m.to_string(), OutcomeTally::default()))
        .collect();
    let mut outcomes = Vec::with_capacity(set.rows.len());

    for row in &set.rows {
        let actual = ground_truth(row, &set.headers)?;
        let mut per_model = IndexMap::new();
        for (model, tally) in tallies.iter_mut() {
            let predicted =
                predictions
                    .get(model, &row.pmid)
                    .ok_or_else(|| ValidationError::MissingPrediction {
                        model: model.clone(),
                        pmid: row.pmid.clone(),
                    })?;
            let outcome = Outcome::classify(actual, predicted);
            tally.add(outcome);
            per_model.insert(model.clone(), outcome);
        }
        outcomes.push(RowOutcome {
            pmid: row.pmid.clone(),
            actual,
            outcomes: per_model,
        });
    }

    Ok(ValidationReport {
        name: set.name.clone(),
        rows: set.rows.len(),
        dropped_rows: set.dropped_rows,
        tallies,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_label_terms;
    use crate::models::Label::{Negative as N, Positive as P};

    fn row(index: usize, pmid: &str, labels: Vec<Option<Label>>) -> ValidationRow {
        ValidationRow {
            index,
            pmid: pmid.into(),
            source: "card.csv".into(),
            cells: IndexMap::new(),
            labels,
        }
    }

    fn headers() -> Vec<String> {
        vec!["is_amr".into(), "is_novel".into()]
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(Outcome::classify(P, P), Outcome::TruePositive);
        assert_eq!(Outcome::classify(N, N), Outcome::TrueNegative);
        assert_eq!(Outcome::classify(N, P), Outcome::FalsePositive);
        assert_eq!(Outcome::classify(P, N), Outcome::FalseNegative);
    }

    #[test]
    fn test_ground_truth_requires_agreement() {
        let h = headers();
        assert_eq!(ground_truth(&row(0, "1", vec![Some(P), Some(P)]), &h).unwrap(), P);
        assert_eq!(ground_truth(&row(0, "1", vec![Some(P), Some(N)]), &h).unwrap(), N);
        assert_eq!(ground_truth(&row(0, "1", vec![Some(N), Some(N)]), &h).unwrap(), N);
        assert!(matches!(
            ground_truth(&row(4, "1", vec![Some(P), None]), &h),
            Err(ValidationError::UnresolvedLabel { row: 4, header, .. }) if header == "is_novel"
        ));
    }

    #[test]
    fn test_tabulate_counts_per_model() {
        let set = ValidationSet {
            name: "card".into(),
            headers: headers(),
            rows: vec![
                row(0, "1", vec![Some(P), Some(P)]),
                row(1, "2", vec![Some(P), Some(N)]),
                row(2, "3", vec![Some(N), Some(N)]),
            ],
            dropped_rows: 2,
        };
        let mut predictions = PredictionTable::default();
        for (pmid, shark, lr) in [("1", P, N), ("2", P, N), ("3", N, N)] {
            predictions.insert("shark", pmid, shark);
            predictions.insert("lr", pmid, lr);
        }

        let report = tabulate(&set, &predictions).expect("tabulate");
        let shark = report.tallies["shark"];
        assert_eq!((shark.true_positive, shark.false_positive, shark.true_negative), (1, 1, 1));
        let lr = report.tallies["lr"];
        assert_eq!((lr.false_negative, lr.true_negative), (1, 2));
        assert_eq!(report.dropped_rows, 2);
        assert_eq!(report.outcomes[1].outcomes["shark"], Outcome::FalsePositive);
        assert!((shark.accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tabulate_missing_prediction() {
        let set = ValidationSet {
            name: "card".into(),
            headers: headers(),
            rows: vec![row(0, "1", vec![Some(P), Some(P)])],
            dropped_rows: 0,
        };
        let mut predictions = PredictionTable::default();
        predictions.insert("shark", "2", P);
        assert!(matches!(
            tabulate(&set, &predictions),
            Err(ValidationError::MissingPrediction { .. })
        ));
    }

    #[test]
    fn test_load_json_and_csv_predictions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = dir.path().join("preds.json");
        std::fs::write(&json, r#"{"shark": [[1, 1], ["2", 0]], "rf": [[1, true]]}"#).expect("write");
        let csv = dir.path().join("nb.csv");
        std::fs::write(&csv, "pmid,prediction\n1,True\n2,0\n").expect("write");

        let mut table = PredictionTable::default();
        table.load(&json, &default_label_terms()).expect("json");
        table.load(&csv, &default_label_terms()).expect("csv");

        assert_eq!(table.models().collect::<Vec<_>>(), vec!["shark", "rf", "nb"]);
        assert_eq!(table.get("shark", "1"), Some(P));
        assert_eq!(table.get("shark", "2"), Some(N));
        assert_eq!(table.get("rf", "1"), Some(P));
        assert_eq!(table.get("nb", "1"), Some(P));
        assert_eq!(table.get("nb", "2"), Some(N));
        assert_eq!(table.get("nb", "3"), None);
    }

    #[test]
    fn test_load_bad_predictions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = dir.path().join("preds.json");
        std::fs::write(&json, r#"{"shark": [[1, 7]]}"#).expect("write");
        let mut table = PredictionTable::default();
        assert!(matches!(
            table.load(&json, &default_label_terms()),
            Err(ValidationError::InvalidPredictions { .. })
        ));
    }
}

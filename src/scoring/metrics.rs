//! Binary classification metrics
//!
//! Curves follow the usual conventions: thresholds are the distinct scores
//! in decreasing order, the ROC curve starts at (0, 0) with an infinite
//! threshold, and the precision-recall curve ends at (recall 0, precision 1).

use super::{ScoringError, ScoringResult};
use crate::models::Label;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Counts of a 2×2 confusion matrix, rows = truth, columns = prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[Label], y_pred: &[Label]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth, pred) {
                (Label::Negative, Label::Negative) => cm.true_negative += 1,
                (Label::Negative, Label::Positive) => cm.false_positive += 1,
                (Label::Positive, Label::Negative) => cm.false_negative += 1,
                (Label::Positive, Label::Positive) => cm.true_positive += 1,
            }
        }
        cm
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Everything reported for a labeled scoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub confusion: ConfusionMatrix,
    pub mean_squared_error: f64,
    /// `None` when the labels hold a single class
    pub roc: Option<RocCurve>,
    pub auc: Option<f64>,
    pub precision_recall: PrecisionRecallCurve,
    /// Support-weighted over both classes
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Compute all metrics. Curves use the L2-normalized scores as the
/// probability proxy; the rest compare hard predictions.
pub fn evaluate(
    y_true: &[Label],
    y_pred: &[Label],
    scores: &[f64],
) -> ScoringResult<EvaluationMetrics> {
    if y_true.is_empty() {
        return Err(ScoringError::DivisionUndefined {
            what: "evaluation metrics",
        });
    }

    let probas = l2_normalize(scores);

    let roc = match roc_curve(y_true, &probas) {
        Ok(roc) => Some(roc),
        Err(e) => {
            warn!("Skipping ROC curve: {}", e);
            None
        }
    };
    let auc = roc.as_ref().map(|r| auc(&r.fpr, &r.tpr));
    let (precision, recall, f1) = weighted_precision_recall_f1(y_true, y_pred);

    Ok(EvaluationMetrics {
        confusion: ConfusionMatrix::from_labels(y_true, y_pred),
        mean_squared_error: mean_squared_error(y_true, y_pred),
        roc,
        auc,
        precision_recall: precision_recall_curve(y_true, &probas)?,
        precision,
        recall,
        f1,
    })
}

/// Scale `values` to unit Euclidean norm. An all-zero vector is returned
/// unchanged.
pub fn l2_normalize(values: &[f64]) -> Vec<f64> {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / norm).collect()
}

pub fn mean_squared_error(y_true: &[Label], y_pred: &[Label]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let d = t.as_u8() as f64 - p.as_u8() as f64;
            d * d
        })
        .sum();
    sum / y_true.len() as f64
}

/// Cumulative false/true positive counts per distinct threshold
struct ClfCurve {
    fps: Vec<f64>,
    tps: Vec<f64>,
    thresholds: Vec<f64>,
}

fn binary_clf_curve(y_true: &[Label], scores: &[f64]) -> ClfCurve {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = ClfCurve {
        fps: Vec::new(),
        tps: Vec::new(),
        thresholds: Vec::new(),
    };
    let mut tp = 0.0;
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i].is_positive() {
            tp += 1.0;
        }
        let last_of_run = order.get(pos + 1).map_or(true, |&next| scores[next] != scores[i]);
        if last_of_run {
            curve.tps.push(tp);
            curve.fps.push((pos + 1) as f64 - tp);
            curve.thresholds.push(scores[i]);
        }
    }
    curve
}

/// ROC curve with collinear intermediate points dropped
pub fn roc_curve(y_true: &[Label], scores: &[f64]) -> ScoringResult<RocCurve> {
    let ClfCurve {
        mut fps,
        mut tps,
        mut thresholds,
    } = binary_clf_curve(y_true, scores);

    if fps.len() > 2 {
        let last = fps.len() - 1;
        let keep: Vec<usize> = (0..fps.len())
            .filter(|&i| {
                i == 0
                    || i == last
                    || fps[i + 1] - 2.0 * fps[i] + fps[i - 1] != 0.0
                    || tps[i + 1] - 2.0 * tps[i] + tps[i - 1] != 0.0
            })
            .collect();
        fps = keep.iter().map(|&i| fps[i]).collect();
        tps = keep.iter().map(|&i| tps[i]).collect();
        thresholds = keep.iter().map(|&i| thresholds[i]).collect();
    }

    fps.insert(0, 0.0);
    tps.insert(0, 0.0);
    thresholds.insert(0, f64::INFINITY);

    let negatives = fps.last().copied().unwrap_or(0.0);
    let positives = tps.last().copied().unwrap_or(0.0);
    if negatives == 0.0 {
        return Err(ScoringError::DivisionUndefined {
            what: "false-positive rate (no negative labels)",
        });
    }
    if positives == 0.0 {
        return Err(ScoringError::DivisionUndefined {
            what: "true-positive rate (no positive labels)",
        });
    }

    Ok(RocCurve {
        fpr: fps.iter().map(|f| f / negatives).collect(),
        tpr: tps.iter().map(|t| t / positives).collect(),
        thresholds,
    })
}

/// Trapezoidal area under `(x, y)`. A non-increasing `x` yields a positive
/// area as well.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    let area: f64 = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[1] + ys[0]) / 2.0)
        .sum();
    let decreasing = x.windows(2).any(|w| w[1] < w[0]) && x.windows(2).all(|w| w[1] <= w[0]);
    if decreasing {
        -area
    } else {
        area
    }
}

pub fn precision_recall_curve(
    y_true: &[Label],
    scores: &[f64],
) -> ScoringResult<PrecisionRecallCurve> {
    if y_true.is_empty() {
        return Err(ScoringError::DivisionUndefined {
            what: "precision-recall curve",
        });
    }
    let ClfCurve {
        fps,
        tps,
        thresholds,
    } = binary_clf_curve(y_true, scores);

    let positives = tps.last().copied().unwrap_or(0.0);
    let mut precision: Vec<f64> = tps
        .iter()
        .zip(&fps)
        .map(|(&tp, &fp)| if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) })
        .collect();
    let mut recall: Vec<f64> = tps
        .iter()
        .map(|&tp| if positives == 0.0 { 1.0 } else { tp / positives })
        .collect();
    let mut thresholds = thresholds;

    precision.reverse();
    recall.reverse();
    thresholds.reverse();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrecisionRecallCurve {
        precision,
        recall,
        thresholds,
    })
}

/// Precision, recall and F1 per class, averaged with weights equal to each
/// class's true support. Undefined ratios count as 0.
pub fn weighted_precision_recall_f1(y_true: &[Label], y_pred: &[Label]) -> (f64, f64, f64) {
    if y_true.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let cm = ConfusionMatrix::from_labels(y_true, y_pred);
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    // (hits, predicted, support) per class
    let classes = [
        (
            cm.true_negative,
            cm.true_negative + cm.false_negative,
            cm.true_negative + cm.false_positive,
        ),
        (
            cm.true_positive,
            cm.true_positive + cm.false_positive,
            cm.true_positive + cm.false_negative,
        ),
    ];

    let total = y_true.len() as f64;
    let (mut p, mut r, mut f) = (0.0, 0.0, 0.0);
    for (hits, predicted, support) in classes {
        let precision = ratio(hits, predicted);
        let recall = ratio(hits, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        let weight = support as f64 / total;
        p += precision * weight;
        r += recall * weight;
        f += f1 * weight;
    }
    (p, r, f)
}

//! Apply scoring tables to abstracts and classify them

use super::metrics::{self, EvaluationMetrics};
use super::pairs::for_each_pair_key;
use super::{
    checked_text, JournalFrequencyMap, ModelBundle, PairFrequencyMap, ScoreMatrix, ScoringError,
    ScoringResult,
};
use crate::config::{ScoringConfig, TermMatch};
use crate::models::{Abstract, Label, ScoredAbstract, TextField};
use crate::text::{word_tokens, SentenceSegmenter, StopList};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-component contributions to one abstract's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub locus_tags: f64,
    pub words: f64,
    pub terms: f64,
    pub journal: f64,
    pub pairs: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Scores and predictions only; labels are not required
    #[default]
    Predictions,
    /// Also compute metrics against each abstract's label
    Evaluate,
}

/// Scores and predictions for a corpus, in corpus order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub cutoff: f64,
    pub records: Vec<ScoredAbstract>,
}

impl Classification {
    pub fn positives(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.prediction.is_positive())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Predictions(Classification),
    Evaluated {
        classification: Classification,
        metrics: EvaluationMetrics,
    },
}

impl ScoreOutcome {
    pub fn classification(&self) -> &Classification {
        match self {
            ScoreOutcome::Predictions(c) => c,
            ScoreOutcome::Evaluated { classification, .. } => classification,
        }
    }

    pub fn metrics(&self) -> Option<&EvaluationMetrics> {
        match self {
            ScoreOutcome::Predictions(_) => None,
            ScoreOutcome::Evaluated { metrics, .. } => Some(metrics),
        }
    }
}

/// Median of `scores`, raised to `floor` when it lies in (0, floor].
/// An empty slice yields `floor`.
pub fn cutoff(scores: &[f64], floor: f64) -> f64 {
    if scores.is_empty() {
        return floor;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    if median > 0.0 && median <= floor {
        floor
    } else {
        median
    }
}

/// Scores abstracts against a word matrix, a journal matrix and a pair
/// matrix
pub struct Scorer<'a> {
    words: &'a ScoreMatrix,
    journals: &'a JournalFrequencyMap,
    pairs: &'a PairFrequencyMap,
    stoplist: &'a StopList,
    locus_tag: Regex,
    terms: Vec<(String, f64)>,
    term_match: TermMatch,
    pair_min_value: f64,
    pair_weight: f64,
    cutoff_floor: f64,
    segmenter: SentenceSegmenter,
    field: TextField,
}

impl<'a> Scorer<'a> {
    pub fn new(
        words: &'a ScoreMatrix,
        journals: &'a JournalFrequencyMap,
        pairs: &'a PairFrequencyMap,
        stoplist: &'a StopList,
        config: &ScoringConfig,
    ) -> ScoringResult<Self> {
        let locus_tag = Regex::new(&config.locus_tag_pattern)
            .map_err(|e| ScoringError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            words,
            journals,
            pairs,
            stoplist,
            locus_tag,
            terms: config
                .terms
                .iter()
                .map(|(term, bonus)| (term.to_lowercase(), *bonus))
                .collect(),
            term_match: config.term_match,
            pair_min_value: config.pair_min_value,
            pair_weight: config.pair_weight,
            cutoff_floor: config.cutoff_floor,
            segmenter: config.segmenter,
            field: TextField::Raw,
        })
    }

    pub fn from_bundle(
        bundle: &'a ModelBundle,
        stoplist: &'a StopList,
        config: &ScoringConfig,
    ) -> ScoringResult<Self> {
        Self::new(
            &bundle.words,
            &bundle.journals,
            &bundle.pairs,
            stoplist,
            config,
        )
    }

    pub fn with_text_field(mut self, field: TextField) -> Self {
        self.field = field;
        self
    }

    /// Score a single text. Contributions are accumulated in a fixed order:
    /// locus tags, then per token (matrix, then terms), journal, pairs.
    pub fn score_text(&self, text: &str, journal: &str) -> ScoreBreakdown {
        let mut b = ScoreBreakdown::default();
        let mut total = 0.0;

        let tags = self.locus_tag.find_iter(text).count() as f64;
        b.locus_tags = tags;
        total += tags;

        for token in word_tokens(text).filter(|t| !self.stoplist.contains(t)) {
            let lower = token.to_lowercase();
            if let Some(&value) = self.words.get(&lower) {
                b.words += value;
                total += value;
            }
            for (term, bonus) in &self.terms {
                if self.term_match.matches(&lower, term) {
                    b.terms += bonus;
                    total += bonus;
                }
            }
        }

        if let Some(&bonus) = self.journals.get(journal) {
            b.journal = bonus;
            total += bonus;
        }

        for_each_pair_key(text, self.stoplist, self.segmenter, |key| {
            if let Some(&value) = self.pairs.get(&key) {
                if value > self.pair_min_value {
                    let contribution = value * self.pair_weight;
                    b.pairs += contribution;
                    total += contribution;
                }
            }
        });

        b.total = total;
        b
    }

    pub fn score_abstract(&self, abstract_: &Abstract) -> ScoringResult<ScoreBreakdown> {
        self.score_at(0, abstract_)
    }

    fn score_at(&self, index: usize, abstract_: &Abstract) -> ScoringResult<ScoreBreakdown> {
        let text = checked_text(abstract_, index, self.field)?;
        Ok(self.score_text(text, &abstract_.journal))
    }

    /// Total score of every abstract, in corpus order
    pub fn score_corpus(&self, corpus: &[Abstract]) -> ScoringResult<Vec<f64>> {
        corpus
            .par_iter()
            .enumerate()
            .map(|(index, abstract_)| self.score_at(index, abstract_).map(|b| b.total))
            .collect()
    }

    /// Score, classify and (in `Evaluate` mode) compute metrics
    pub fn run(&self, corpus: &[Abstract], mode: ScoreMode) -> ScoringResult<ScoreOutcome> {
        if mode == ScoreMode::Evaluate {
            check_labels(corpus)?;
        }

        let scores = self.score_corpus(corpus)?;
        let cutoff = cutoff(&scores, self.cutoff_floor);
        debug!("Scored {} abstracts, cutoff {:.3}", scores.len(), cutoff);

        let records: Vec<ScoredAbstract> = corpus
            .iter()
            .zip(&scores)
            .map(|(abstract_, &score)| ScoredAbstract {
                id: abstract_.id.clone(),
                score,
                label: abstract_.label,
                prediction: Label::from_bool(score >= cutoff),
            })
            .collect();
        let classification = Classification { cutoff, records };
        info!(
            "Classified {} of {} abstracts as positive",
            classification.positives(),
            classification.records.len()
        );

        match mode {
            ScoreMode::Predictions => Ok(ScoreOutcome::Predictions(classification)),
            ScoreMode::Evaluate => {
                let y_true: Vec<Label> = corpus.iter().filter_map(|a| a.label).collect();
                let y_pred: Vec<Label> =
                    classification.records.iter().map(|r| r.prediction).collect();
                let metrics = metrics::evaluate(&y_true, &y_pred, &scores)?;
                Ok(ScoreOutcome::Evaluated {
                    classification,
                    metrics,
                })
            }
        }
    }
}

fn check_labels(corpus: &[Abstract]) -> ScoringResult<()> {
    let mut unlabeled = corpus.iter().filter(|a| a.label.is_none());
    if let Some(first) = unlabeled.next() {
        return Err(ScoringError::MissingLabels {
            missing: 1 + unlabeled.count(),
            total: corpus.len(),
            first_id: first.id.clone(),
        });
    }
    Ok(())
}

//! Word and word-pair scoring matrices
//!
//! This module turns two labeled corpora into scoring tables and applies
//! them to unseen abstracts.
//!
//! # Pipeline
//!
//! ```text
//! positive corpus ─┐
//!                  ├─ profile_frequencies ─┐
//! background ──────┘                       ├─ build_matrix ──────┐
//!                                          │                     ├─ Scorer::run
//! positive texts ──┬─ profile_pairs ───────┴─────────────────────┘
//! background texts ┘
//! ```
//!
//! # Per-abstract score
//!
//! ```text
//! score = locus_tags
//!       + Σ word_matrix[token] + Σ term_bonus(token)
//!       + journal_bonus
//!       + Σ pair_weight × pairs[pair]   (pairs[pair] > pair_min_value)
//! ```
//!
//! The cutoff is the median score, raised to `cutoff_floor` whenever the
//! median lies in (0, cutoff_floor].

mod bundle;
mod frequency;
mod matrix;
pub mod metrics;
mod pairs;
mod scorer;

pub use bundle::{load_table, save_table, ModelBundle};
pub use frequency::{profile_frequencies, FrequencyProfile, JournalFrequencyMap, WordFrequencyMap};
pub use matrix::{build_matrix, ScoreMatrix};
pub use metrics::EvaluationMetrics;
pub use pairs::{profile_pairs, PairFrequencyMap, PairKey};
pub use scorer::{cutoff, Classification, ScoreBreakdown, ScoreMode, ScoreOutcome, Scorer};

use crate::models::{Abstract, TextField};
use thiserror::Error;

/// Errors raised by the scoring core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Cannot compute {what}: corpus is empty")]
    DivisionUndefined { what: &'static str },

    #[error("Ground-truth labels missing for {missing} of {total} abstracts (first: {first_id})")]
    MissingLabels {
        missing: usize,
        total: usize,
        first_id: String,
    },

    #[error("Malformed abstract #{index} (id {id:?}): {reason}")]
    MalformedAbstract {
        index: usize,
        id: String,
        reason: String,
    },

    #[error("Invalid locus-tag pattern: {0}")]
    InvalidPattern(String),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// The text the tokenizers see for `abstract_`, after checking the fields
/// every component relies on.
pub(crate) fn checked_text(
    abstract_: &Abstract,
    index: usize,
    field: TextField,
) -> ScoringResult<&str> {
    let malformed = |reason: &str| ScoringError::MalformedAbstract {
        index,
        id: abstract_.id.clone(),
        reason: reason.to_string(),
    };

    if abstract_.title.trim().is_empty() {
        return Err(malformed("empty title"));
    }
    let text = match field {
        TextField::Raw => abstract_.text.as_str(),
        TextField::Processed => abstract_
            .processed_text
            .as_deref()
            .ok_or_else(|| malformed("no processed text; run `cardshark preprocess` first"))?,
    };
    if text.trim().is_empty() {
        return Err(malformed("empty text"));
    }
    Ok(text)
}

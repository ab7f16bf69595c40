//! Single-word and journal frequency profiles

use super::{checked_text, ScoringError, ScoringResult};
use crate::models::{Abstract, TextField};
use crate::text::{word_tokens, StopList};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Lower-cased word → occurrences / abstracts
pub type WordFrequencyMap = FxHashMap<String, f64>;

/// Journal → (abstracts in journal / abstracts) × 10
pub type JournalFrequencyMap = FxHashMap<String, f64>;

/// Output of [`profile_frequencies`]
#[derive(Debug, Clone)]
pub struct FrequencyProfile {
    pub words: WordFrequencyMap,
    pub journals: JournalFrequencyMap,
    /// Texts in corpus order, for the pair profiler
    pub texts: Vec<String>,
}

impl FrequencyProfile {
    pub fn abstracts(&self) -> usize {
        self.texts.len()
    }
}

/// Count word and journal frequencies over a corpus.
///
/// Fails with `DivisionUndefined` on an empty corpus and with
/// `MalformedAbstract` on empty titles or texts.
pub fn profile_frequencies(
    corpus: &[Abstract],
    stoplist: &StopList,
    field: TextField,
) -> ScoringResult<FrequencyProfile> {
    if corpus.is_empty() {
        return Err(ScoringError::DivisionUndefined {
            what: "word frequencies",
        });
    }

    let mut word_counts: FxHashMap<String, usize> = FxHashMap::default();
    let mut journal_counts: FxHashMap<String, usize> = FxHashMap::default();
    let mut texts = Vec::with_capacity(corpus.len());

    for (index, abstract_) in corpus.iter().enumerate() {
        let text = checked_text(abstract_, index, field)?;
        texts.push(text.to_string());

        *journal_counts.entry(abstract_.journal.clone()).or_insert(0) += 1;

        for token in word_tokens(text).filter(|t| !stoplist.contains(t)) {
            *word_counts.entry(token.to_lowercase()).or_insert(0) += 1;
        }
    }

    let n = corpus.len() as f64;
    let words: WordFrequencyMap = word_counts
        .into_iter()
        .map(|(word, count)| (word, count as f64 / n))
        .collect();
    let journals: JournalFrequencyMap = journal_counts
        .into_iter()
        .map(|(journal, count)| (journal, count as f64 / n * 10.0))
        .collect();

    debug!(
        "Profiled {} abstracts: {} words, {} journals",
        corpus.len(),
        words.len(),
        journals.len()
    );

    Ok(FrequencyProfile {
        words,
        journals,
        texts,
    })
}

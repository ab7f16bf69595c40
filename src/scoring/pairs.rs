//! Sentence-level word-pair co-occurrence profiles

use super::{ScoringError, ScoringResult};
use crate::text::{for_each_pair, SentenceSegmenter, StopList};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use tracing::debug;

/// Canonical key for an unordered pair of lower-cased words: the two words
/// sorted and joined with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        Self::from_lowercase(&a, &b)
    }

    /// Build from tokens that are already lower-case
    fn from_lowercase(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut key = String::with_capacity(first.len() + second.len() + 1);
        key.push_str(first);
        key.push('|');
        key.push_str(second);
        PairKey(key)
    }
}

impl Borrow<str> for PairKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pair → (positive rate − background rate)
pub type PairFrequencyMap = FxHashMap<PairKey, f64>;

/// Visit the key of every ordered co-occurring pair in `text`.
pub(crate) fn for_each_pair_key<F>(
    text: &str,
    stoplist: &StopList,
    segmenter: SentenceSegmenter,
    mut visit: F,
) where
    F: FnMut(PairKey),
{
    for sentence in segmenter.split(text) {
        for_each_pair(sentence, stoplist, |thing, word| {
            visit(PairKey::from_lowercase(thing, word));
        });
    }
}

/// Build the pair scoring matrix.
///
/// Every pair emitted from the positive corpus adds `1 / |positive|`. Pairs
/// from the background corpus subtract `1 / |background|`, but only from
/// pairs the positive pass already created; background-only pairs never
/// enter the map.
pub fn profile_pairs<S: AsRef<str>>(
    positive: &[S],
    background: &[S],
    stoplist: &StopList,
    segmenter: SentenceSegmenter,
) -> ScoringResult<PairFrequencyMap> {
    if positive.is_empty() {
        return Err(ScoringError::DivisionUndefined {
            what: "pair frequencies",
        });
    }

    let mut pairs = PairFrequencyMap::default();

    let weight = 1.0 / positive.len() as f64;
    for text in positive {
        for_each_pair_key(text.as_ref(), stoplist, segmenter, |key| {
            *pairs.entry(key).or_insert(0.0) += weight;
        });
    }
    let positive_pairs = pairs.len();

    if !background.is_empty() {
        let weight = 1.0 / background.len() as f64;
        for text in background {
            for_each_pair_key(text.as_ref(), stoplist, segmenter, |key| {
                if let Some(score) = pairs.get_mut(&key) {
                    *score -= weight;
                }
            });
        }
    }

    debug!(
        "Profiled {} pairs from {} positive / {} background abstracts",
        positive_pairs,
        positive.len(),
        background.len()
    );

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEG: SentenceSegmenter = SentenceSegmenter::Delimiter;

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(PairKey::new("Gene", "drug"), PairKey::new("drug", "GENE"));
        assert_eq!(PairKey::new("gene", "drug").to_string(), "drug|gene");
    }

    #[test]
    fn test_positive_pairs_count_both_orders() {
        let pairs = profile_pairs(&["gene drug"], &[] as &[&str], &StopList::default(), SEG)
            .expect("pairs");
        assert_eq!(pairs.len(), 1);
        // (gene, drug) and (drug, gene) both land on drug|gene
        assert_eq!(pairs["drug|gene"], 2.0);
    }

    #[test]
    fn test_pairs_stay_within_sentences() {
        let pairs = profile_pairs(&["gene drug. plasmid host"], &[] as &[&str], &StopList::default(), SEG)
            .expect("pairs");
        assert!(pairs.contains_key("drug|gene"));
        assert!(pairs.contains_key("host|plasmid"));
        assert!(!pairs.contains_key("drug|plasmid"));
    }

    #[test]
    fn test_empty_background_is_positive_only_count() {
        let positive = ["gene drug", "gene drug host", "unrelated text"];
        let pairs = profile_pairs(&positive, &[] as &[&str], &StopList::default(), SEG)
            .expect("pairs");

        let w = 1.0 / 3.0;
        let mut expected = PairFrequencyMap::default();
        for text in positive {
            for_each_pair_key(text, &StopList::default(), SEG, |key| {
                *expected.entry(key).or_insert(0.0) += w;
            });
        }
        assert_eq!(pairs, expected);
        assert!((pairs["drug|gene"] - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_background_subtracts_only_existing_pairs() {
        let pairs = profile_pairs(
            &["gene drug"],
            &["gene drug", "old immunity"],
            &StopList::default(),
            SEG,
        )
        .expect("pairs");

        // +2/1 from the positive pass, -2/2 from the background pass
        assert_eq!(pairs["drug|gene"], 1.0);
        assert!(!pairs.contains_key("immunity|old"));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_pairs_can_go_negative() {
        let pairs = profile_pairs(
            &["gene drug", "x y", "p q", "r s"],
            &["gene drug"],
            &StopList::default(),
            SEG,
        )
        .expect("pairs");
        assert_eq!(pairs["drug|gene"], 0.5 - 2.0);
    }

    #[test]
    fn test_stoplist_and_self_pairs() {
        let pairs = profile_pairs(&["The gene the GENE"], &[] as &[&str], &StopList::new(["the"]), SEG)
            .expect("pairs");
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_empty_positive_is_division_undefined() {
        let err = profile_pairs(&[] as &[&str], &["gene"], &StopList::default(), SEG).unwrap_err();
        assert!(matches!(err, ScoringError::DivisionUndefined { .. }));
    }
}

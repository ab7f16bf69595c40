//! Tokenizers, sentence segmentation and stop-lists
//!
//! Every component that looks at abstract text goes through this module so
//! that the profilers and the scorer agree on what a token, a sentence and
//! an excluded word are.

mod stopwords;

pub use stopwords::ENGLISH_STOP_WORDS;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Word tokens: alphanumeric/apostrophe runs of at least two characters
fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w[\w']*\w").expect("valid regex"))
}

/// Pair tokens: every alphanumeric run, single characters included
fn pair_token_pattern() -> &'static Regex {
    static PAIR_TOKEN: OnceLock<Regex> = OnceLock::new();
    PAIR_TOKEN.get_or_init(|| Regex::new(r"\b\w+").expect("valid regex"))
}

/// Tokens used for single-word frequencies and single-word scoring.
/// Case is preserved; callers lower-case after the stop-list check.
pub fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    word_pattern().find_iter(text).map(|m| m.as_str())
}

/// Tokens used for sentence-level pair co-occurrence.
pub fn pair_tokens(sentence: &str) -> impl Iterator<Item = &str> {
    pair_token_pattern().find_iter(sentence).map(|m| m.as_str())
}

/// Tokens excluded from every statistic.
///
/// Matching is case-insensitive: entries and probed tokens are both
/// lower-cased.
#[derive(Debug, Clone, Default)]
pub struct StopList {
    words: HashSet<String>,
}

impl StopList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// NLTK's English stop words
    pub fn english() -> Self {
        Self::new(ENGLISH_STOP_WORDS.iter())
    }

    /// Parse a stop-list file: one token per line, `#` comments allowed
    pub fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn contains(&self, token: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        if token.chars().any(char::is_uppercase) {
            self.words.contains(&token.to_lowercase())
        } else {
            self.words.contains(token)
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// How abstracts are cut into sentences for pair co-occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentenceSegmenter {
    /// Split on whitespace after `.` or `?`, except after `e.g.`-style
    /// (`x.y.`) and `Dr.`-style (`Ab.`) abbreviations
    #[default]
    Boundary,
    /// Split on the literal delimiter `". "`
    Delimiter,
}

impl SentenceSegmenter {
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            SentenceSegmenter::Delimiter => text.split(". ").collect(),
            SentenceSegmenter::Boundary => split_on_boundaries(text),
        }
    }
}

impl std::str::FromStr for SentenceSegmenter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boundary" => Ok(SentenceSegmenter::Boundary),
            "delimiter" => Ok(SentenceSegmenter::Delimiter),
            _ => Err(anyhow::anyhow!(
                "Unknown segmenter '{}'. Valid segmenters: boundary, delimiter",
                s
            )),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn split_on_boundaries(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, &(byte_idx, c)) in chars.iter().enumerate() {
        if !c.is_whitespace() || i == 0 {
            continue;
        }
        let prev = chars[i - 1].1;
        if prev != '.' && prev != '?' {
            continue;
        }
        // "e.g." / "i.e." : \w . \w <any>
        if i >= 4
            && is_word_char(chars[i - 4].1)
            && chars[i - 3].1 == '.'
            && is_word_char(chars[i - 2].1)
        {
            continue;
        }
        // "Dr." / "Fig." tail : [A-Z][a-z].
        if i >= 3
            && prev == '.'
            && chars[i - 3].1.is_ascii_uppercase()
            && chars[i - 2].1.is_ascii_lowercase()
        {
            continue;
        }
        sentences.push(&text[start..byte_idx]);
        start = byte_idx + c.len_utf8();
    }
    sentences.push(&text[start..]);
    sentences
}

/// Visit every ordered co-occurring pair in a sentence.
///
/// Tokens are lower-cased; stop-listed tokens and self-pairs are skipped.
/// A sentence with tokens `a b` yields `(a, b)` and `(b, a)`.
pub fn for_each_pair<F>(sentence: &str, stoplist: &StopList, mut visit: F)
where
    F: FnMut(&str, &str),
{
    let tokens: Vec<String> = pair_tokens(sentence)
        .filter(|t| !stoplist.contains(t))
        .map(str::to_lowercase)
        .collect();

    for thing in &tokens {
        for word in &tokens {
            if word != thing {
                visit(thing, word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_tokens_need_two_chars() {
        let tokens: Vec<_> = word_tokens("a novel gene's X-12 b").collect();
        assert_eq!(tokens, vec!["novel", "gene's", "12"]);
    }

    #[test]
    fn test_pair_tokens_keep_single_chars() {
        let tokens: Vec<_> = pair_tokens("gene X-12 confers").collect();
        assert_eq!(tokens, vec!["gene", "X", "12", "confers"]);
    }

    #[test]
    fn test_stoplist_is_case_insensitive() {
        let stop = StopList::new(["The", "of"]);
        assert!(stop.contains("the"));
        assert!(stop.contains("THE"));
        assert!(stop.contains("Of"));
        assert!(!stop.contains("gene"));
    }

    #[test]
    fn test_stoplist_parse_skips_comments() {
        let stop = StopList::parse("# header\nthe\n\n  and \n");
        assert_eq!(stop.len(), 2);
        assert!(stop.contains("and"));
    }

    #[test]
    fn test_delimiter_segmenter() {
        let parts = SentenceSegmenter::Delimiter.split("One two. Three e.g. four. Five");
        assert_eq!(parts, vec!["One two", "Three e.g", "four", "Five"]);
    }

    #[test]
    fn test_boundary_segmenter_keeps_abbreviations() {
        let parts = SentenceSegmenter::Boundary
            .split("Genes were found, e.g. blaA. Dr. Smith agreed? Yes.");
        assert_eq!(
            parts,
            vec!["Genes were found, e.g. blaA.", "Dr. Smith agreed?", "Yes."]
        );
    }

    #[test]
    fn test_boundary_segmenter_single_sentence() {
        assert_eq!(SentenceSegmenter::Boundary.split("no split here"), vec!["no split here"]);
        assert_eq!(SentenceSegmenter::Boundary.split(""), vec![""]);
    }

    #[test]
    fn test_for_each_pair_is_ordered_and_skips_self_pairs() {
        let mut seen = Vec::new();
        for_each_pair("Gene gene drug", &StopList::default(), |a, b| {
            seen.push(format!("{a}>{b}"));
        });
        // gene/gene is a self-pair after lower-casing
        assert_eq!(seen, vec!["gene>drug", "gene>drug", "drug>gene", "drug>gene"]);
    }

    #[test]
    fn test_for_each_pair_respects_stoplist() {
        let mut count = 0;
        for_each_pair("the gene drug", &StopList::new(["THE"]), |_, _| count += 1);
        assert_eq!(count, 2);
    }
}

//! Text normalization: lower-case, strip punctuation, drop stop words,
//! stem, drop numbers

use crate::models::Abstract;
use crate::text::StopList;
use anyhow::Result;
use rayon::prelude::*;
use rust_stemmers::{Algorithm, Stemmer};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Preprocessor {
    stemmer: Stemmer,
    stoplist: StopList,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(StopList::english())
    }
}

impl Preprocessor {
    pub fn new(stoplist: StopList) -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            stoplist,
        }
    }

    pub fn process(&self, text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.to_lowercase().chars() {
            match c {
                '?' | '|' | '!' | '\'' | '"' | '#' => {}
                '.' | ',' | ')' | '(' | '/' => cleaned.push(' '),
                _ => cleaned.push(c),
            }
        }

        cleaned
            .split_whitespace()
            .filter(|word| !self.stoplist.contains(word))
            .map(|word| self.stemmer.stem(word))
            .filter(|stem| !stem.chars().all(char::is_numeric))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Fill `processed_text` for every abstract, in place, using `workers`
/// threads. `on_progress` receives the running count of processed
/// abstracts.
pub fn preprocess_corpus<F>(
    corpus: &mut [Abstract],
    preprocessor: &Preprocessor,
    workers: usize,
    on_progress: F,
) -> Result<()>
where
    F: Fn(usize) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    let done = AtomicUsize::new(0);

    pool.install(|| {
        corpus.par_iter_mut().for_each(|abstract_| {
            abstract_.processed_text = Some(preprocessor.process(&abstract_.text));
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
        });
    });
    Ok(())
}

//! Profile command - word and journal frequency tables for one corpus

use crate::corpus::load_corpus_path;
use crate::models::TextField;
use crate::scoring::{profile_frequencies, save_table};
use crate::text::StopList;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub const WORDS_FILE: &str = "words.json";
pub const JOURNALS_FILE: &str = "journals.json";

pub fn run(corpus_path: &Path, stoplist: &StopList, field: TextField, out: &Path) -> Result<()> {
    let corpus = load_corpus_path(corpus_path)?;
    let profile = profile_frequencies(&corpus, stoplist, field)
        .with_context(|| format!("Failed to profile {}", corpus_path.display()))?;

    save_table(&profile.words, &out.join(WORDS_FILE))?;
    save_table(&profile.journals, &out.join(JOURNALS_FILE))?;

    println!(
        "{} Profiled {} abstracts: {} words, {} journals → {}",
        style("✓").green(),
        profile.abstracts(),
        profile.words.len(),
        profile.journals.len(),
        style(out.display()).cyan()
    );
    Ok(())
}

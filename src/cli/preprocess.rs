//! Preprocess command - fill `processed_text` for a corpus file

use super::bar_style;
use crate::corpus::{load_corpus, preprocess_corpus, save_corpus, Preprocessor};
use crate::text::StopList;
use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Instant;

pub fn run(input: &Path, output: Option<&Path>, stoplist: Option<&Path>, workers: usize) -> Result<()> {
    let start = Instant::now();
    let mut corpus = load_corpus(input)?;

    let preprocessor = match stoplist {
        Some(path) => Preprocessor::new(
            StopList::load(path)
                .with_context(|| format!("Failed to load stop-word list {}", path.display()))?,
        ),
        None => Preprocessor::default(),
    };

    let bar = ProgressBar::new(corpus.len() as u64);
    bar.set_style(bar_style());
    bar.set_message("preprocessing");
    preprocess_corpus(&mut corpus, &preprocessor, workers, |done| {
        bar.set_position(done as u64);
    })?;
    bar.finish_and_clear();

    let target = output.unwrap_or(input);
    save_corpus(target, &corpus)?;
    println!(
        "{} Preprocessed {} abstracts in {:.1}s → {}",
        style("✓").green(),
        corpus.len(),
        start.elapsed().as_secs_f64(),
        style(target.display()).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_writes_processed_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("corpus.json");
        std::fs::write(
            &input,
            r#"[{"pmid": 7, "text": "The genes were found.", "title": "T", "journal": "J"}]"#,
        )
        .expect("write");
        let output = dir.path().join("clean.jsonl");

        run(&input, Some(&output), None, 2).expect("preprocess");

        let corpus = load_corpus(&output).expect("load");
        assert_eq!(corpus[0].processed_text.as_deref(), Some("gene found"));
        assert_eq!(corpus[0].id, "7");
    }

    #[test]
    fn test_preprocess_csv_in_place_stays_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("corpus.csv");
        std::fs::write(&input, "pmid,text,title,journal\n7,The genes were found.,T,J\n")
            .expect("write");

        run(&input, None, None, 2).expect("preprocess");

        let corpus = load_corpus(&input).expect("reload csv");
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].id, "7");
        assert_eq!(corpus[0].text, "The genes were found.");
        assert_eq!(corpus[0].processed_text.as_deref(), Some("gene found"));
    }
}

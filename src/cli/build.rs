//! Build command - learn a model bundle from two corpora

use super::spinner_style;
use crate::config::ProjectConfig;
use crate::corpus::load_corpus_path;
use crate::models::TextField;
use crate::scoring::{build_matrix, profile_frequencies, profile_pairs, ModelBundle};
use crate::text::StopList;
use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

pub fn run(
    config: &ProjectConfig,
    positive_path: &Path,
    background_path: &Path,
    stoplist: &StopList,
    field: TextField,
    filter: bool,
    output: &Path,
) -> Result<()> {
    let start = Instant::now();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Loading corpora...");
    let positive = load_corpus_path(positive_path)?;
    let background = load_corpus_path(background_path)?;

    spinner.set_message("Profiling word and journal frequencies...");
    let pos_profile = profile_frequencies(&positive, stoplist, field)
        .with_context(|| format!("Failed to profile {}", positive_path.display()))?;
    let bg_profile = profile_frequencies(&background, stoplist, field)
        .with_context(|| format!("Failed to profile {}", background_path.display()))?;

    let min_difference = filter.then_some(config.scoring.min_difference);
    let words = build_matrix(&pos_profile.words, &bg_profile.words, min_difference);
    let journals = build_matrix(&pos_profile.journals, &bg_profile.journals, None);

    spinner.set_message("Profiling word pairs...");
    let pairs = profile_pairs(
        &pos_profile.texts,
        &bg_profile.texts,
        stoplist,
        config.scoring.segmenter,
    )?;
    spinner.finish_and_clear();

    info!(
        "Word matrix {} entries, journal matrix {}, pair matrix {}",
        words.len(),
        journals.len(),
        pairs.len()
    );

    let bundle = ModelBundle::new(
        words,
        journals,
        pairs,
        positive.len(),
        background.len(),
        min_difference,
        config.scoring.segmenter,
    );
    bundle.save(output)?;

    println!(
        "{} Built model from {} positive / {} background abstracts in {:.1}s",
        style("✓").green(),
        bundle.positive_abstracts,
        bundle.background_abstracts,
        start.elapsed().as_secs_f64()
    );
    println!(
        "  words: {}  journals: {}  pairs: {}",
        bundle.words.len(),
        bundle.journals.len(),
        bundle.pairs.len()
    );
    println!("  Saved to: {}", style(output.display()).cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn test_build_writes_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let positive = write(
            dir.path(),
            "pos.json",
            r#"[{"pmid": 1, "text": "novel gene confers resistance", "title": "T", "journal": "AAC"}]"#,
        );
        let background = write(
            dir.path(),
            "bg.json",
            r#"[{"pmid": 2, "text": "gene expression", "title": "T", "journal": "AAC"}]"#,
        );
        let output = dir.path().join("model.json");

        run(
            &ProjectConfig::default(),
            &positive,
            &background,
            &StopList::default(),
            TextField::Raw,
            false,
            &output,
        )
        .expect("build");

        let bundle = ModelBundle::load(&output).expect("load");
        assert_eq!(bundle.positive_abstracts, 1);
        assert_eq!(bundle.words.get("gene"), Some(&0.0));
        assert!(!bundle.words.contains_key("novel"));
        assert_eq!(bundle.journals.get("AAC"), Some(&0.0));
        assert_eq!(bundle.min_difference, None);
        assert!(!bundle.pairs.is_empty());
    }
}

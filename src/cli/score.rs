//! Score command - classify a corpus and optionally evaluate it

use super::emit;
use crate::config::{ProjectConfig, ScoringConfig};
use crate::corpus::load_corpus_path;
use crate::models::{Abstract, TextField};
use crate::reporters::{self, OutputFormat};
use crate::scoring::{Classification, ModelBundle, ScoreMode, Scorer};
use crate::text::StopList;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ScoreOptions {
    pub field: TextField,
    pub predictions_only: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub predictions_out: Option<PathBuf>,
    pub model_name: String,
    pub workers: usize,
}

/// Evaluate whenever the corpus carries labels, unless told not to
fn score_mode(corpus: &[Abstract], predictions_only: bool) -> ScoreMode {
    if !predictions_only && corpus.iter().any(|a| a.label.is_some()) {
        ScoreMode::Evaluate
    } else {
        ScoreMode::Predictions
    }
}

/// `{model: [[pmid, prediction], ...]}`, the format `cardshark validate` reads
fn write_predictions(path: &Path, model: &str, classification: &Classification) -> Result<()> {
    let rows: Vec<(&str, u8)> = classification
        .records
        .iter()
        .map(|r| (r.id.as_str(), r.prediction.as_u8()))
        .collect();
    let mut table = IndexMap::new();
    table.insert(model, rows);
    std::fs::write(path, serde_json::to_string_pretty(&table)?)
        .with_context(|| format!("Failed to write predictions {}", path.display()))?;
    info!("Wrote {} predictions to {}", classification.records.len(), path.display());
    Ok(())
}

/// Scoring settings for `bundle`: pairs are counted with the segmenter the
/// bundle was built with, whatever the project config says.
fn bundle_scoring_config(bundle: &ModelBundle, config: &ScoringConfig) -> ScoringConfig {
    if bundle.segmenter != config.segmenter {
        warn!(
            "Model was built with the {:?} segmenter but config asks for {:?}; using {:?}",
            bundle.segmenter, config.segmenter, bundle.segmenter
        );
    }
    ScoringConfig {
        segmenter: bundle.segmenter,
        ..config.clone()
    }
}

pub fn run(
    config: &ProjectConfig,
    corpus_path: &Path,
    model_path: &Path,
    stoplist: &StopList,
    options: &ScoreOptions,
) -> Result<()> {
    let bundle = ModelBundle::load(model_path)?;
    let corpus = load_corpus_path(corpus_path)?;
    let mode = score_mode(&corpus, options.predictions_only);

    let scoring = bundle_scoring_config(&bundle, &config.scoring);
    let scorer = Scorer::from_bundle(&bundle, stoplist, &scoring)?.with_text_field(options.field);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()?;
    let outcome = pool
        .install(|| scorer.run(&corpus, mode))
        .with_context(|| format!("Failed to score {}", corpus_path.display()))?;

    if let Some(path) = &options.predictions_out {
        write_predictions(path, &options.model_name, outcome.classification())?;
    }

    let rendered = reporters::render_score(&outcome, options.format)?;
    emit(&rendered, options.output.as_deref())
}

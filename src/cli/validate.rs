//! Validate command - compare predictions with reviewer sheets

use crate::config::ProjectConfig;
use crate::reporters::{self, OutputFormat};
use crate::validation::{create_validation_set, tabulate, PredictionTable};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Validation set name: the directory's last component
fn set_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

pub fn run(
    config: &ProjectConfig,
    sets: &[PathBuf],
    prediction_files: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    let validation = &config.validation;

    let mut predictions = PredictionTable::default();
    for path in prediction_files {
        predictions
            .load(path, &validation.label_terms)
            .with_context(|| format!("Failed to load predictions {}", path.display()))?;
    }
    if predictions.is_empty() {
        anyhow::bail!("Prediction files contain no models");
    }

    let mut reports = Vec::with_capacity(sets.len());
    for dir in sets {
        let name = set_name(dir);
        let mut set = create_validation_set(&name, dir, validation)
            .with_context(|| format!("Failed to read validation set {}", dir.display()))?;

        let corrected = set.apply_corrections(&validation.corrections)?;
        let dropped = set.remove_conflicts();
        info!(
            "Validation set {}: {} rows, {} corrections, {} conflicting rows dropped",
            name,
            set.rows.len(),
            corrected,
            dropped
        );

        reports.push(tabulate(&set, &predictions).with_context(|| format!("Validation set {}", name))?);
    }

    println!("{}", reporters::render_validation(&reports, format)?);
    Ok(())
}

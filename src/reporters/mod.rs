//! Output reporters for cardshark results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::pubmed::DownloadReport;
use crate::scoring::ScoreOutcome;
use crate::validation::ValidationReport;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a scoring run (predictions, plus metrics in evaluate mode)
pub fn render_score(outcome: &ScoreOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_score(outcome),
        OutputFormat::Json => json::render_score(outcome),
    }
}

/// Render one report per validation set
pub fn render_validation(reports: &[ValidationReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_validation(reports),
        OutputFormat::Json => json::render_validation(reports),
    }
}

/// Render the per-range download summary
pub fn render_downloads(reports: &[DownloadReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_downloads(reports),
        OutputFormat::Json => json::render_downloads(reports),
    }
}

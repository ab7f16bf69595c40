//! Download command - fetch PubMed abstracts per date range

use super::bar_style;
use crate::config::{ProjectConfig, UserConfig};
use crate::corpus::save_corpus;
use crate::pubmed::{load_date_ranges, DateRange, PubmedClient};
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::Path;
use tracing::info;

/// Ranges from `--range` flags followed by those in `--ranges-file`
fn collect_ranges(flags: &[String], file: Option<&Path>) -> Result<Vec<DateRange>> {
    let mut ranges = flags
        .iter()
        .map(|s| s.parse::<DateRange>().map_err(anyhow::Error::from))
        .collect::<Result<Vec<_>>>()?;
    if let Some(path) = file {
        ranges.extend(load_date_ranges(path)?);
    }
    if ranges.is_empty() {
        anyhow::bail!("No date ranges given. Use --range START:END or --ranges-file FILE");
    }
    Ok(ranges)
}

pub fn run(
    config: &ProjectConfig,
    range_flags: &[String],
    ranges_file: Option<&Path>,
    out: &Path,
    format: OutputFormat,
) -> Result<()> {
    let ranges = collect_ranges(range_flags, ranges_file)?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;

    let user = UserConfig::load()?;
    let client = PubmedClient::new(&config.download, &user);

    let mut reports = Vec::with_capacity(ranges.len());
    for range in &ranges {
        let bar = ProgressBar::new(0);
        bar.set_style(bar_style());
        bar.set_message(format!("{}", range));

        let report = client
            .download_range(range, |done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            })
            .with_context(|| format!("Download failed for {}", range))?;
        bar.finish_and_clear();

        let path = out.join(range.file_name());
        save_corpus(&path, &report.papers)?;
        info!("Wrote {} abstracts to {}", report.papers.len(), path.display());
        reports.push(report);
    }

    println!("{}", reporters::render_downloads(&reports, format)?);
    Ok(())
}

//! Reviewer validation sheets
//!
//! Reviewers label abstracts in CSV sheets, one row per (reviewer pass,
//! pmid). This module merges the sheets, resolves the label vocabulary,
//! applies manual corrections and drops pmids whose reviewers disagree.
//! [`tabulate`] then compares model predictions against the agreed
//! ground truth.

mod outcome;

pub use outcome::{
    ground_truth, tabulate, Outcome, OutcomeTally, PredictionTable, RowOutcome, ValidationReport,
};

use crate::config::ValidationConfig;
use crate::models::Label;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while merging validation data
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("No validation sheets in {dir} have names containing {terms:?}")]
    NoSheets { dir: String, terms: Vec<String> },

    #[error("At least two reviewer label headers are required, got {0}")]
    NotEnoughHeaders(usize),

    #[error("{file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("Row {row} (pmid {pmid}): unresolved label {value:?} in column '{header}'")]
    UnresolvedLabel {
        row: usize,
        pmid: String,
        header: String,
        value: String,
    },

    #[error("Invalid correction: {0}")]
    InvalidCorrection(String),

    #[error("Model '{model}' has no prediction for pmid {pmid}")]
    MissingPrediction { model: String, pmid: String },

    #[error("Invalid prediction file {file}: {reason}")]
    InvalidPredictions { file: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// One reviewed row
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRow {
    /// Position in the merged sheet, before conflict removal
    pub index: usize,
    pub pmid: String,
    /// Sheet file name
    pub source: String,
    /// Raw cells keyed by column name
    pub cells: IndexMap<String, String>,
    /// One entry per configured header; `None` when the cell is not in the
    /// label vocabulary
    pub labels: Vec<Option<Label>>,
}

impl ValidationRow {
    pub fn raw(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Merged reviewer sheets for one validation set
#[derive(Debug, Clone)]
pub struct ValidationSet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<ValidationRow>,
    /// Rows removed by [`ValidationSet::remove_conflicts`]
    pub dropped_rows: usize,
}

/// Read every CSV sheet in `dir` whose file name contains all of
/// `config.filename_terms`, in file-name order.
pub fn create_validation_set(
    name: &str,
    dir: &Path,
    config: &ValidationConfig,
) -> ValidationResult<ValidationSet> {
    if config.headers.len() < 2 {
        return Err(ValidationError::NotEnoughHeaders(config.headers.len()));
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| config.filename_terms.iter().all(|t| n.contains(t.as_str())))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ValidationError::NoSheets {
            dir: dir.display().to_string(),
            terms: config.filename_terms.clone(),
        });
    }

    let mut rows = Vec::new();
    for path in &files {
        read_sheet(path, config, &mut rows)?;
    }
    info!(
        "Validation set '{}': {} rows from {} sheets",
        name,
        rows.len(),
        files.len()
    );

    Ok(ValidationSet {
        name: name.to_string(),
        headers: config.headers.clone(),
        rows,
        dropped_rows: 0,
    })
}

fn read_sheet(
    path: &Path,
    config: &ValidationConfig,
    rows: &mut Vec<ValidationRow>,
) -> ValidationResult<()> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let columns = reader.headers()?.clone();

    for required in std::iter::once(&config.id_column).chain(&config.headers) {
        if !columns.iter().any(|c| c == required) {
            return Err(ValidationError::MissingColumn {
                file: source.clone(),
                column: required.clone(),
            });
        }
    }

    for record in reader.records() {
        let record = record?;
        let cells: IndexMap<String, String> = columns
            .iter()
            .zip(record.iter())
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .collect();
        let labels = config
            .headers
            .iter()
            .map(|h| {
                let raw = cells.get(h).map(String::as_str).unwrap_or("");
                config
                    .label_terms
                    .get(raw)
                    .and_then(|&v| Label::try_from(v).ok())
            })
            .collect();
        let pmid = cells
            .get(&config.id_column)
            .map(|p| p.trim().to_string())
            .unwrap_or_default();

        rows.push(ValidationRow {
            index: rows.len(),
            pmid,
            source: source.clone(),
            cells,
            labels,
        });
    }
    debug!("Read {}", source);
    Ok(())
}

impl ValidationSet {
    /// Apply manual label fixes: row index → header index → label
    pub fn apply_corrections(
        &mut self,
        corrections: &IndexMap<String, IndexMap<String, u8>>,
    ) -> ValidationResult<usize> {
        let mut applied = 0;
        for (row_key, fixes) in corrections {
            let row_index: usize = row_key
                .trim()
                .parse()
                .map_err(|_| ValidationError::InvalidCorrection(format!("row '{}'", row_key)))?;
            let row = self
                .rows
                .iter_mut()
                .find(|r| r.index == row_index)
                .ok_or_else(|| {
                    ValidationError::InvalidCorrection(format!("row {} does not exist", row_index))
                })?;

            for (header_key, &value) in fixes {
                let header: usize = header_key
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&h| h < self.headers.len())
                    .ok_or_else(|| {
                        ValidationError::InvalidCorrection(format!(
                            "header index '{}' (have {} headers)",
                            header_key,
                            self.headers.len()
                        ))
                    })?;
                let label = Label::try_from(value).map_err(ValidationError::InvalidCorrection)?;
                row.labels[header] = Some(label);
                applied += 1;
            }
        }
        debug!("Applied {} corrections", applied);
        Ok(applied)
    }

    /// Drop both rows of a pmid when its first two reviewer passes disagree
    /// on the first header, or on the second header while the first pass
    /// labeled the first header positive. Rows differing only in
    /// `abstract` are kept. Returns the number of rows dropped.
    pub fn remove_conflicts(&mut self) -> usize {
        let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (pos, row) in self.rows.iter().enumerate() {
            groups.entry(row.pmid.as_str()).or_default().push(pos);
        }

        let mut conflicting: HashSet<usize> = HashSet::new();
        for (pmid, positions) in &groups {
            let [first, second, ..] = positions.as_slice() else {
                debug!("pmid {} was reviewed once; needs at least two passes", pmid);
                continue;
            };
            let (a, b) = (&self.rows[*first], &self.rows[*second]);
            let diff = differing_columns(a, b, &self.headers);
            if diff.is_empty() || (diff.len() == 1 && diff[0] == "abstract") {
                continue;
            }

            let first_header = diff.contains(&self.headers[0].as_str());
            let second_header = diff.contains(&self.headers[1].as_str());
            if first_header || (second_header && a.labels[0] == Some(Label::Positive)) {
                conflicting.insert(*first);
                conflicting.insert(*second);
            }
        }

        let before = self.rows.len();
        let mut pos = 0;
        self.rows.retain(|_| {
            let keep = !conflicting.contains(&pos);
            pos += 1;
            keep
        });
        let dropped = before - self.rows.len();
        self.dropped_rows += dropped;
        info!("{} rows dropped due to conflicts", dropped);
        dropped
    }
}

/// Columns whose values differ between two rows. Header columns compare
/// resolved labels; everything else compares raw cells.
fn differing_columns<'a>(
    a: &'a ValidationRow,
    b: &'a ValidationRow,
    headers: &'a [String],
) -> Vec<&'a str> {
    let mut diff: Vec<&str> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| a.labels[*i] != b.labels[*i])
        .map(|(_, h)| h.as_str())
        .collect();

    let mut seen: HashSet<&str> = headers.iter().map(String::as_str).collect();
    for column in a.cells.keys().chain(b.cells.keys()) {
        if !seen.insert(column.as_str()) {
            continue;
        }
        if a.cells.get(column) != b.cells.get(column) {
            diff.push(column.as_str());
        }
    }
    diff
}

//! Abstract corpora on disk
//!
//! Four layouts are accepted:
//! - a JSON array of records (what `cardshark download` writes)
//! - JSON lines, one record per line (`.jsonl` / `.ndjson`)
//! - column-oriented JSON, `{"text": {"0": "...", ...}, "title": {...}}`
//! - CSV with a header row (`.csv`)
//!
//! Records carry `id` (or `pmid`), `text`, `title`, `journal` and optionally
//! `label`, `processed_text` and `published`.

mod preprocess;

pub use preprocess::{preprocess_corpus, Preprocessor};

use crate::models::{Abstract, Label};
use crate::scoring::ScoringError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    JsonRecords,
    JsonLines,
    JsonColumns,
    Csv,
}

impl CorpusFormat {
    /// Pick a format from the file extension, falling back to the first
    /// JSON character for `.json` files
    pub fn detect(path: &Path, content: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("jsonl") | Some("ndjson") => CorpusFormat::JsonLines,
            Some("csv") => CorpusFormat::Csv,
            _ if content.trim_start().starts_with('{') => CorpusFormat::JsonColumns,
            _ => CorpusFormat::JsonRecords,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAbstract {
    #[serde(alias = "pmid")]
    id: Option<Value>,
    text: Option<String>,
    title: Option<String>,
    journal: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    processed_text: Option<String>,
    #[serde(default)]
    label: Option<Value>,
}

pub fn load_corpus(path: &Path) -> Result<Vec<Abstract>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;
    let format = CorpusFormat::detect(path, &content);
    let rows = parse_rows(&content, format)
        .with_context(|| format!("Failed to parse corpus {}", path.display()))?;

    let corpus = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| to_abstract(index, row))
        .collect::<Result<Vec<_>, ScoringError>>()
        .with_context(|| format!("Invalid record in {}", path.display()))?;

    debug!(
        "Loaded {} abstracts from {} ({:?})",
        corpus.len(),
        path.display(),
        format
    );
    Ok(corpus)
}

/// Load a corpus file, or every corpus file in a directory (file-name
/// order, concatenated)
pub fn load_corpus_path(path: &Path) -> Result<Vec<Abstract>> {
    if !path.is_dir() {
        return load_corpus(path);
    }

    let mut files: Vec<_> = std::fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e, "json" | "jsonl" | "ndjson" | "csv"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        anyhow::bail!("No corpus files (.json, .jsonl, .csv) in {}", path.display());
    }

    let mut corpus = Vec::new();
    for file in &files {
        corpus.extend(load_corpus(file)?);
    }
    debug!(
        "Loaded {} abstracts from {} files in {}",
        corpus.len(),
        files.len(),
        path.display()
    );
    Ok(corpus)
}

/// Columns written for CSV corpora; optional fields are left empty when absent
const CSV_COLUMNS: [&str; 7] = [
    "pmid",
    "text",
    "title",
    "journal",
    "published",
    "processed_text",
    "label",
];

fn corpus_to_csv(corpus: &[Abstract]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for a in corpus {
        let label = a.label.map(|l| l.as_u8().to_string()).unwrap_or_default();
        writer.write_record([
            a.id.as_str(),
            a.text.as_str(),
            a.title.as_str(),
            a.journal.as_str(),
            a.published.as_deref().unwrap_or(""),
            a.processed_text.as_deref().unwrap_or(""),
            label.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Write a corpus in the layout its extension names: CSV for `.csv`, JSON
/// lines for `.jsonl`, a JSON array otherwise
pub fn save_corpus(path: &Path, corpus: &[Abstract]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = match CorpusFormat::detect(path, "") {
        CorpusFormat::JsonLines => {
            let mut out = String::new();
            for abstract_ in corpus {
                out.push_str(&serde_json::to_string(abstract_)?);
                out.push('\n');
            }
            out
        }
        CorpusFormat::Csv => corpus_to_csv(corpus)?,
        _ => serde_json::to_string_pretty(corpus)?,
    };
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write corpus {}", path.display()))?;
    Ok(())
}

fn parse_rows(content: &str, format: CorpusFormat) -> Result<Vec<Map<String, Value>>> {
    match format {
        CorpusFormat::JsonRecords => Ok(serde_json::from_str(content)?),
        CorpusFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("line {}", n + 1))
            })
            .collect(),
        CorpusFormat::JsonColumns => {
            let columns: IndexMap<String, IndexMap<String, Value>> =
                serde_json::from_str(content)?;
            Ok(columns_to_rows(columns))
        }
        CorpusFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_reader(content.as_bytes());
            let headers = reader.headers()?.clone();
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record?;
                let row = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| {
                        let value = if v.is_empty() {
                            Value::Null
                        } else {
                            Value::String(v.to_string())
                        };
                        (h.to_string(), value)
                    })
                    .collect();
                rows.push(row);
            }
            Ok(rows)
        }
    }
}

/// Transpose `{column: {row: value}}` into rows, keeping first-seen row order
fn columns_to_rows(columns: IndexMap<String, IndexMap<String, Value>>) -> Vec<Map<String, Value>> {
    let mut rows: IndexMap<String, Map<String, Value>> = IndexMap::new();
    for (column, cells) in columns {
        for (row, value) in cells {
            rows.entry(row).or_default().insert(column.clone(), value);
        }
    }
    rows.into_values().collect()
}

fn to_abstract(index: usize, row: Map<String, Value>) -> Result<Abstract, ScoringError> {
    let id_hint = row
        .get("id")
        .or_else(|| row.get("pmid"))
        .and_then(value_to_string)
        .unwrap_or_default();
    let malformed = |reason: String| ScoringError::MalformedAbstract {
        index,
        id: id_hint.clone(),
        reason,
    };

    let raw: RawAbstract =
        serde_json::from_value(Value::Object(row)).map_err(|e| malformed(e.to_string()))?;

    let id = raw
        .id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| malformed("missing id".into()))?;
    let text = raw.text.ok_or_else(|| malformed("missing text".into()))?;
    let title = raw.title.ok_or_else(|| malformed("missing title".into()))?;
    let journal = raw.journal.ok_or_else(|| malformed("missing journal".into()))?;
    let label = match raw.label {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_label(&value).ok_or_else(|| {
            malformed(format!("label must be 0 or 1, got {}", value))
        })?),
    };

    Ok(Abstract {
        id,
        text,
        title,
        journal,
        published: raw.published,
        processed_text: raw.processed_text,
        label,
    })
}

/// PMIDs arrive as strings, integers, or floats from NaN-padded columns
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

fn parse_label(value: &Value) -> Option<Label> {
    match value {
        Value::Bool(b) => Some(Label::from_bool(*b)),
        Value::Number(n) => match n.as_f64()? {
            v if v == 0.0 => Some(Label::Negative),
            v if v == 1.0 => Some(Label::Positive),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Some(Label::Negative),
            "1" | "true" => Some(Label::Positive),
            _ => None,
        },
        _ => None,
    }
}

//! Project-level configuration support
//!
//! Loads per-project configuration from `cardshark.toml` in the working
//! directory (or an explicit `--config` path).
//!
//! # Configuration Format
//!
//! ```toml
//! # cardshark.toml
//!
//! [scoring]
//! min_difference = 0.05
//! term_match = "substring"
//! pair_min_value = 1.0
//! pair_weight = 0.25
//! cutoff_floor = 10.0
//! segmenter = "boundary"
//!
//! [scoring.terms]
//! novel = 5
//! characteriz = 3
//!
//! [validation]
//! headers = ["reviewer_1", "reviewer_2"]
//! filename_terms = ["card"]
//!
//! [validation.corrections]
//! 12 = { 0 = 1 }
//!
//! [download]
//! email = "me@example.org"
//! batch_size = 300
//!
//! [defaults]
//! workers = 8
//! ```

use crate::text::SentenceSegmenter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const CONFIG_FILENAME: &str = "cardshark.toml";

/// Default locus-tag pattern: three letters, an optional fourth, a hyphen
/// and one to three digits (`blaA-12`, `KPC-2`).
/// Only the fourth letter is optional, so three-letter names like `KPC-2`
/// match and longer prefixes such as `blaKPC-2` match on their last four.
pub const DEFAULT_LOCUS_TAG_PATTERN: &str = r"[a-zA-Z][a-zA-Z][a-zA-Z][a-zA-Z]?-[0-9][0-9]?[0-9]?";

/// Project-level configuration loaded from cardshark.toml
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub defaults: CliDefaults,
}

/// How a term-bonus key is compared against a lower-cased token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TermMatch {
    /// Term occurs anywhere in the token (`characteriz` in `uncharacterized`)
    #[default]
    Substring,
    /// Token starts with the term (`characteriz` in `characterization`)
    Prefix,
    /// Token equals the term
    Exact,
}

impl TermMatch {
    pub fn matches(&self, token: &str, term: &str) -> bool {
        match self {
            TermMatch::Substring => token.contains(term),
            TermMatch::Prefix => token.starts_with(term),
            TermMatch::Exact => token == term,
        }
    }
}

/// Weights and thresholds for matrix building and abstract scoring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Minimum word-score difference kept when matrix filtering is on (default: 0.05)
    #[serde(default = "default_min_difference")]
    pub min_difference: f64,

    /// Regex counted once per match as a gene/strain identifier bonus
    #[serde(default = "default_locus_tag_pattern")]
    pub locus_tag_pattern: String,

    #[serde(default)]
    pub term_match: TermMatch,

    /// Hand-curated term bonuses, keyed by lower-case stem
    #[serde(default = "default_terms")]
    pub terms: IndexMap<String, f64>,

    /// Pair scores must exceed this value to count (default: 1.0)
    #[serde(default = "default_pair_min_value")]
    pub pair_min_value: f64,

    /// Multiplier applied to qualifying pair scores (default: 0.25)
    #[serde(default = "default_pair_weight")]
    pub pair_weight: f64,

    /// Medians in (0, cutoff_floor] are raised to cutoff_floor (default: 10.0)
    #[serde(default = "default_cutoff_floor")]
    pub cutoff_floor: f64,

    #[serde(default)]
    pub segmenter: SentenceSegmenter,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_difference: default_min_difference(),
            locus_tag_pattern: default_locus_tag_pattern(),
            term_match: TermMatch::default(),
            terms: default_terms(),
            pair_min_value: default_pair_min_value(),
            pair_weight: default_pair_weight(),
            cutoff_floor: default_cutoff_floor(),
            segmenter: SentenceSegmenter::default(),
        }
    }
}

fn default_min_difference() -> f64 {
    0.05
}
fn default_locus_tag_pattern() -> String {
    DEFAULT_LOCUS_TAG_PATTERN.to_string()
}
fn default_pair_min_value() -> f64 {
    1.0
}
fn default_pair_weight() -> f64 {
    0.25
}
fn default_cutoff_floor() -> f64 {
    10.0
}

pub fn default_terms() -> IndexMap<String, f64> {
    [
        ("novel", 5.0),
        ("characteriz", 3.0),
        ("clinical", 2.0),
        ("new", 3.0),
        ("antibiotic", 1.0),
        ("resistance", 1.0),
        ("gene", 1.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Settings for merging reviewer validation sheets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Reviewer label columns; the first two decide the ground truth
    #[serde(default)]
    pub headers: Vec<String>,

    /// A sheet is read only if its file name contains every term
    #[serde(default)]
    pub filename_terms: Vec<String>,

    /// Column holding the publication id (default: "pmid")
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Raw cell value → label
    #[serde(default = "default_label_terms")]
    pub label_terms: IndexMap<String, u8>,

    /// Manual fixes for unreadable cells: row index → header index → label
    #[serde(default)]
    pub corrections: IndexMap<String, IndexMap<String, u8>>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            filename_terms: Vec::new(),
            id_column: default_id_column(),
            label_terms: default_label_terms(),
            corrections: IndexMap::new(),
        }
    }
}

fn default_id_column() -> String {
    "pmid".to_string()
}

pub fn default_label_terms() -> IndexMap<String, u8> {
    [
        ("F", 0),
        ("T", 1),
        ("FALSE", 0),
        ("False", 0),
        ("True", 1),
        ("TRUE", 1),
        ("No", 0),
        ("No ", 0),
        (" No", 0),
        ("Yes", 1),
        ("t", 1),
        ("f", 0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// NCBI E-utilities settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Contact address sent with every request (NCBI_EMAIL overrides)
    #[serde(default)]
    pub email: Option<String>,

    /// NCBI API key (NCBI_API_KEY overrides)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Records per efetch request (default: 300)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            batch_size: default_batch_size(),
            base_url: default_base_url(),
        }
    }
}

fn default_batch_size() -> usize {
    300
}
fn default_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

/// Default CLI flags
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CliDefaults {
    /// Default number of preprocessing workers
    #[serde(default)]
    pub workers: Option<usize>,

    /// Default output format (text, json)
    #[serde(default)]
    pub format: Option<String>,
}

/// Load project configuration from `cardshark.toml` in `dir`.
///
/// Returns defaults if the file is missing or unreadable.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    load_config_file(&dir.join(CONFIG_FILENAME))
}

/// Load configuration from an explicit path, falling back to defaults
pub fn load_config_file(path: &Path) -> ProjectConfig {
    if !path.exists() {
        debug!("No project config at {}, using defaults", path.display());
        return ProjectConfig::default();
    }
    match load_toml_config(path) {
        Ok(config) => {
            debug!("Loaded project config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            ProjectConfig::default()
        }
    }
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Example config written by `cardshark init`
pub const EXAMPLE_CONFIG: &str = r#"# cardshark project configuration

[scoring]
# Minimum difference kept when building a filtered word matrix
min_difference = 0.05
# Gene/strain identifier bonus, one point per match
locus_tag_pattern = "[a-zA-Z][a-zA-Z][a-zA-Z][a-zA-Z]?-[0-9][0-9]?[0-9]?"
# substring | prefix | exact
term_match = "substring"
pair_min_value = 1.0
pair_weight = 0.25
cutoff_floor = 10.0
# boundary | delimiter
segmenter = "boundary"

[scoring.terms]
novel = 5
characteriz = 3
clinical = 2
new = 3
antibiotic = 1
resistance = 1
gene = 1

[validation]
# headers = ["reviewer_1", "reviewer_2"]
# filename_terms = ["card"]
id_column = "pmid"

# [validation.corrections]
# 12 = { 0 = 1 }

[download]
# email = "you@example.org"
batch_size = 300

[defaults]
workers = 4
"#;

#[cfg(test)]
mod tests;

//! Persisted scoring tables
//!
//! Tables are written as pretty JSON objects with sorted keys so that two
//! builds from the same corpora produce identical files.

use super::{JournalFrequencyMap, PairFrequencyMap, ScoreMatrix};
use crate::text::SentenceSegmenter;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::hash::Hash;
use std::path::Path;

fn serialize_sorted<S, K, V>(map: &FxHashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Serialize + Ord,
    V: Serialize,
{
    map.iter().collect::<BTreeMap<_, _>>().serialize(serializer)
}

/// Write a single table (word matrix, journal matrix, pair matrix or a raw
/// frequency profile) as sorted JSON.
pub fn save_table<K>(map: &FxHashMap<K, f64>, path: &Path) -> Result<()>
where
    K: Serialize + Ord,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let sorted: BTreeMap<&K, &f64> = map.iter().collect();
    let json = serde_json::to_string_pretty(&sorted)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_table<K>(path: &Path) -> Result<FxHashMap<K, f64>>
where
    K: DeserializeOwned + Eq + Hash,
{
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid table {}", path.display()))
}

/// Everything the scorer needs, built from one positive and one background
/// corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub positive_abstracts: usize,
    pub background_abstracts: usize,
    /// `Some(min)` when the word matrix was filtered
    pub min_difference: Option<f64>,
    /// Segmenter the pair table was built with
    #[serde(default)]
    pub segmenter: SentenceSegmenter,
    #[serde(serialize_with = "serialize_sorted")]
    pub words: ScoreMatrix,
    #[serde(serialize_with = "serialize_sorted")]
    pub journals: JournalFrequencyMap,
    #[serde(serialize_with = "serialize_sorted")]
    pub pairs: PairFrequencyMap,
}

impl ModelBundle {
    pub const VERSION: u32 = 1;
    pub const FILENAME: &'static str = "cardshark-model.json";

    pub fn new(
        words: ScoreMatrix,
        journals: JournalFrequencyMap,
        pairs: PairFrequencyMap,
        positive_abstracts: usize,
        background_abstracts: usize,
        min_difference: Option<f64>,
        segmenter: SentenceSegmenter,
    ) -> Self {
        Self {
            version: Self::VERSION,
            generated_at: Utc::now(),
            positive_abstracts,
            background_abstracts,
            min_difference,
            segmenter,
            words,
            journals,
            pairs,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model {}", path.display()))?;
        let bundle: Self = serde_json::from_str(&data)
            .with_context(|| format!("Invalid model file {}", path.display()))?;
        if bundle.version != Self::VERSION {
            bail!(
                "Model version mismatch ({} vs {}); rebuild with `cardshark build`",
                bundle.version,
                Self::VERSION
            );
        }
        Ok(bundle)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write model {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::PairKey;

    fn bundle() -> ModelBundle {
        let words: ScoreMatrix = [("gene".to_string(), 0.25), ("drug".to_string(), -0.5)]
            .into_iter()
            .collect();
        let journals: JournalFrequencyMap = [("Lancet".to_string(), 2.5)].into_iter().collect();
        let pairs: PairFrequencyMap = [(PairKey::new("gene", "drug"), 1.5)].into_iter().collect();
        ModelBundle::new(words, journals, pairs, 4, 8, None, SentenceSegmenter::Delimiter)
    }

    #[test]
    fn test_bundle_save_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model").join(ModelBundle::FILENAME);
        let original = bundle();
        original.save(&path).expect("save");

        let loaded = ModelBundle::load(&path).expect("load");
        assert_eq!(loaded.words, original.words);
        assert_eq!(loaded.pairs[&PairKey::new("drug", "gene")], 1.5);
        assert_eq!(loaded.positive_abstracts, 4);
        assert_eq!(loaded.segmenter, SentenceSegmenter::Delimiter);
        assert_eq!(loaded.generated_at, original.generated_at);
    }

    #[test]
    fn test_bundle_keys_sorted_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        bundle().save(&path).expect("save");
        let json = std::fs::read_to_string(&path).expect("read");
        let drug = json.find("\"drug\"").expect("drug key");
        let gene = json.find("\"gene\"").expect("gene key");
        assert!(drug < gene);
        assert!(json.contains("\"drug|gene\": 1.5"));
    }

    #[test]
    fn test_bundle_version_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        let mut old = bundle();
        old.version = 0;
        old.save(&path).expect("save");
        let err = ModelBundle::load(&path).unwrap_err();
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_table_save_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("words.json");
        let table: FxHashMap<String, f64> =
            [("b".to_string(), 2.0), ("a".to_string(), 1.0)].into_iter().collect();
        save_table(&table, &path).expect("save");

        let json = std::fs::read_to_string(&path).expect("read");
        assert!(json.find("\"a\"") < json.find("\"b\""));

        let loaded: FxHashMap<String, f64> = load_table(&path).expect("load");
        assert_eq!(loaded, table);
    }
}

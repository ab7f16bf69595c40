//! Core data models for cardshark
//!
//! Abstracts flow in from the corpus loaders and the PubMed downloader,
//! scored records flow out of the scorer and into the reporters.

use serde::{Deserialize, Serialize};

/// Ground-truth label for an abstract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    pub fn from_bool(positive: bool) -> Self {
        if positive {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    pub fn is_positive(self) -> bool {
        self == Label::Positive
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(format!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A downloaded scientific abstract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abstract {
    /// Publication id (PMID)
    pub id: String,
    pub text: String,
    pub title: String,
    pub journal: String,
    /// Publication date as reported by PubMed (`2017 Jun 3`, `2017-2018`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Stemmed, stop-word-free rendition of `text` (see `corpus::preprocess`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

impl Abstract {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        title: impl Into<String>,
        journal: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            title: title.into(),
            journal: journal.into(),
            published: None,
            processed_text: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_processed_text(mut self, processed: impl Into<String>) -> Self {
        self.processed_text = Some(processed.into());
        self
    }
}

/// Which text field of an abstract feeds the tokenizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    /// The abstract as downloaded
    #[default]
    Raw,
    /// The output of `corpus::preprocess`
    Processed,
}

impl std::str::FromStr for TextField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" | "text" => Ok(TextField::Raw),
            "processed" | "processed_text" => Ok(TextField::Processed),
            _ => Err(anyhow::anyhow!(
                "Unknown text field '{}'. Valid fields: raw, processed",
                s
            )),
        }
    }
}

/// One scored abstract, in corpus order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAbstract {
    pub id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub prediction: Label,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serde_as_integer() {
        let a = Abstract::new("1", "text", "title", "journal").with_label(Label::Positive);
        let json = serde_json::to_string(&a).expect("serialize abstract");
        assert!(json.contains("\"label\":1"));

        let back: Abstract = serde_json::from_str(&json).expect("deserialize abstract");
        assert_eq!(back.label, Some(Label::Positive));
    }

    #[test]
    fn test_label_rejects_out_of_range() {
        let json = r#"{"id":"1","text":"t","title":"t","journal":"j","label":2}"#;
        assert!(serde_json::from_str::<Abstract>(json).is_err());
    }

    #[test]
    fn test_text_field_parse() {
        assert_eq!("raw".parse::<TextField>().unwrap(), TextField::Raw);
        assert_eq!(
            "processed_text".parse::<TextField>().unwrap(),
            TextField::Processed
        );
        assert!("title".parse::<TextField>().is_err());
    }
}

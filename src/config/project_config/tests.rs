use super::*;

#[test]
fn test_defaults_match_published_weights() {
    let config = ProjectConfig::default();
    assert_eq!(config.scoring.min_difference, 0.05);
    assert_eq!(config.scoring.cutoff_floor, 10.0);
    assert_eq!(config.scoring.pair_weight, 0.25);
    assert_eq!(config.scoring.terms.get("novel"), Some(&5.0));
    assert_eq!(config.scoring.terms.get("characteriz"), Some(&3.0));
    assert_eq!(config.scoring.terms.len(), 7);
    assert_eq!(config.download.batch_size, 300);
    assert_eq!(config.validation.id_column, "pmid");
}

#[test]
fn test_example_config_parses() {
    let config: ProjectConfig = toml::from_str(EXAMPLE_CONFIG).expect("parse example config");
    assert_eq!(config.scoring.term_match, TermMatch::Substring);
    assert_eq!(config.scoring.segmenter, SentenceSegmenter::Boundary);
    assert_eq!(config.scoring.terms.get("gene"), Some(&1.0));
    assert_eq!(config.defaults.workers, Some(4));
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config: ProjectConfig = toml::from_str(
        r#"
[scoring]
pair_weight = 0.5
segmenter = "delimiter"

[validation]
headers = ["a", "b"]

[validation.corrections]
3 = { 1 = 0 }
"#,
    )
    .expect("parse partial config");

    assert_eq!(config.scoring.pair_weight, 0.5);
    assert_eq!(config.scoring.segmenter, SentenceSegmenter::Delimiter);
    assert_eq!(config.scoring.cutoff_floor, 10.0);
    assert_eq!(config.scoring.terms.len(), 7);
    assert_eq!(config.validation.headers, vec!["a", "b"]);
    assert_eq!(config.validation.corrections["3"]["1"], 0);
    assert_eq!(config.validation.label_terms.get("Yes"), Some(&1));
}

#[test]
fn test_custom_terms_replace_defaults() {
    let config: ProjectConfig = toml::from_str(
        r#"
[scoring.terms]
plasmid = 2.5
"#,
    )
    .expect("parse terms");
    assert_eq!(config.scoring.terms.len(), 1);
    assert_eq!(config.scoring.terms.get("plasmid"), Some(&2.5));
}

#[test]
fn test_term_match_modes() {
    assert!(TermMatch::Substring.matches("uncharacterized", "characteriz"));
    assert!(!TermMatch::Prefix.matches("uncharacterized", "characteriz"));
    assert!(TermMatch::Prefix.matches("characterization", "characteriz"));
    assert!(TermMatch::Exact.matches("gene", "gene"));
    assert!(!TermMatch::Exact.matches("genes", "gene"));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_project_config(dir.path());
    assert_eq!(config.scoring.cutoff_floor, 10.0);
}

#[test]
fn test_malformed_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(CONFIG_FILENAME), "[scoring\nbroken").expect("write");
    let config = load_project_config(dir.path());
    assert_eq!(config.scoring.min_difference, 0.05);
}

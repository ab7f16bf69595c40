//! Configuration module for cardshark
//!
//! This module handles:
//! - Project-level configuration (cardshark.toml)
//! - Scoring weights and term bonuses
//! - Validation label vocabulary and corrections
//! - NCBI credentials (user-level config + environment)

mod project_config;
mod user_config;

pub use project_config::{
    default_label_terms, default_terms, load_config_file, load_project_config, CliDefaults,
    DownloadConfig, ProjectConfig, ScoringConfig, TermMatch, ValidationConfig, CONFIG_FILENAME,
    DEFAULT_LOCUS_TAG_PATTERN, EXAMPLE_CONFIG,
};
pub use user_config::UserConfig;

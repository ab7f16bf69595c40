//! User-level configuration for cardshark
//!
//! Supports loading NCBI credentials from:
//! - Environment variables
//! - ~/.config/cardshark/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub ncbi: NcbiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NcbiConfig {
    /// Contact e-mail sent to E-utilities
    pub email: Option<String>,

    /// NCBI API key (raises the rate limit from 3 to 10 requests/second)
    pub api_key: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/cardshark/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(user_config) = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|content| toml::from_str::<UserConfig>(&content).ok())
        {
            config.merge(user_config);
        }

        if let Ok(key) = std::env::var("NCBI_API_KEY") {
            config.ncbi.api_key = Some(key);
        }
        if let Ok(email) = std::env::var("NCBI_EMAIL") {
            config.ncbi.email = Some(email);
        }

        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cardshark").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.ncbi.email.is_some() {
            self.ncbi.email = other.ncbi.email;
        }
        if other.ncbi.api_key.is_some() {
            self.ncbi.api_key = other.ncbi.api_key;
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.ncbi.api_key.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.ncbi.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = UserConfig::default();
        base.ncbi.email = Some("old@example.org".into());
        let other = UserConfig {
            ncbi: NcbiConfig {
                email: None,
                api_key: Some("abc".into()),
            },
        };
        base.merge(other);
        assert_eq!(base.email(), Some("old@example.org"));
        assert_eq!(base.api_key(), Some("abc"));
    }

    #[test]
    fn test_parse_user_config() {
        let config: UserConfig =
            toml::from_str("[ncbi]\nemail = \"me@example.org\"\n").expect("parse");
        assert_eq!(config.email(), Some("me@example.org"));
        assert!(config.api_key().is_none());
    }
}

//! Configuration handling for twigs
//!
//! Settings are read from `<repo>/.twigs.toml`, falling back to
//! `<config dir>/twigs/config.toml`. A missing file means defaults.

use crate::error::{Result, TwigsError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-repository configuration file
pub const REPO_CONFIG_FILE: &str = ".twigs.toml";

/// Twigs configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Twigs-specific settings
    #[serde(default)]
    pub twigs: TwigsConfig,
}

/// Core twigs settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwigsConfig {
    /// Default branch override; detected from the repository when unset
    #[serde(default)]
    pub default_branch: Option<String>,

    /// Remote consulted for default-branch detection
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branches matching this regex are never analysed
    #[serde(default = "default_protected_pattern")]
    pub protected_pattern: String,

    /// Worker threads used for per-branch queries
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Time limit for a single backend query
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Number of default-branch commits searched for merge evidence
    #[serde(default = "default_evidence_log_depth")]
    pub evidence_log_depth: usize,

    /// Shortest normalised subject used for textual evidence matching
    #[serde(default = "default_min_subject_len")]
    pub min_subject_len: usize,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_protected_pattern() -> String {
    r"^(main|master|develop|trunk|release/.*)$".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_evidence_log_depth() -> usize {
    2000
}

fn default_min_subject_len() -> usize {
    8
}

impl Default for TwigsConfig {
    fn default() -> Self {
        Self {
            default_branch: None,
            remote: default_remote(),
            protected_pattern: default_protected_pattern(),
            workers: default_workers(),
            query_timeout_secs: default_query_timeout_secs(),
            evidence_log_depth: default_evidence_log_depth(),
            min_subject_len: default_min_subject_len(),
        }
    }
}

impl TwigsConfig {
    /// Compile the protected-branch pattern
    pub fn protected_regex(&self) -> Result<Regex> {
        Regex::new(&self.protected_pattern).map_err(|e| TwigsError::InvalidPattern {
            pattern: self.protected_pattern.clone(),
            reason: e.to_string(),
        })
    }

    /// Worker count, never zero
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.twigs.protected_regex()?;
        Ok(config)
    }

    /// Load configuration for a repository
    ///
    /// The repository file wins over the user file; neither is merged.
    pub fn load(repo_root: &Path) -> Result<Self> {
        for candidate in config_candidates(repo_root) {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading configuration");
                let content = std::fs::read_to_string(&candidate)?;
                return Self::from_toml(&content).map_err(|e| match e {
                    TwigsError::Toml(inner) => {
                        TwigsError::Config(format!("{}: {}", candidate.display(), inner))
                    }
                    other => other,
                });
            }
        }
        Ok(Self::default())
    }
}

fn config_candidates(repo_root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![repo_root.join(REPO_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("twigs").join("config.toml"));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.twigs.remote, "origin");
        assert_eq!(config.twigs.workers, 4);
        assert!(config.twigs.default_branch.is_none());

        let re = config.twigs.protected_regex().expect("default pattern compiles");
        assert!(re.is_match("main"));
        assert!(re.is_match("release/1.2"));
        assert!(!re.is_match("feature/main-menu"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[twigs]
default_branch = "trunk"
workers = 0
"#,
        )
        .expect("valid toml");
        assert_eq!(config.twigs.default_branch.as_deref(), Some("trunk"));
        assert_eq!(config.twigs.worker_count(), 1);
        assert_eq!(config.twigs.query_timeout_secs, 30);
        assert_eq!(config.twigs.min_subject_len, 8);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = Config::from_toml("[twigs]\nprotected_pattern = \"(\"\n");
        assert!(matches!(result, Err(TwigsError::InvalidPattern { .. })));
    }

    #[test]
    fn test_load_from_repo_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            temp.path().join(REPO_CONFIG_FILE),
            "[twigs]\nremote = \"upstream\"\n",
        )
        .expect("write config");

        let config = Config::load(temp.path()).expect("load");
        assert_eq!(config.twigs.remote, "upstream");
    }

    #[test]
    fn test_load_reports_file_on_parse_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp.path().join(REPO_CONFIG_FILE), "[twigs\n").expect("write config");

        let err = Config::load(temp.path()).expect_err("malformed config");
        assert!(err.to_string().contains(".twigs.toml"));
    }
}

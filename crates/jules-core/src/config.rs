//! Configuration management for the automator
//!
//! Non-secret settings live in `.jules/config.toml` in the working directory
//! and can be overridden by environment variables. Credentials are never read
//! from the file; see `jules_agent::auth`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{JulesError, Result};

/// Default Jules API root
pub const DEFAULT_JULES_API_URL: &str = "https://jules.googleapis.com/v1alpha";

/// Default GitHub REST API root
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Repository-level automator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatorConfig {
    /// Jules API root
    #[serde(default = "default_jules_api_url")]
    pub jules_api_url: String,

    /// GitHub REST API root
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Local Ollama endpoint used for triage
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model name passed to Ollama
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// GitHub owner of the repository under review
    #[serde(default)]
    pub repo_owner: Option<String>,

    /// GitHub name of the repository under review
    #[serde(default)]
    pub repo_name: Option<String>,

    /// Jules source locator; derived from owner/name when unset
    #[serde(default)]
    pub source_id: Option<String>,

    /// Branch new sessions start from
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Where the processed-comment ledger is stored
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Delay between session polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Request timeout for the triage model
    #[serde(default = "default_judge_timeout_secs")]
    pub judge_timeout_secs: u64,

    /// Review bot logins whose comments are triaged
    #[serde(default = "default_reviewer_logins")]
    pub reviewer_logins: Vec<String>,
}

// Default value providers
fn default_jules_api_url() -> String {
    DEFAULT_JULES_API_URL.to_string()
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(".jules/processed_reviews.json")
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_judge_timeout_secs() -> u64 {
    120
}

fn default_reviewer_logins() -> Vec<String> {
    vec!["amazon-q-developer".to_string()]
}

impl AutomatorConfig {
    /// Load configuration from `.jules/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".jules/config.toml");

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            JulesError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write default configuration to `.jules/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<PathBuf> {
        let config_dir = repo_root.join(".jules");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            JulesError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_URL") {
            self.ollama_url = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.ollama_model = v;
        }
        if let Some(v) = get("REPO_OWNER") {
            self.repo_owner = Some(v);
        }
        if let Some(v) = get("REPO_NAME") {
            self.repo_name = Some(v);
        }
        if let Some(v) = get("SOURCE_ID") {
            self.source_id = Some(v);
        }
        if let Some(v) = get("JULES_LEDGER_PATH") {
            self.ledger_path = PathBuf::from(v);
        }
        self
    }

    /// Owner and name of the repository under review
    pub fn repository(&self) -> Result<(&str, &str)> {
        match (self.repo_owner.as_deref(), self.repo_name.as_deref()) {
            (Some(owner), Some(name)) => Ok((owner, name)),
            _ => Err(JulesError::Configuration(
                "REPO_OWNER and REPO_NAME must be set".to_string(),
            )),
        }
    }

    /// Jules source locator for new sessions
    pub fn source_id(&self) -> Result<String> {
        if let Some(source) = &self.source_id {
            return Ok(source.clone());
        }
        let (owner, name) = self.repository().map_err(|_| {
            JulesError::Configuration(
                "SOURCE_ID is not set and cannot be derived without REPO_OWNER/REPO_NAME"
                    .to_string(),
            )
        })?;
        Ok(format!("sources/github/{}/{}", owner, name))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }
}

impl Default for AutomatorConfig {
    fn default() -> Self {
        Self {
            jules_api_url: default_jules_api_url(),
            github_api_url: default_github_api_url(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            repo_owner: None,
            repo_name: None,
            source_id: None,
            default_branch: default_branch(),
            ledger_path: default_ledger_path(),
            poll_interval_secs: default_poll_interval_secs(),
            judge_timeout_secs: default_judge_timeout_secs(),
            reviewer_logins: default_reviewer_logins(),
        }
    }
}

//! Store configuration.
//!
//! Configuration is read from `.issue-db.yaml` (or an explicit path) and
//! includes:
//! - The repository and management label
//! - Cache expiry and retry behavior
//! - Authentication for GitHub

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{IssueDbError, Result};
use crate::repo::RepoId;
use crate::throttle::RetryPolicy;

pub const DEFAULT_LABEL: &str = "issue-db";
pub const CONFIG_FILE: &str = ".issue-db.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Repository holding the records, as owner/name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Label marking issues managed by the store
    #[serde(default = "default_label")]
    pub label: String,

    /// Seconds before the issue cache is refetched (default: 60)
    #[serde(default = "default_cache_expiry")]
    pub cache_expiry: u64,

    /// Retry behavior for remote calls
    #[serde(default)]
    pub retry: RetryPolicy,

    /// GitHub Enterprise API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Authentication tokens
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_cache_expiry() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: None,
            label: default_label(),
            cache_expiry: default_cache_expiry(),
            retry: RetryPolicy::default(),
            api_url: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubAuth>,
}

/// GitHub authentication
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubAuth {
    pub token: String,
}

impl fmt::Debug for GitHubAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Default config file location, relative to the working directory
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, a missing default file
    /// yields the default configuration. `ISSUE_DB_REPO` overrides `repo`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Ok(repo) = env::var("ISSUE_DB_REPO")
            && !repo.is_empty()
        {
            config.repo = Some(repo);
        }

        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(IssueDbError::Config("label cannot be empty".to_string()));
        }
        if self.retry.tries == 0 {
            return Err(IssueDbError::Config(
                "retry.tries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured repository, validated
    pub fn repo_id(&self) -> Result<RepoId> {
        let repo = self.repo.as_deref().ok_or_else(|| {
            IssueDbError::Config(
                "no repository configured. Set repo in the config file or ISSUE_DB_REPO"
                    .to_string(),
            )
        })?;
        RepoId::parse(repo)
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache_expiry)
    }

    /// Get GitHub token from environment variables or config
    pub fn github_token(&self) -> Option<SecretString> {
        for var in ["ISSUE_DB_GITHUB_TOKEN", "GITHUB_TOKEN"] {
            if let Ok(token) = env::var(var)
                && !token.is_empty()
            {
                return Some(SecretString::from(token));
            }
        }

        self.auth
            .github
            .as_ref()
            .map(|g| SecretString::from(g.token.clone()))
    }

    /// Set GitHub token
    pub fn set_github_token(&mut self, token: String) {
        self.auth.github = Some(GitHubAuth { token });
    }
}

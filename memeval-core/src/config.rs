// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Harness configuration
//!
//! Read from an optional TOML file, then overridden by environment variables
//! so secrets never have to live in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default backend chat endpoint (query flags are appended by the client)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001/api/v2/brain/chat";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub backend: BackendConfig,
    pub oracle: OracleConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

/// Backend under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    /// Bearer token
    pub token: String,
    /// Request timeout in seconds; 0 disables the timeout
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            token: String::new(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    OpenAI,
    Anthropic,
}

/// Classification and scoring model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub model: String,
    pub api_key: String,
    /// Empty means the provider's public endpoint
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::OpenAI,
            model: "gpt-4o".to_string(),
            api_key: String::new(),
            base_url: String::new(),
            max_tokens: 500,
            temperature: 0.0,
        }
    }
}

impl OracleConfig {
    pub fn resolved_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            OracleProvider::OpenAI => DEFAULT_OPENAI_BASE_URL,
            OracleProvider::Anthropic => DEFAULT_ANTHROPIC_BASE_URL,
        }
    }
}

/// Locations of the three JSON documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub clustered_path: PathBuf,
    pub detail_path: PathBuf,
    pub results_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            clustered_path: PathBuf::from("clustered_dataset.json"),
            detail_path: PathBuf::from("evaluation_result_detail.json"),
            results_path: PathBuf::from("evaluation_results.json"),
        }
    }
}

/// What the clustering stage does when the oracle fails on one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log, leave the record out of every bucket, continue
    #[default]
    Skip,
    /// Stop the stage and propagate the error
    Abort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub classification_failure: FailurePolicy,
}

impl HarnessConfig {
    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &contents)
    }

    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a variable lookup (normally the process env)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("MEMEVAL_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(token) = non_empty("MEMEVAL_BACKEND_TOKEN") {
            self.backend.token = token;
        }

        let provider_key = match self.oracle.provider {
            OracleProvider::OpenAI => "OPENAI_API_KEY",
            OracleProvider::Anthropic => "ANTHROPIC_API_KEY",
        };
        if let Some(key) = non_empty("MEMEVAL_ORACLE_API_KEY") {
            self.oracle.api_key = key;
        } else if self.oracle.api_key.is_empty() {
            if let Some(key) = non_empty(provider_key) {
                self.oracle.api_key = key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
        assert_eq!(config.backend.timeout_secs, 0);
        assert_eq!(config.oracle.provider, OracleProvider::OpenAI);
        assert_eq!(config.oracle.model, "gpt-4o");
        assert_eq!(config.oracle.resolved_base_url(), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.pipeline.classification_failure, FailurePolicy::Skip);
        assert_eq!(
            config.storage.results_path,
            PathBuf::from("evaluation_results.json")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            [oracle]
            provider = "anthropic"
            model = "claude-3-5-haiku-20241022"

            [pipeline]
            classification_failure = "abort"
        "#;
        let config = HarnessConfig::from_toml(Path::new("memeval.toml"), toml).unwrap();
        assert_eq!(config.oracle.provider, OracleProvider::Anthropic);
        assert_eq!(config.oracle.max_tokens, 500);
        assert_eq!(config.oracle.resolved_base_url(), DEFAULT_ANTHROPIC_BASE_URL);
        assert_eq!(config.pipeline.classification_failure, FailurePolicy::Abort);
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_base_url_empty_by_default_and_overridable() {
        let oracle = OracleConfig::default();
        assert!(oracle.base_url.is_empty());
        assert_eq!(oracle.resolved_base_url(), "https://api.openai.com/v1");

        let toml = r#"
            [oracle]
            base_url = "http://localhost:9000/v1"
        "#;
        let config = HarnessConfig::from_toml(Path::new("memeval.toml"), toml).unwrap();
        assert_eq!(config.oracle.resolved_base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = HarnessConfig::from_toml(Path::new("bad.toml"), "[oracle\nmodel=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEMEVAL_BACKEND_TOKEN", "secret"),
            ("OPENAI_API_KEY", "sk-provider"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend.token, "secret");
        assert_eq!(config.oracle.api_key, "sk-provider");
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_explicit_oracle_key_wins_over_provider_key() {
        let mut config = HarnessConfig::default();
        config.apply_overrides(|key| match key {
            "MEMEVAL_ORACLE_API_KEY" => Some("sk-harness".to_string()),
            "OPENAI_API_KEY" => Some("sk-provider".to_string()),
            _ => None,
        });
        assert_eq!(config.oracle.api_key, "sk-harness");
    }
}

//! Pipeline configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an absent
//! file yields a working setup with the built-in pair table. Secrets come only
//! from the environment and are never serialized back out.

use crate::domain::pair::default_fx_entries;
use crate::domain::{PairEntry, PairTable, PairTableError};
use crate::pipeline::RunOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_STORAGE_KEY: &str = "RATEFEED_STORAGE_KEY";
pub const ENV_STORAGE_URL: &str = "RATEFEED_STORAGE_URL";
pub const ENV_SQLITE_PATH: &str = "RATEFEED_SQLITE_PATH";
pub const ENV_SOURCE_API_KEY: &str = "RATEFEED_SOURCE_API_KEY";
pub const ENV_WINDOW_DAYS: &str = "RATEFEED_WINDOW_DAYS";
pub const ENV_CHUNK_SIZE: &str = "RATEFEED_CHUNK_SIZE";
pub const ENV_PACING_MS: &str = "RATEFEED_PACING_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("pair table: {0}")]
    Pairs(#[from] PairTableError),
}

/// Market-data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Calendar days requested per symbol.
    pub window_days: u32,
    /// Delay between consecutive symbol fetches.
    pub pacing_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Header carrying `api_key`, when one is set.
    pub api_key_header: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart/".into(),
            window_days: 30,
            pacing_ms: 1000,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            api_key_header: "x-api-key".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Rest,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub table: String,
    /// Maximum rows per insert call.
    pub chunk_size: usize,
    pub sqlite_path: PathBuf,
    pub rest_url: Option<String>,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub service_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            table: "historical_rates".into(),
            chunk_size: 1000,
            sqlite_path: PathBuf::from("rates.db"),
            rest_url: None,
            timeout_secs: 30,
            service_key: None,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub pairs: Vec<PairEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            pairs: default_fx_entries(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// File (or defaults) + process environment, validated for a run.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::resolve(path)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults) + process environment without run validation, for
    /// commands that only inspect the configuration.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Blank values count as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(key) = get(ENV_STORAGE_KEY) {
            self.storage.service_key = Some(key);
        }
        if let Some(key) = get(ENV_SOURCE_API_KEY) {
            self.source.api_key = Some(key);
        }
        if let Some(url) = get(ENV_STORAGE_URL) {
            self.storage.rest_url = Some(url);
        }
        if let Some(path) = get(ENV_SQLITE_PATH) {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(v) = get(ENV_WINDOW_DAYS) {
            self.source.window_days = parse_env(ENV_WINDOW_DAYS, &v)?;
        }
        if let Some(v) = get(ENV_CHUNK_SIZE) {
            self.storage.chunk_size = parse_env(ENV_CHUNK_SIZE, &v)?;
        }
        if let Some(v) = get(ENV_PACING_MS) {
            self.source.pacing_ms = parse_env(ENV_PACING_MS, &v)?;
        }
        Ok(())
    }

    /// Check everything the pipeline needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.window_days == 0 {
            return Err(invalid("source.window_days", "must be at least 1"));
        }
        if self.storage.chunk_size == 0 {
            return Err(invalid("storage.chunk_size", "must be at least 1"));
        }
        if self.source.timeout_secs == 0 {
            return Err(invalid("source.timeout_secs", "must be at least 1"));
        }
        if self.storage.timeout_secs == 0 {
            return Err(invalid("storage.timeout_secs", "must be at least 1"));
        }
        if reqwest::Url::parse(&self.source.base_url).is_err() {
            return Err(invalid("source.base_url", "not a valid URL"));
        }
        crate::store::validate_table_name(&self.storage.table)
            .map_err(|e| invalid("storage.table", &e.to_string()))?;
        self.pair_table()?;

        if self.storage.backend == StorageBackend::Rest {
            if self.storage.rest_url.is_none() {
                return Err(ConfigError::Missing(format!(
                    "storage.rest_url (or {ENV_STORAGE_URL})"
                )));
            }
            if self.storage.service_key.is_none() {
                return Err(ConfigError::Missing(ENV_STORAGE_KEY.to_string()));
            }
        }
        Ok(())
    }

    pub fn pair_table(&self) -> Result<PairTable, ConfigError> {
        Ok(PairTable::new(self.pairs.clone())?)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            window_days: self.source.window_days,
            chunk_size: self.storage.chunk_size,
            pacing: Duration::from_millis(self.source.pacing_ms),
            table: self.storage.table.clone(),
        }
    }

    /// Serialize to TOML. Secrets are skipped by serde and never appear.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid("config", &e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        field: name.to_string(),
        reason: format!("'{value}': {e}"),
    })
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

//! Configuration management for chainview

use crate::blockchain::ValidationPolicy;
use crate::cache::ViewCache;
use crate::error::LedgerError;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "chainview.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub validation: ValidationPolicy,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// JSON document holding the Ledger Service's `{ "chain": [...] }` payload
    #[serde(default = "default_source_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, LedgerError> {
        let config: Config = if config_str.trim().is_empty() {
            Config::default()
        } else {
            toml::from_str(config_str)?
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.source.path.is_empty() {
            return Err(LedgerError::ConfigError(
                "source.path must be set in chainview.toml".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `chainview.toml` from the working directory, falling back to
/// defaults when it is absent. Any other read failure is a `ConfigError`.
pub fn load_config() -> Result<Config, LedgerError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, LedgerError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(config_str) => Config::from_toml(&config_str),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(LedgerError::ConfigError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn default_source_path() -> String {
    "chain.json".to_string()
}

fn default_cache_capacity() -> usize {
    ViewCache::DEFAULT_CAPACITY
}

fn default_api_port() -> u16 {
    8081
}

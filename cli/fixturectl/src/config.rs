//! Configuration management.
//!
//! Handles:
//! - API endpoint configuration
//! - Default credential pool location

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Pool file used when nothing else is configured.
pub const DEFAULT_POOL_FILE: &str = "./e2e/creds.json";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "fixture", "fixturectl")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Credential pool file.
    #[serde(default = "default_pool_file")]
    pub pool_file: PathBuf,
}

fn default_api_url() -> String {
    std::env::var("FIXTURE_API_ROOT")
        .or_else(|_| std::env::var("REACT_APP_API_ROOT"))
        .unwrap_or_else(|_| fixture_api::config::DEFAULT_API_ROOT.to_string())
}

fn default_pool_file() -> PathBuf {
    std::env::var("FIXTURE_POOL_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_POOL_FILE))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            pool_file: default_pool_file(),
        }
    }
}

impl Config {
    /// Load config from disk, or return default.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<PathBuf> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;

        let path = dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(path)
    }
}

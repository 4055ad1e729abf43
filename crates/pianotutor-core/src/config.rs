//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, timeouts, the envelope success convention, the token
//! lifetime, the storage backend and the last used username.
//!
//! Configuration is stored at `~/.config/pianotutor/config.json`. A handful
//! of environment variables override the file after it is read.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::SuccessConvention;
use crate::auth::ExpiryPolicy;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "pianotutor";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "https://api.example.com/";

/// HTTP timeouts in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 7 days
const DEFAULT_TOKEN_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

pub const ENV_BASE_URL: &str = "PIANOTUTOR_BASE_URL";
pub const ENV_TOKEN_MAX_AGE_SECS: &str = "PIANOTUTOR_TOKEN_MAX_AGE_SECS";
pub const ENV_STORAGE: &str = "PIANOTUTOR_STORAGE";
pub const ENV_SUCCESS_CONVENTION: &str = "PIANOTUTOR_SUCCESS_CONVENTION";

/// Where the session and preferences are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `preferences.json` in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Some(StorageBackend::File),
            "keyring" | "keychain" => Some(StorageBackend::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub success_convention: SuccessConvention,
    pub token_max_age_secs: u64,
    pub storage: StorageBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            success_convention: SuccessConvention::default(),
            token_max_age_secs: DEFAULT_TOKEN_MAX_AGE_SECS,
            storage: StorageBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from disk (defaults when missing), then apply env overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_json(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from environment variables. Unparseable values are
    /// logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TOKEN_MAX_AGE_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.token_max_age_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_TOKEN_MAX_AGE_SECS),
            }
        }
        if let Some(raw) = lookup(ENV_STORAGE) {
            match StorageBackend::from_str(&raw) {
                Some(backend) => self.storage = backend,
                None => warn!(value = %raw, "Ignoring invalid {}", ENV_STORAGE),
            }
        }
        if let Some(raw) = lookup(ENV_SUCCESS_CONVENTION) {
            match SuccessConvention::from_str(&raw) {
                Some(convention) => self.success_convention = convention,
                None => warn!(value = %raw, "Ignoring invalid {}", ENV_SUCCESS_CONVENTION),
            }
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_secs(self.token_max_age_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for preferences and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

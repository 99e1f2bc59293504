//! Configuration management for pplx.
//!
//! The only persisted state is the API key, stored as JSON in
//! `~/.config/perplexity-cli/config.json` (or the platform equivalent).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const CONFIG_DIR_NAME: &str = "perplexity-cli";
const CONFIG_FILE_NAME: &str = "config.json";

/// Persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Perplexity API key. Empty until set with `pplx configure`.
    #[serde(default)]
    pub api_key: String,
}

/// Errors raised when persisting the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("failed to write config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and writes the config file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// A store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user store.
    pub fn default_location() -> Result<Self, ConfigError> {
        Ok(Self::at(Self::config_path()?))
    }

    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration.
    ///
    /// Never fails. A missing file is created with an empty key; an
    /// unreadable or malformed file yields the default config so the rest of
    /// the program can run until a key is configured.
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            let config = Config::default();
            match self.save(&config) {
                Ok(()) => debug!("Created default config at {}", self.path.display()),
                Err(e) => warn!("Could not create default config: {}", e),
            }
            return config;
        }

        let contents = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read config file {}: {}", self.path.display(), e);
                return Config::default();
            }
        };

        match serde_json::from_slice::<Config>(&contents) {
            Ok(mut config) => {
                config.api_key = crate::credentials::sanitize(&config.api_key);
                config
            }
            Err(e) => {
                warn!("Could not parse config file {}: {}", self.path.display(), e);
                Config::default()
            }
        }
    }

    /// Save configuration to file, creating the directory if needed.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, contents).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

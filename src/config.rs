//! Configuration management for memories.
//!
//! Local settings live in a JSON file (`config.json`) inside a config
//! directory that can be customized. Remote mirror credentials are never
//! written to that file: they are read once from the process environment
//! (see [`RemoteConfig`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::voice::DEFAULT_LANGUAGE;

/// Key of the serialized collection in the local durable slot
pub const DEFAULT_STORAGE_KEY: &str = "gajni-memories";

/// Environment variable holding the remote endpoint URL
pub const REMOTE_URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the remote access key
pub const REMOTE_KEY_VAR: &str = "SUPABASE_ANON_KEY";

fn default_server_port() -> u16 {
    8385
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigData {
    /// Path to the SQLite file backing the local durable slot
    #[serde(default)]
    pub database_file: String,
    /// Key under which the collection is stored
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Port for the HTTP API
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Language used by dictation and read-aloud
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            database_file: String::new(),
            storage_key: default_storage_key(),
            server_port: default_server_port(),
            default_language: default_language(),
        }
    }
}

impl ConfigData {
    fn defaults_for(config_dir: &Path) -> Self {
        Self {
            database_file: config_dir.join("memories.db").to_string_lossy().to_string(),
            ..Default::default()
        }
    }
}

/// Configuration manager
pub struct Config {
    config_dir: PathBuf,
    config_file: PathBuf,
    data: ConfigData,
}

impl Config {
    /// Create a new configuration manager
    ///
    /// Without the `desktop` feature, `config_dir` is required.
    pub fn new(config_dir: Option<PathBuf>) -> MemoryResult<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => {
                #[cfg(feature = "desktop")]
                {
                    dirs::config_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join("memories")
                }
                #[cfg(not(feature = "desktop"))]
                {
                    return Err(MemoryError::Config(
                        "config_dir is required without the desktop feature".to_string(),
                    ));
                }
            }
        };

        fs::create_dir_all(&config_dir)?;
        let config_file = config_dir.join("config.json");

        let data = match fs::read_to_string(&config_file) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {}", config_file.display(), e);
                ConfigData::defaults_for(&config_dir)
            }),
            Err(_) => ConfigData::defaults_for(&config_dir),
        };

        let config = Self {
            config_dir,
            config_file,
            data,
        };

        // Save default config if it doesn't exist
        if !config.config_file.exists() {
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> MemoryResult<()> {
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the database file path
    pub fn database_file(&self) -> &str {
        &self.data.database_file
    }

    pub fn storage_key(&self) -> &str {
        &self.data.storage_key
    }

    pub fn server_port(&self) -> u16 {
        self.data.server_port
    }

    /// Set the HTTP API port
    pub fn set_server_port(&mut self, port: u16) -> MemoryResult<()> {
        self.data.server_port = port;
        self.save()
    }

    pub fn default_language(&self) -> &str {
        &self.data.default_language
    }

    /// Set the dictation / read-aloud language
    pub fn set_default_language(&mut self, language: &str) -> MemoryResult<()> {
        self.data.default_language = language.to_string();
        self.save()
    }

    /// Get a configuration value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "database_file" => Some(self.data.database_file.clone()),
            "storage_key" => Some(self.data.storage_key.clone()),
            "server_port" => Some(self.data.server_port.to_string()),
            "default_language" => Some(self.data.default_language.clone()),
            _ => None,
        }
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> MemoryResult<()> {
        match key {
            "database_file" => self.data.database_file = value.to_string(),
            "storage_key" => {
                if value.is_empty() {
                    return Err(MemoryError::validation("storage_key", "must not be empty"));
                }
                self.data.storage_key = value.to_string()
            }
            "server_port" => {
                self.data.server_port = value
                    .parse()
                    .map_err(|_| MemoryError::validation("server_port", "must be a port number"))?
            }
            "default_language" => self.data.default_language = value.to_string(),
            _ => return Err(MemoryError::Config(format!("Unknown config key: {}", key))),
        }
        self.save()
    }
}

/// Credentials for the remote mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub key: String,
}

impl RemoteConfig {
    /// Read the remote credentials from the process environment.
    ///
    /// Returns `None` when either value is missing; the caller then runs
    /// without a mirror for the whole process lifetime.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`RemoteConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(REMOTE_URL_VAR).filter(|v| !v.trim().is_empty());
        let key = lookup(REMOTE_KEY_VAR).filter(|v| !v.trim().is_empty());

        if url.is_none() {
            tracing::error!("Missing {} environment variable", REMOTE_URL_VAR);
        }
        if key.is_none() {
            tracing::error!("Missing {} environment variable", REMOTE_KEY_VAR);
        }

        match (url, key) {
            (Some(url), Some(key)) => {
                tracing::info!("Remote mirror configured for {}", url);
                Some(Self {
                    url: url.trim_end_matches('/').to_string(),
                    key,
                })
            }
            _ => {
                tracing::warn!(
                    "Remote mirror not initialized due to missing environment variables. Local storage will be used alone."
                );
                None
            }
        }
    }
}

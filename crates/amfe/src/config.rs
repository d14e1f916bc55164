//! Configuration management for amfe.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::document::{Header, DEFAULT_INSTITUTION, DEFAULT_PROCESS_COLOR};
use crate::error::{Error, Result};
use crate::patterns;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "amfe";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "matrices.db";

/// Default session file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AMFE_`, `__` between section
///    and key, e.g. `AMFE_API__BASE_URL`)
/// 2. TOML config file at `~/.config/amfe/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection.
    pub api: ApiConfig,
    /// Local files.
    pub storage: StorageConfig,
    /// Defaults for new documents.
    pub document: DocumentConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the matrix backend.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Records requested per list call.
    pub page_size: u32,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the offline database file.
    /// Defaults to `~/.local/share/amfe/matrices.db`
    pub database_path: Option<PathBuf>,
    /// Path to the stored login session.
    /// Defaults to `~/.local/share/amfe/session.json`
    pub session_path: Option<PathBuf>,
}

/// Defaults applied to new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Institution written into new headers.
    pub institution: String,
    /// Display color of new processes, `#RRGGBB`.
    pub process_color: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            page_size: 100,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            institution: DEFAULT_INSTITUTION.to_string(),
            process_color: DEFAULT_PROCESS_COLOR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `AMFE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("AMFE_").split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "api.base_url must not be empty".to_string(),
            });
        }

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "api.base_url must start with http:// or https://, got {}",
                    self.api.base_url
                ),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "api.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.api.page_size == 0 {
            return Err(Error::ConfigValidation {
                message: "api.page_size must be greater than 0".to_string(),
            });
        }

        if !patterns::color().matches(&self.document.process_color) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "document.process_color must be {}, got {}",
                    patterns::color().description,
                    self.document.process_color
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session file path, resolving defaults if not set.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.storage
            .session_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }

    /// A blank header for a new document.
    #[must_use]
    pub fn new_header(&self) -> Header {
        Header::with_institution(self.document.institution.as_str())
    }
}

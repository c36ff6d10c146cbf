//! Application settings structs, defaults and TOML persistence.
//!
//! [`AppConfig`] is the root object stored on disk: the API key plus the
//! user-facing [`UserSettings`].  The orchestrator never touches the file
//! system directly; it goes through the [`ConfigStore`] trait so tests can
//! observe (or forbid) persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::language::{Language, DEFAULT_LANGUAGE, DEFAULT_MODEL_NAME};
use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be serialised: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ---------------------------------------------------------------------------
// UserSettings
// ---------------------------------------------------------------------------

/// User-facing configuration values persisted across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Default translation target as a language code (e.g. `"de"`).
    pub default_language: String,
    /// Gemini model identifier (e.g. `"gemini-2.5-flash"`).
    pub model_name: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.code().into(),
            model_name: DEFAULT_MODEL_NAME.into(),
        }
    }
}

impl UserSettings {
    /// The configured default language, falling back to English.
    pub fn language(&self) -> Language {
        Language::from_code(&self.default_language)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Root configuration object, serialised as `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gemini API key.  Empty means "not configured".
    pub api_key: String,
    /// User preferences.
    pub settings: UserSettings,
}

impl AppConfig {
    /// Load from an explicit path.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// Synchronous persistence for [`AppConfig`].
///
/// `load` must never fail loudly: missing or corrupt data yields defaults.
pub trait ConfigStore: Send {
    fn load(&self) -> AppConfig;
    fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;
}

/// TOML file store, by default at [`AppPaths::config_file`].
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new(AppPaths::new().config_file)
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> AppConfig {
        AppConfig::load_from(&self.path).unwrap_or_else(|e| {
            log::warn!(
                "Failed to load config from {} ({e}); using defaults",
                self.path.display()
            );
            AppConfig::default()
        })
    }

    fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.save_to(&self.path)?;
        log::debug!("Config saved to {}", self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

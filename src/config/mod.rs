//! Configuration module for WriteIQ.
//!
//! Provides `AppConfig` (API key + user settings), the closed [`Language`]
//! set and model options, `AppPaths` for the platform config directory, and
//! TOML persistence behind the [`ConfigStore`] trait.

pub mod language;
pub mod paths;
pub mod settings;

pub use language::{model_label, Language, DEFAULT_LANGUAGE, DEFAULT_MODEL_NAME, MODEL_OPTIONS};
pub use paths::AppPaths;
pub use settings::{AppConfig, ConfigError, ConfigStore, FileConfigStore, UserSettings};

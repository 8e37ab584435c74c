//! Configuration management for session persistence.

use crate::{ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "AUTH_STORAGE_LOG_LEVEL";
const ENV_PERSIST_SESSION: &str = "AUTH_STORAGE_PERSIST_SESSION";
const ENV_ENCRYPTION_KEY: &str = "AUTH_STORAGE_ENCRYPTION_KEY";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Persist the session on disk. When false sessions live in memory only.
    #[serde(default = "default_persist_session")]
    pub persist_session: bool,
    /// URL-safe base64 key for the session collection.
    /// Must not change once a session has been written with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

/// The part of [`Config`] that selects and configures the session backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPersistence {
    /// Whether sessions are written to disk at all.
    pub enabled: bool,
    /// Optional URL-safe base64 encryption key.
    pub encryption_key: Option<String>,
}

impl SessionPersistence {
    /// Persistence turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            encryption_key: None,
        }
    }

    /// Persistence turned on, with an optional key.
    pub fn enabled(encryption_key: Option<String>) -> Self {
        Self {
            enabled: true,
            encryption_key,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_persist_session() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            persist_session: true,
            encryption_key: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Session backend selection derived from this config.
    pub fn session_persistence(&self) -> SessionPersistence {
        if self.persist_session {
            SessionPersistence::enabled(self.encryption_key.clone())
        } else {
            SessionPersistence::disabled()
        }
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup(ENV_LOG_LEVEL).and_then(non_empty) {
            self.log_level = log_level;
        }

        if let Some(raw) = lookup(ENV_PERSIST_SESSION).and_then(non_empty) {
            match parse_flag(&raw) {
                Some(flag) => self.persist_session = flag,
                None => warn!(
                    variable = ENV_PERSIST_SESSION,
                    value = %raw,
                    "Ignoring unrecognized boolean"
                ),
            }
        }

        if let Some(key) = lookup(ENV_ENCRYPTION_KEY).and_then(non_empty) {
            self.encryption_key = Some(key);
        }
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

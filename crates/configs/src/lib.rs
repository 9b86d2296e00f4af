//! # configs
//!
//! Layered settings: built-in defaults, then an optional TOML file, then
//! `FORUM__`-prefixed environment variables (e.g. `FORUM__DATABASE__URL`).
//! A `.env` file is loaded first when present.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

/// Default location of the settings file, without extension.
pub const DEFAULT_CONFIG_PATH: &str = "config/forum";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub forum: ForumSettings,
    #[serde(default)]
    pub logging: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Never logged; `Debug` prints a redacted placeholder.
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumSettings {
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
    #[serde(default = "default_avatar_base_url")]
    pub avatar_base_url: String,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            recent_limit: default_recent_limit(),
            avatar_base_url: default_avatar_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `services=debug,sqlx=warn`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_search_limit() -> i64 {
    50
}

fn default_recent_limit() -> i64 {
    5
}

fn default_avatar_base_url() -> String {
    "/media/avatars".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Loads `.env`, the file named by `FORUM_CONFIG` (or
    /// [`DEFAULT_CONFIG_PATH`]) if it exists, then the environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let path = std::env::var("FORUM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        let builder = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("FORUM")
                    .prefix_separator("__")
                    .separator("__"),
            );
        Self::build(builder)
    }

    /// Parses settings from an in-memory TOML document.
    pub fn from_toml(document: &str) -> Result<Self, SettingsError> {
        Self::build(Config::builder().add_source(File::from_str(document, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        debug!(
            max_connections = settings.database.max_connections,
            search_limit = settings.forum.search_limit,
            "settings loaded"
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.database.url.expose_secret().trim().is_empty() {
            return Err(SettingsError::Invalid("database.url must be set".into()));
        }
        if self.database.max_connections == 0 {
            return Err(SettingsError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.forum.search_limit <= 0 || self.forum.recent_limit <= 0 {
            return Err(SettingsError::Invalid(
                "forum.search_limit and forum.recent_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Service configuration.
///
/// Settings come from a TOML file (`tikatu.toml` by default); secrets come
/// from the environment, after `dotenv` has loaded any `.env` file. A
/// missing config file is not an error: every setting has a default.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogLevel;

pub const DEFAULT_CONFIG_PATH: &str = "tikatu.toml";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    LogLevel(String),
    #[error("{0} is not set")]
    MissingEnv(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Takes precedence over `DATABASE_URL` when set.
    pub url: Option<String>,
    /// Forces TLS on or off; unset follows the URL's `sslmode`.
    pub tls: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 500,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse().map_err(ConfigError::LogLevel)
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.logging.min_level()?;
        Ok(config)
    }

    /// The connection string: the file's `database.url`, else `DATABASE_URL`.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.resolve_database_url(std::env::var(DATABASE_URL_ENV).ok())
    }

    fn resolve_database_url(&self, from_env: Option<String>) -> Result<String, ConfigError> {
        self.database
            .url
            .clone()
            .or(from_env)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(DATABASE_URL_ENV))
    }
}

/// API key for the completions endpoint.
pub fn api_key() -> Result<String, ConfigError> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(API_KEY_ENV))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

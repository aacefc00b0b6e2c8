//! Configuration loading for the Chronoatlas server.
//!
//! The configuration lives in `chronoatlas-config.yaml` in the working
//! directory (or wherever `CHRONOATLAS_CONFIG` points). Every section has
//! defaults, so a missing file or a partial file is valid.

use std::path::{Path, PathBuf};

use chronoatlas_runner::LlmConfig;
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset file locations.
    #[serde(default)]
    pub datasets: DatasetsConfig,

    /// Text-generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `CHRONOATLAS_HOST` overrides `server.host`
    /// - `CHRONOATLAS_PORT` overrides `server.port`
    /// - `LLM_API_KEY` / `GEMINI_API_KEY`, `LLM_API_URL`, `LLM_MODEL`
    ///   override the `llm` section
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_file`] for an existing file.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to every section.
    pub fn apply_env_overrides(&mut self) {
        self.server.apply_env_overrides();
        self.llm.apply_env_overrides();
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,
    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CHRONOATLAS_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("CHRONOATLAS_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!(value = %val, error = %e, "ignoring invalid CHRONOATLAS_PORT"),
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

/// Dataset file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetsConfig {
    /// `GeoJSON` `FeatureCollection` of administrative districts.
    #[serde(default = "default_districts")]
    pub districts: PathBuf,
    /// JSON array of historical entities.
    #[serde(default = "default_entities")]
    pub entities: PathBuf,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            districts: default_districts(),
            entities: default_entities(),
        }
    }
}

fn default_districts() -> PathBuf {
    PathBuf::from("data/districts.geojson")
}

fn default_entities() -> PathBuf {
    PathBuf::from("data/historical_cities.json")
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    String::from("info")
}

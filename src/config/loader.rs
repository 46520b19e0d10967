// src/config/loader.rs
//! Layered configuration loading
//!
//! Sources, lowest precedence first: built-in defaults, TOML files in the
//! order given, then `EMG_`-prefixed environment variables where `__`
//! separates sections (`EMG_PROCESSOR__HISTORY_CAPACITY=20`).

use crate::config::constants::paths;
use crate::config::PipelineConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Explicitly requested file is missing
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// File or environment value could not be parsed
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// Values failed validation, one message per problem
    #[error("configuration validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Reading or writing a file failed
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Loads [`PipelineConfig`] from layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    optional_paths: Vec<PathBuf>,
    required_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Loader over the default discovery paths and the environment
    pub fn new() -> Self {
        Self {
            optional_paths: vec![
                PathBuf::from(paths::DEFAULT_CONFIG_FILE),
                PathBuf::from(paths::USER_CONFIG_FILE),
            ],
            required_paths: Vec::new(),
            env_prefix: Some(paths::ENV_PREFIX.to_string()),
        }
    }

    /// Loader with no file or environment sources
    pub fn empty() -> Self {
        Self {
            optional_paths: Vec::new(),
            required_paths: Vec::new(),
            env_prefix: None,
        }
    }

    /// Add a file that must exist
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.required_paths.push(path.into());
        self
    }

    /// Add a file that is skipped when missing
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.optional_paths.push(path.into());
        self
    }

    /// Read overrides from `{prefix}_SECTION__FIELD` variables
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Ignore environment overrides
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Merge all sources and validate the result
    pub fn load(&self) -> Result<PipelineConfig, ConfigError> {
        for path in &self.required_paths {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
        }

        let mut builder = Config::builder().add_source(Config::try_from(&PipelineConfig::default())?);

        for path in &self.optional_paths {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false));
        }
        for path in &self.required_paths {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(true));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(paths::ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(ConfigError::Invalid)?;

        info!(
            history = config.processor.history_capacity,
            smoothing = ?config.processor.smoothing.method,
            user_type = ?config.alerts.user_type,
            "configuration loaded"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a configuration as pretty TOML
pub fn to_toml(config: &PipelineConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Write a configuration to a TOML file
pub fn export_config(config: &PipelineConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    std::fs::write(path, to_toml(config)?)?;
    Ok(())
}
